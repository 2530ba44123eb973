use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::pipeline::pipeline::PreparedDataset;

/// Destination for a finished dataset
pub trait DatasetSink {
    fn persist(&self, dataset: &PreparedDataset) -> Result<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Writes the persisted columns as comma-separated values
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl DatasetSink for CsvFileSink {
    fn persist(&self, dataset: &PreparedDataset) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(dataset.output_columns())?;
        for row in &dataset.rows {
            let mut record: Vec<String> = row.features.iter().map(|v| v.to_string()).collect();
            record.push(row.major_standard.clone());
            writer.write_record(&record)?;
        }
        writer.flush()?;

        debug!("Wrote {} rows to {}", dataset.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory sink for development/testing
#[derive(Default, Clone)]
pub struct InMemorySink {
    datasets: Arc<Mutex<Vec<PreparedDataset>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datasets(&self) -> Vec<PreparedDataset> {
        self.datasets
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl DatasetSink for InMemorySink {
    fn persist(&self, dataset: &PreparedDataset) -> Result<()> {
        if let Ok(mut datasets) = self.datasets.lock() {
            datasets.push(dataset.clone());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
