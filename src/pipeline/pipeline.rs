use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::constants::{
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_MIN_CLASS_COUNT, MAJOR_COLUMN, MAJOR_STANDARD_COLUMN,
};
use crate::error::Result;
use crate::pipeline::ingestion::{drop_duplicate_rows, read_table};
use crate::pipeline::processing::fuzzy::{SimilarityScorer, WeightedRatio};
use crate::pipeline::processing::labels::clean_labels;
use crate::pipeline::processing::normalize::normalize;
use crate::pipeline::processing::quality_gate::{QualityGate, QualityGateConfig};
use crate::pipeline::processing::standardize::{LabeledTable, Standardizer};
use crate::pipeline::storage::{CsvFileSink, DatasetSink};
use crate::taxonomy::Taxonomy;
use crate::types::FeatureMode;

/// Knobs for one pipeline invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub mode: FeatureMode,
    /// Skip fuzzy matching and class filtering for small deterministic fixtures
    pub test_mode: bool,
    pub fuzzy_threshold: f64,
    pub min_class_count: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: FeatureMode::Items,
            test_mode: false,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_class_count: DEFAULT_MIN_CLASS_COUNT,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            mode: config.mode,
            test_mode: config.test_mode,
            fuzzy_threshold: config.fuzzy_threshold,
            min_class_count: config.min_class_count,
        }
    }
}

/// Row counts observed at each stage of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub rows_loaded: usize,
    pub raw_duplicates_removed: usize,
    pub rows_missing_values: usize,
    pub rows_empty_major: usize,
    pub dictionary_hits: usize,
    pub fuzzy_matches: usize,
    pub other_labels: usize,
    pub other_removed: usize,
    pub final_duplicates_removed: usize,
    pub rare_removed: usize,
    pub final_rows: usize,
    pub categories: usize,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One persisted training example
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow {
    pub features: Vec<f64>,
    /// Cleaned major text; not written to the output file
    pub major: String,
    pub major_standard: String,
}

/// Final row set of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDataset {
    pub feature_columns: Vec<String>,
    pub rows: Vec<PreparedRow>,
    pub report: PipelineReport,
}

impl PreparedDataset {
    /// In-memory columns: features, `major`, `major_standard`
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.feature_columns.clone();
        columns.push(MAJOR_COLUMN.to_string());
        columns.push(MAJOR_STANDARD_COLUMN.to_string());
        columns
    }

    /// Persisted columns: features and `major_standard`
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns = self.feature_columns.clone();
        columns.push(MAJOR_STANDARD_COLUMN.to_string());
        columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.major_standard.as_str()).or_insert(0) += 1;
        }
        counts
    }

    fn from_labeled(table: LabeledTable, report: PipelineReport) -> Self {
        let rows = table
            .rows
            .into_iter()
            .map(|row| PreparedRow {
                major_standard: row.major_standard().to_string(),
                features: row.features,
                major: row.major,
            })
            .collect();
        Self {
            feature_columns: table.feature_columns,
            rows,
            report,
        }
    }
}

/// Raw survey export to clean, class-balanced training table
pub struct Pipeline {
    taxonomy: Taxonomy,
    scorer: Box<dyn SimilarityScorer>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Pipeline using the weighted-ratio scorer
    pub fn new(taxonomy: Taxonomy, options: PipelineOptions) -> Self {
        Self {
            taxonomy,
            scorer: Box::new(WeightedRatio),
            options,
        }
    }

    /// Replace the fuzzy scorer
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every stage and persist the result as CSV at `output_path`
    pub fn run(&self, input_path: &Path, output_path: &Path) -> Result<PreparedDataset> {
        self.run_with_sink(input_path, &CsvFileSink::new(output_path))
    }

    /// Run every stage and hand the result to `sink`. Nothing is persisted on failure.
    pub fn run_with_sink(&self, input_path: &Path, sink: &dyn DatasetSink) -> Result<PreparedDataset> {
        let dataset = self.prepare(input_path)?;
        sink.persist(&dataset)?;
        info!(
            "Saved cleaned dataset to {}: {} rows, {} categories",
            sink.describe(),
            dataset.report.final_rows,
            dataset.report.categories
        );
        Ok(dataset)
    }

    /// Run every stage without persisting
    pub fn prepare(&self, input_path: &Path) -> Result<PreparedDataset> {
        let span = info_span!(
            "prepare_data",
            mode = %self.options.mode,
            test_mode = self.options.test_mode
        );
        let _enter = span.enter();
        let started = Instant::now();
        let mut report = PipelineReport::default();

        // 1. Load and drop exact duplicate raw rows
        let raw = read_table(input_path)?;
        report.rows_loaded = raw.len();
        let deduped = drop_duplicate_rows(raw);
        report.raw_duplicates_removed = deduped.removed;

        // 2. Select items, drop incomplete rows, rescale
        let normalized = normalize(deduped.table, self.options.mode)?;
        report.rows_missing_values = normalized.dropped_missing;
        let expected = self.options.mode.full_columns();
        if normalized.table.feature_columns != expected {
            info!(
                "Partial feature set: {} of {} {} columns",
                normalized.table.feature_columns.len(),
                expected.len(),
                self.options.mode
            );
        }

        // 3. Clean and standardize majors
        let cleaned = clean_labels(normalized.table);
        report.rows_empty_major = cleaned.dropped_empty;

        let standardizer = Standardizer::new(
            &self.taxonomy,
            self.scorer.as_ref(),
            self.options.fuzzy_threshold,
        );
        let labeled = standardizer.standardize(cleaned.table, !self.options.test_mode);
        let counts = labeled.resolution_counts();
        report.dictionary_hits = counts.dictionary;
        report.fuzzy_matches = counts.fuzzy;
        report.other_labels = counts.other;

        // 4. Remove Other, duplicates, and rare classes
        let gate = QualityGate::with_config(QualityGateConfig {
            test_mode: self.options.test_mode,
            min_class_count: self.options.min_class_count,
        });
        let outcome = gate.apply(labeled);
        report.other_removed = outcome.removed_other;
        report.final_duplicates_removed = outcome.removed_duplicates;
        report.rare_removed = outcome.removed_rare;

        let mut dataset = PreparedDataset::from_labeled(outcome.table, report);
        dataset.report.final_rows = dataset.len();
        dataset.report.categories = dataset.category_counts().len();
        dataset.report.completed_at = Some(Utc::now());

        info!(
            "Prepared {} rows across {} categories in {:.2?}",
            dataset.report.final_rows,
            dataset.report.categories,
            started.elapsed()
        );
        Ok(dataset)
    }
}

/// Prepare `input_path` into `output_path` with the built-in taxonomy
pub fn run_prepare_data(
    input_path: &Path,
    output_path: &Path,
    test_mode: bool,
    mode: FeatureMode,
) -> Result<PreparedDataset> {
    let taxonomy = Taxonomy::builtin()?;
    let options = PipelineOptions {
        mode,
        test_mode,
        ..PipelineOptions::default()
    };
    Pipeline::new(taxonomy, options).run(input_path, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::InMemorySink;
    use std::io::Write;

    fn write_tsv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_input_persists_nothing() {
        let pipeline = Pipeline::new(Taxonomy::builtin().unwrap(), PipelineOptions::default());
        let sink = InMemorySink::new();

        let result = pipeline.run_with_sink(Path::new("missing/data.csv"), &sink);
        assert!(result.is_err());
        assert!(sink.datasets().is_empty());
    }

    #[test]
    fn test_report_accounts_for_every_drop() {
        let file = write_tsv(
            "R1\tI1\tmajor\n\
             5\t1\tPsychology\n\
             5\t1\tPsychology\n\
             4\t\tBiology\n\
             3\t2\t123\n\
             2\t2\tbio\n",
        );
        let options = PipelineOptions {
            test_mode: true,
            ..PipelineOptions::default()
        };
        let pipeline = Pipeline::new(Taxonomy::builtin().unwrap(), options);
        let sink = InMemorySink::new();

        let dataset = pipeline.run_with_sink(file.path(), &sink).unwrap();
        let report = &dataset.report;
        assert_eq!(report.rows_loaded, 5);
        assert_eq!(report.raw_duplicates_removed, 1);
        assert_eq!(report.rows_missing_values, 1);
        assert_eq!(report.rows_empty_major, 1);
        assert_eq!(report.dictionary_hits, 2);
        assert_eq!(report.final_rows, 2);
        assert_eq!(report.categories, 2);
        assert!(report.completed_at.is_some());
        assert_eq!(sink.datasets().len(), 1);
    }

    #[test]
    fn test_columns_with_and_without_major() {
        let dataset = PreparedDataset {
            feature_columns: vec!["R_pct".to_string(), "I_pct".to_string()],
            rows: Vec::new(),
            report: PipelineReport::default(),
        };
        assert_eq!(dataset.columns(), vec!["R_pct", "I_pct", "major", "major_standard"]);
        assert_eq!(dataset.output_columns(), vec!["R_pct", "I_pct", "major_standard"]);
    }
}
