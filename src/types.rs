use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{self, RIASEC_GROUPS};
use crate::error::PipelineError;

/// Feature granularity of the prepared dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    /// One feature per survey item (`R1`..`C8`)
    #[default]
    Items,
    /// One mean feature per RIASEC group (`R_pct`..`C_pct`)
    Aggregated,
}

impl FeatureMode {
    /// Full feature column set when every item is present
    pub fn full_columns(&self) -> Vec<String> {
        match self {
            FeatureMode::Items => constants::item_codes(),
            FeatureMode::Aggregated => RIASEC_GROUPS
                .iter()
                .map(|group| constants::group_column(*group))
                .collect(),
        }
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureMode::Items => write!(f, "items"),
            FeatureMode::Aggregated => write!(f, "aggregated"),
        }
    }
}

impl FromStr for FeatureMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "items" | "item" | "48" => Ok(FeatureMode::Items),
            "aggregated" | "groups" | "6" => Ok(FeatureMode::Aggregated),
            other => Err(PipelineError::Config(format!(
                "Unknown feature mode: {}",
                other
            ))),
        }
    }
}

/// A row whose features are normalized but whose major is still free text
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub features: Vec<f64>,
    pub major: String,
}

/// Feature columns plus the rows that carry them
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub feature_columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
