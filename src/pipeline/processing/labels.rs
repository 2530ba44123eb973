use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::types::{FeatureRow, FeatureTable};

static NON_LETTER_OR_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z ]").expect("static regex is valid"));

/// Lowercase, strip everything but `a-z` and spaces, trim.
pub fn clean_major(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    NON_LETTER_OR_SPACE
        .replace_all(&lowered, "")
        .trim()
        .to_string()
}

/// Rows surviving label cleaning, plus how many were dropped as blank
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedLabels {
    pub table: FeatureTable,
    pub dropped_empty: usize,
}

/// Replace every row's major with its cleaned form, dropping rows that clean to nothing
pub fn clean_labels(table: FeatureTable) -> CleanedLabels {
    let before = table.rows.len();
    let rows: Vec<FeatureRow> = table
        .rows
        .into_iter()
        .filter_map(|row| {
            let major = clean_major(&row.major);
            if major.is_empty() {
                None
            } else {
                Some(FeatureRow {
                    features: row.features,
                    major,
                })
            }
        })
        .collect();

    let dropped_empty = before - rows.len();
    if dropped_empty > 0 {
        info!("Dropped {} rows with an empty major after cleaning", dropped_empty);
    }

    CleanedLabels {
        table: FeatureTable {
            feature_columns: table.feature_columns,
            rows,
        },
        dropped_empty,
    }
}
