use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use crate::constants::{DEFAULT_MIN_CLASS_COUNT, OTHER_LABEL};
use crate::pipeline::processing::standardize::{LabeledRow, LabeledTable};

/// Rules applied to labeled rows before they are persisted
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Keep `Other` and rare classes so tiny fixtures stay non-empty
    pub test_mode: bool,
    /// Categories need strictly more rows than this
    pub min_class_count: usize,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            min_class_count: DEFAULT_MIN_CLASS_COUNT,
        }
    }
}

/// Rows that passed the gate and what was removed on the way
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub table: LabeledTable,
    pub removed_other: usize,
    pub removed_duplicates: usize,
    pub removed_rare: usize,
}

pub struct QualityGate {
    pub config: QualityGateConfig,
}

impl QualityGate {
    pub fn new() -> Self {
        Self {
            config: QualityGateConfig::default(),
        }
    }

    pub fn with_config(config: QualityGateConfig) -> Self {
        Self { config }
    }

    /// Drop `Other`, drop duplicates, then drop rare classes.
    ///
    /// Duplicates go before the class count so every surviving category keeps
    /// more than `min_class_count` distinct rows.
    pub fn apply(&self, table: LabeledTable) -> GateOutcome {
        let LabeledTable {
            feature_columns,
            rows,
        } = table;

        let (rows, removed_other) = if self.config.test_mode {
            (rows, 0)
        } else {
            drop_other(rows)
        };

        let (rows, removed_duplicates) = drop_duplicate_rows(rows);

        let (rows, removed_rare) = if self.config.test_mode {
            (rows, 0)
        } else {
            drop_rare_classes(rows, self.config.min_class_count)
        };

        GateOutcome {
            table: LabeledTable {
                feature_columns,
                rows,
            },
            removed_other,
            removed_duplicates,
            removed_rare,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove rows resolved to `Other`
pub fn drop_other(rows: Vec<LabeledRow>) -> (Vec<LabeledRow>, usize) {
    let before = rows.len();
    let kept: Vec<LabeledRow> = rows.into_iter().filter(|row| !row.is_other()).collect();
    let removed = before - kept.len();
    if removed > 0 {
        info!("Removed {} rows labeled {}", removed, OTHER_LABEL);
    }
    (kept, removed)
}

/// Remove rows equal over the persisted columns (features and `major_standard`)
pub fn drop_duplicate_rows(rows: Vec<LabeledRow>) -> (Vec<LabeledRow>, usize) {
    let before = rows.len();
    let mut seen: HashSet<(Vec<u64>, String)> = HashSet::with_capacity(before);
    let kept: Vec<LabeledRow> = rows
        .into_iter()
        .filter(|row| {
            let features = row.features.iter().map(|v| v.to_bits()).collect();
            seen.insert((features, row.major_standard().to_string()))
        })
        .collect();

    let removed = before - kept.len();
    if removed > 0 {
        warn!("Removed {} duplicate rows after standardization", removed);
    }
    (kept, removed)
}

/// Keep only categories with strictly more than `min_count` rows
pub fn drop_rare_classes(rows: Vec<LabeledRow>, min_count: usize) -> (Vec<LabeledRow>, usize) {
    let counts = class_counts(&rows);
    let rare: Vec<&str> = counts
        .iter()
        .filter(|(_, count)| **count <= min_count)
        .map(|(label, _)| label.as_str())
        .collect();
    if !rare.is_empty() {
        info!(
            "Dropping {} categories with {} or fewer rows: {}",
            rare.len(),
            min_count,
            rare.join(", ")
        );
    }

    let before = rows.len();
    let kept: Vec<LabeledRow> = rows
        .into_iter()
        .filter(|row| counts.get(row.major_standard()).copied().unwrap_or(0) > min_count)
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Row count per `major_standard` value
pub fn class_counts(rows: &[LabeledRow]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.major_standard().to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::standardize::LabelResolution;

    fn row(features: &[f64], major: &str, resolution: LabelResolution) -> LabeledRow {
        LabeledRow {
            features: features.to_vec(),
            major: major.to_string(),
            resolution,
        }
    }

    fn dict(features: &[f64], category: &str) -> LabeledRow {
        row(features, &category.to_lowercase(), LabelResolution::Dictionary(category.to_string()))
    }

    fn table(rows: Vec<LabeledRow>) -> LabeledTable {
        LabeledTable {
            feature_columns: vec!["R1".to_string(), "I1".to_string()],
            rows,
        }
    }

    #[test]
    fn test_gate_drops_other_and_rare_classes() {
        let rows = vec![
            dict(&[0.0, 0.0], "Biology"),
            dict(&[0.25, 0.0], "Biology"),
            dict(&[0.5, 0.0], "Biology"),
            dict(&[0.0, 1.0], "Nursing"),
            dict(&[0.25, 1.0], "Nursing"),
            row(&[1.0, 1.0], "xyzzy", LabelResolution::Other { best_score: 12.0 }),
        ];

        let outcome = QualityGate::new().apply(table(rows));
        assert_eq!(outcome.removed_other, 1);
        assert_eq!(outcome.removed_rare, 2);
        assert_eq!(outcome.table.rows.len(), 3);
        assert!(outcome.table.rows.iter().all(|r| r.major_standard() == "Biology"));
    }

    #[test]
    fn test_duplicates_are_removed_before_counting() {
        // different raw majors, same features and category
        let rows = vec![
            row(&[0.5, 0.5], "biology", LabelResolution::Dictionary("Biology".to_string())),
            row(&[0.5, 0.5], "bio", LabelResolution::Dictionary("Biology".to_string())),
            dict(&[0.75, 0.5], "Biology"),
            dict(&[1.0, 0.5], "Biology"),
        ];

        let outcome = QualityGate::new().apply(table(rows));
        assert_eq!(outcome.removed_duplicates, 1);
        assert_eq!(outcome.removed_rare, 0);
        assert_eq!(outcome.table.rows.len(), 3);
    }

    #[test]
    fn test_duplicates_can_push_a_class_under_the_minimum() {
        let rows = vec![
            dict(&[0.5, 0.5], "Law"),
            dict(&[0.5, 0.5], "Law"),
            dict(&[0.75, 0.5], "Law"),
        ];

        let outcome = QualityGate::new().apply(table(rows));
        assert_eq!(outcome.removed_duplicates, 1);
        assert_eq!(outcome.removed_rare, 2);
        assert!(outcome.table.rows.is_empty());
    }

    #[test]
    fn test_test_mode_keeps_other_and_rare_classes() {
        let rows = vec![
            dict(&[0.0, 0.0], "Biology"),
            row(&[1.0, 1.0], "xyzzy", LabelResolution::Other { best_score: 12.0 }),
            row(&[1.0, 0.0], "marine studies", LabelResolution::Unresolved),
        ];

        let gate = QualityGate::with_config(QualityGateConfig {
            test_mode: true,
            min_class_count: 2,
        });
        let outcome = gate.apply(table(rows));
        assert_eq!(outcome.table.rows.len(), 3);
        assert_eq!(outcome.removed_other, 0);
        assert_eq!(outcome.removed_rare, 0);
    }

    #[test]
    fn test_class_counts() {
        let rows = vec![
            dict(&[0.0, 0.0], "Biology"),
            dict(&[0.5, 0.0], "Biology"),
            dict(&[0.0, 1.0], "Law"),
        ];
        let counts = class_counts(&rows);
        assert_eq!(counts.get("Biology"), Some(&2));
        assert_eq!(counts.get("Law"), Some(&1));
    }
}
