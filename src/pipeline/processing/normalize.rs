use tracing::{info, warn};

use crate::constants::{self, LIKERT_MAX, LIKERT_MIN, MAJOR_COLUMN, RIASEC_GROUPS};
use crate::error::{PipelineError, Result};
use crate::pipeline::ingestion::RawTable;
use crate::types::{FeatureMode, FeatureRow, FeatureTable};

/// Retained columns: the item codes present in the input plus `major`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSelection {
    /// (item code, source column index) in canonical item order
    pub items: Vec<(String, usize)>,
    pub major: usize,
}

/// Normalized features plus how many rows were dropped for missing values
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub table: FeatureTable,
    pub dropped_missing: usize,
}

/// Map a 1-5 Likert answer onto 0-1. Out-of-range answers are passed through.
pub fn rescale(raw: f64) -> f64 {
    (raw - LIKERT_MIN) / (LIKERT_MAX - LIKERT_MIN)
}

/// Pick the canonical item columns that are present, plus `major`
pub fn select_columns(table: &RawTable) -> Result<ColumnSelection> {
    let major = table
        .column_index(MAJOR_COLUMN)
        .ok_or_else(|| PipelineError::MissingColumn(MAJOR_COLUMN.to_string()))?;

    let items: Vec<(String, usize)> = constants::item_codes()
        .into_iter()
        .filter_map(|code| table.column_index(&code).map(|index| (code, index)))
        .collect();

    if items.is_empty() {
        warn!("No RIASEC item columns found in input");
    } else if items.len() < constants::ITEM_COUNT {
        info!(
            "Using {} of {} RIASEC item columns",
            items.len(),
            constants::ITEM_COUNT
        );
    }

    Ok(ColumnSelection { items, major })
}

/// Select item columns, drop incomplete rows, and rescale into features for `mode`
pub fn normalize(table: RawTable, mode: FeatureMode) -> Result<Normalized> {
    let selection = select_columns(&table)?;
    let before = table.rows.len();

    let mut raw_rows: Vec<(Vec<f64>, String)> = Vec::with_capacity(before);
    for (row_index, row) in table.rows.iter().enumerate() {
        let major = match &row[selection.major] {
            Some(major) => major,
            None => continue,
        };
        if selection.items.iter().any(|(_, col)| row[*col].is_none()) {
            continue;
        }

        let mut values = Vec::with_capacity(selection.items.len());
        for (code, col) in &selection.items {
            // presence checked above
            let field = row[*col].as_deref().unwrap_or_default();
            values.push(parse_item(field, code, row_index)?);
        }
        raw_rows.push((values, major.clone()));
    }

    let dropped_missing = before - raw_rows.len();
    info!(
        "After dropping rows with missing values: {} rows ({} dropped)",
        raw_rows.len(),
        dropped_missing
    );

    let table = match mode {
        FeatureMode::Items => per_item_features(&selection, raw_rows),
        FeatureMode::Aggregated => aggregated_features(&selection, raw_rows),
    };

    Ok(Normalized {
        table,
        dropped_missing,
    })
}

fn parse_item(field: &str, code: &str, row_index: usize) -> Result<f64> {
    match field.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PipelineError::InvalidValue {
            row: row_index + 1,
            column: code.to_string(),
            value: field.to_string(),
        }),
    }
}

fn per_item_features(selection: &ColumnSelection, raw_rows: Vec<(Vec<f64>, String)>) -> FeatureTable {
    let feature_columns = selection.items.iter().map(|(code, _)| code.clone()).collect();
    let rows = raw_rows
        .into_iter()
        .map(|(values, major)| FeatureRow {
            features: values.into_iter().map(rescale).collect(),
            major,
        })
        .collect();

    FeatureTable {
        feature_columns,
        rows,
    }
}

fn aggregated_features(selection: &ColumnSelection, raw_rows: Vec<(Vec<f64>, String)>) -> FeatureTable {
    // positions into each row's value vector, per group that has any item present
    let groups: Vec<(char, Vec<usize>)> = RIASEC_GROUPS
        .iter()
        .map(|group| {
            let positions = selection
                .items
                .iter()
                .enumerate()
                .filter(|(_, (code, _))| code.starts_with(*group))
                .map(|(position, _)| position)
                .collect::<Vec<_>>();
            (*group, positions)
        })
        .filter(|(_, positions)| !positions.is_empty())
        .collect();

    let feature_columns = groups
        .iter()
        .map(|(group, _)| constants::group_column(*group))
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|(values, major)| {
            let features = groups
                .iter()
                .map(|(_, positions)| {
                    let sum: f64 = positions.iter().map(|p| values[*p]).sum();
                    rescale(sum / positions.len() as f64)
                })
                .collect();
            FeatureRow { features, major }
        })
        .collect();

    FeatureTable {
        feature_columns,
        rows,
    }
}
