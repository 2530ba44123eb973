use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::constants::is_missing_marker;
use crate::error::{PipelineError, Result};

/// Tab-separated survey export, fields kept as text
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    /// `None` marks a missing field
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse a tab-delimited file with one header row.
///
/// Short rows are padded with missing values; rows wider than the header are rejected.
pub fn read_table(path: &Path) -> Result<RawTable> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > columns.len() {
            return Err(PipelineError::MalformedInput {
                // header is line 1
                line: index + 2,
                reason: format!(
                    "expected at most {} fields, found {}",
                    columns.len(),
                    record.len()
                ),
            });
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|field| {
                if is_missing_marker(field) {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        row.resize(columns.len(), None);
        rows.push(row);
    }

    info!(
        "Loaded dataset from {}: {} rows x {} columns",
        path.display(),
        rows.len(),
        columns.len()
    );
    Ok(RawTable { columns, rows })
}

/// Rows left after exact-duplicate removal and how many were removed
#[derive(Debug, Clone, PartialEq)]
pub struct Deduplicated {
    pub table: RawTable,
    pub removed: usize,
}

/// Drop rows equal across every parsed column, keeping the first occurrence
pub fn drop_duplicate_rows(table: RawTable) -> Deduplicated {
    let before = table.rows.len();
    let mut seen: HashSet<Vec<Option<String>>> = HashSet::with_capacity(before);
    let rows: Vec<Vec<Option<String>>> = table
        .rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();

    let removed = before - rows.len();
    if removed > 0 {
        warn!("Found {} duplicate raw rows. Removing...", removed);
    } else {
        debug!("No duplicate raw rows found");
    }

    Deduplicated {
        table: RawTable {
            columns: table.columns,
            rows,
        },
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tsv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_table_parses_missing_markers() {
        let file = write_tsv("R1\tR2\tmajor\n5\t\tbiology\n3\tNA\tNaN\n");
        let table = read_table(file.path()).unwrap();

        assert_eq!(table.columns, vec!["R1", "R2", "major"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec![Some("5".to_string()), None, Some("biology".to_string())]);
        assert_eq!(table.rows[1], vec![Some("3".to_string()), None, None]);
    }

    #[test]
    fn test_read_table_pads_short_rows() {
        let file = write_tsv("R1\tR2\tmajor\n5\t4\n");
        let table = read_table(file.path()).unwrap();
        assert_eq!(table.rows[0], vec![Some("5".to_string()), Some("4".to_string()), None]);
    }

    #[test]
    fn test_read_table_rejects_wide_rows() {
        let file = write_tsv("R1\tmajor\n5\tbiology\textra\n");
        let result = read_table(file.path());
        assert!(matches!(result, Err(PipelineError::MalformedInput { line: 2, .. })));
    }

    #[test]
    fn test_read_table_missing_file() {
        let result = read_table(Path::new("no/such/data.csv"));
        assert!(matches!(result, Err(PipelineError::InputNotFound(_))));
    }

    #[test]
    fn test_drop_duplicate_rows_keeps_first_occurrence() {
        let table = RawTable {
            columns: vec!["R1".to_string(), "major".to_string()],
            rows: vec![
                vec![Some("5".to_string()), Some("biology".to_string())],
                vec![Some("4".to_string()), Some("biology".to_string())],
                vec![Some("5".to_string()), Some("biology".to_string())],
                vec![Some("5".to_string()), Some("Biology".to_string())],
                vec![None, Some("biology".to_string())],
                vec![None, Some("biology".to_string())],
            ],
        };

        let deduped = drop_duplicate_rows(table);
        assert_eq!(deduped.removed, 2);
        assert_eq!(deduped.table.len(), 4);
        assert_eq!(deduped.table.rows[0][0].as_deref(), Some("5"));
        assert_eq!(deduped.table.rows[1][0].as_deref(), Some("4"));
        assert_eq!(deduped.table.rows[2][1].as_deref(), Some("Biology"));
    }
}
