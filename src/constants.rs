//! Column and label constants shared by every pipeline stage

/// RIASEC dimensions in canonical order
pub const RIASEC_GROUPS: [char; 6] = ['R', 'I', 'A', 'S', 'E', 'C'];

/// Number of survey items per RIASEC dimension
pub const ITEMS_PER_GROUP: usize = 8;

/// Total number of survey items (6 groups of 8)
pub const ITEM_COUNT: usize = RIASEC_GROUPS.len() * ITEMS_PER_GROUP;

/// Free-text major column in the raw export
pub const MAJOR_COLUMN: &str = "major";

/// Resolved label column in the prepared dataset
pub const MAJOR_STANDARD_COLUMN: &str = "major_standard";

/// Sentinel for majors with no confident category match
pub const OTHER_LABEL: &str = "Other";

/// Suffix of aggregated group columns (`R_pct`, `I_pct`, ...)
pub const GROUP_SUFFIX: &str = "_pct";

/// Field values read as missing, matching common spreadsheet exports
pub const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "#N/A", "None",
];

/// Lowest and highest Likert answers
pub const LIKERT_MIN: f64 = 1.0;
pub const LIKERT_MAX: f64 = 5.0;

/// Default fuzzy acceptance threshold (inclusive, 0-100 scale)
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 70.0;

/// Categories need strictly more rows than this to survive
pub const DEFAULT_MIN_CLASS_COUNT: usize = 2;

/// Number of ranked candidates returned by a prediction
pub const TOP_K_PREDICTIONS: usize = 5;

/// Canonical item codes in column order: R1..R8, I1..I8, ..., C1..C8
pub fn item_codes() -> Vec<String> {
    RIASEC_GROUPS
        .iter()
        .flat_map(|group| (1..=ITEMS_PER_GROUP).map(move |i| format!("{}{}", group, i)))
        .collect()
}

/// Aggregated column name for a RIASEC group
pub fn group_column(group: char) -> String {
    format!("{}{}", group, GROUP_SUFFIX)
}

/// Whether a raw field should be treated as missing
pub fn is_missing_marker(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_codes_cover_all_groups_in_order() {
        let codes = item_codes();
        assert_eq!(codes.len(), ITEM_COUNT);
        assert_eq!(codes.first().map(String::as_str), Some("R1"));
        assert_eq!(codes[8], "I1");
        assert_eq!(codes.last().map(String::as_str), Some("C8"));
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing_marker(""));
        assert!(is_missing_marker("NaN"));
        assert!(is_missing_marker(" NA "));
        assert!(!is_missing_marker("3"));
        assert!(!is_missing_marker("nursing"));
    }
}
