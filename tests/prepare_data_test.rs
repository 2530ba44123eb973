use anyhow::Result;
use riasec_major::{run_prepare_data, FeatureMode};
use std::fs;
use tempfile::tempdir;

const ITEMS: [&str; 12] = [
    "R1", "R2", "I1", "I2", "A1", "A2", "S1", "S2", "E1", "E2", "C1", "C2",
];

fn write_fixture(path: &std::path::Path, rows: &[([u8; 12], &str)]) -> Result<()> {
    let mut contents = ITEMS.join("\t");
    contents.push_str("\tmajor\n");
    for (values, major) in rows {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        contents.push_str(&values.join("\t"));
        contents.push('\t');
        contents.push_str(major);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    Ok(())
}

#[test]
fn test_prepare_aggregated_fixture_in_test_mode() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("data.csv");
    let output = temp_dir.path().join("out").join("final_data.csv");

    write_fixture(
        &input,
        &[
            ([5, 5, 1, 1, 2, 2, 3, 3, 4, 4, 1, 1], "Psychology"),
            ([1, 1, 5, 5, 2, 2, 3, 3, 4, 4, 1, 1], "Biology "),
            ([1, 2, 5, 4, 2, 2, 3, 3, 4, 4, 1, 1], "biology"),
        ],
    )?;

    let dataset = run_prepare_data(&input, &output, true, FeatureMode::Aggregated)?;

    assert_eq!(dataset.len(), 3);
    assert_eq!(
        dataset.columns(),
        vec!["R_pct", "I_pct", "A_pct", "S_pct", "E_pct", "C_pct", "major", "major_standard"]
    );
    assert_eq!(dataset.columns().len(), 8);

    let written = fs::read_to_string(&output)?;
    assert!(!written.trim().is_empty());
    let mut lines = written.lines();
    let header: Vec<&str> = lines.next().unwrap_or_default().split(',').collect();
    assert_eq!(header.len(), 7);
    assert_eq!(header.last(), Some(&"major_standard"));
    assert_eq!(lines.count(), 3);

    // R1=5, R2=5 averages to 1.0; C1=1, C2=1 to 0.0
    assert_eq!(dataset.rows[0].features[0], 1.0);
    assert_eq!(dataset.rows[0].features[5], 0.0);
    Ok(())
}

#[test]
fn test_label_variants_collapse_through_dictionary() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("data.csv");
    let output = temp_dir.path().join("final_data.csv");

    write_fixture(
        &input,
        &[
            ([5, 5, 1, 1, 2, 2, 3, 3, 4, 4, 1, 1], "Psychology"),
            ([1, 1, 5, 5, 2, 2, 3, 3, 4, 4, 1, 1], "Biology "),
            ([1, 2, 5, 4, 2, 2, 3, 3, 4, 4, 1, 1], "biology"),
        ],
    )?;

    let dataset = run_prepare_data(&input, &output, true, FeatureMode::Items)?;

    let majors: Vec<&str> = dataset.rows.iter().map(|r| r.major.as_str()).collect();
    assert_eq!(majors, vec!["psychology", "biology", "biology"]);
    let standard: Vec<&str> = dataset
        .rows
        .iter()
        .map(|r| r.major_standard.as_str())
        .collect();
    assert_eq!(standard, vec!["Psychology", "Biology", "Biology"]);
    assert_eq!(dataset.report.dictionary_hits, 3);
    Ok(())
}

#[test]
fn test_missing_input_is_fatal_and_writes_nothing() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("does_not_exist.csv");
    let output = temp_dir.path().join("final_data.csv");

    let result = run_prepare_data(&input, &output, true, FeatureMode::Items);

    assert!(matches!(
        result,
        Err(riasec_major::PipelineError::InputNotFound(_))
    ));
    assert!(!output.exists());
}
