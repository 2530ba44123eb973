use anyhow::Result;
use riasec_major::constants::item_codes;
use riasec_major::{run_prepare_data, FeatureMode};
use std::fs;
use tempfile::tempdir;

fn write_fixture(path: &std::path::Path, majors: &[&str]) -> Result<()> {
    let codes = item_codes();
    let mut contents = codes.join("\t");
    contents.push_str("\tmajor\n");
    for (row, major) in majors.iter().enumerate() {
        let values: Vec<String> = (0..codes.len())
            .map(|i| (1 + (i + row) % 5).to_string())
            .collect();
        contents.push_str(&values.join("\t"));
        contents.push('\t');
        contents.push_str(major);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    Ok(())
}

#[test]
fn test_prepare_full_item_fixture() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("data.csv");
    let output = temp_dir.path().join("final_data_48.csv");
    write_fixture(&input, &["Psychology", "biology", "Computer Science"])?;

    let dataset = run_prepare_data(&input, &output, true, FeatureMode::Items)?;

    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.columns().len(), 50);
    assert_eq!(dataset.feature_columns, item_codes());

    let written = fs::read_to_string(&output)?;
    let header: Vec<&str> = written.lines().next().unwrap_or_default().split(',').collect();
    assert_eq!(header.len(), 49);
    assert_eq!(header[0], "R1");
    assert_eq!(header[47], "C8");
    assert_eq!(header[48], "major_standard");
    assert!(!header.contains(&"major"));
    Ok(())
}

#[test]
fn test_item_values_are_rescaled_into_unit_range() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("data.csv");
    let output = temp_dir.path().join("final_data_48.csv");
    write_fixture(&input, &["Psychology", "biology", "Law", "Nursing", "Physics"])?;

    let dataset = run_prepare_data(&input, &output, true, FeatureMode::Items)?;

    for row in &dataset.rows {
        assert_eq!(row.features.len(), 48);
        assert!(row.features.iter().all(|v| (0.0..=1.0).contains(v)));
    }
    // first row starts 1,2,3,4,5
    assert_eq!(&dataset.rows[0].features[..5], &[0.0, 0.25, 0.5, 0.75, 1.0]);
    Ok(())
}
