use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_MIN_CLASS_COUNT};
use crate::error::{PipelineError, Result};
use crate::types::FeatureMode;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub resources: ResourcesConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub mode: FeatureMode,
    pub test_mode: bool,
    pub fuzzy_threshold: f64,
    pub min_class_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/data.csv"),
            output_path: PathBuf::from("data/final_data_48.csv"),
            mode: FeatureMode::Items,
            test_mode: false,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_class_count: DEFAULT_MIN_CLASS_COUNT,
        }
    }
}

/// Optional resource overrides; the compiled-in taxonomy is used when unset
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub dictionary_path: Option<PathBuf>,
    pub categories_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub iterations: usize,
    pub learning_rate: f64,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/final_data_48.csv"),
            model_path: PathBuf::from("model/logreg_model.json"),
            iterations: 500,
            learning_rate: 0.5,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "riasec_major.log".to_string(),
            max_files: 3,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.pipeline.fuzzy_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(PipelineError::Config(format!(
                "fuzzy_threshold must be within 0..=100, got {}",
                threshold
            )));
        }
        let fraction = self.training.test_fraction;
        if !(0.0..1.0).contains(&fraction) {
            return Err(PipelineError::Config(format!(
                "test_fraction must be within 0..1, got {}",
                fraction
            )));
        }
        if self.training.learning_rate <= 0.0 {
            return Err(PipelineError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            mode = "aggregated"
            test_mode = true
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.mode, FeatureMode::Aggregated);
        assert!(config.pipeline.test_mode);
        assert_eq!(config.pipeline.fuzzy_threshold, 70.0);
        assert_eq!(config.pipeline.min_class_count, 2);
        assert_eq!(config.training.seed, 42);
        assert!(config.resources.dictionary_path.is_none());
    }

    #[test]
    fn test_load_from_rejects_out_of_range_threshold() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\nfuzzy_threshold = 140.0").unwrap();

        let result = Config::load_from(file.path());
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_load_from_missing_file_is_config_error() {
        let result = Config::load_from(Path::new("does/not/exist.toml"));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
