use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use riasec_major::config::{Config, DEFAULT_CONFIG_PATH};
use riasec_major::logging;
use riasec_major::model::{predict, ModelArtifact};
use riasec_major::pipeline::{Pipeline, PipelineOptions};
use riasec_major::taxonomy::Taxonomy;
use riasec_major::training::{train, TrainingData};
use riasec_major::types::FeatureMode;

#[derive(Parser)]
#[command(name = "riasec-major")]
#[command(about = "Prepare RIASEC survey data, train a major classifier, and predict majors")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw TSV export into a training CSV
    Prepare {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Feature granularity: 48 items or 6 group means
        #[arg(long, value_enum)]
        mode: Option<FeatureMode>,
        /// Skip fuzzy matching and class filtering
        #[arg(long)]
        test_mode: bool,
        /// Curated synonym dictionary (TOML)
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Canonical category list (TOML)
        #[arg(long)]
        categories: Option<PathBuf>,
    },
    /// Fit the classifier on a prepared CSV
    Train {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Predict a major from comma-separated feature values in [0, 1]
    Predict {
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        features: Vec<f64>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Config::load().with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH)),
    }
}

fn load_taxonomy(config: &Config) -> Result<Taxonomy> {
    match (&config.resources.dictionary_path, &config.resources.categories_path) {
        (Some(dictionary), Some(categories)) => Taxonomy::load(dictionary, categories)
            .context("loading label resources"),
        (None, None) => Taxonomy::builtin().context("loading built-in label resources"),
        _ => anyhow::bail!("dictionary and categories paths must be configured together"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    let _guard = logging::init_logging(&config.logging).context("initializing logging")?;

    match cli.command {
        Commands::Prepare {
            input,
            output,
            mode,
            test_mode,
            dictionary,
            categories,
        } => {
            if let Some(input) = input {
                config.pipeline.input_path = input;
            }
            if let Some(output) = output {
                config.pipeline.output_path = output;
            }
            if let Some(mode) = mode {
                config.pipeline.mode = mode;
            }
            config.pipeline.test_mode |= test_mode;
            if dictionary.is_some() {
                config.resources.dictionary_path = dictionary;
            }
            if categories.is_some() {
                config.resources.categories_path = categories;
            }

            let taxonomy = load_taxonomy(&config)?;
            info!(
                "Loaded taxonomy: {} synonyms, {} categories",
                taxonomy.dictionary_len(),
                taxonomy.categories().len()
            );
            let pipeline = Pipeline::new(taxonomy, PipelineOptions::from(&config.pipeline));

            info!("Starting data preparation");
            let dataset = pipeline
                .run(&config.pipeline.input_path, &config.pipeline.output_path)
                .inspect_err(|e| error!("Data preparation failed: {}", e))
                .context("preparing data")?;

            println!("\n📊 Preparation results:");
            println!("   Rows loaded: {}", dataset.report.rows_loaded);
            println!("   Raw duplicates removed: {}", dataset.report.raw_duplicates_removed);
            println!("   Rows with missing values: {}", dataset.report.rows_missing_values);
            println!("   Rows with empty major: {}", dataset.report.rows_empty_major);
            println!("   Dictionary hits: {}", dataset.report.dictionary_hits);
            println!("   Fuzzy matches: {}", dataset.report.fuzzy_matches);
            println!("   Other removed: {}", dataset.report.other_removed);
            println!("   Rare-class rows removed: {}", dataset.report.rare_removed);
            println!("   Final rows: {}", dataset.report.final_rows);
            println!("   Categories: {}", dataset.report.categories);
            println!("   Output file: {}", config.pipeline.output_path.display());
        }
        Commands::Train {
            data,
            model,
            iterations,
        } => {
            if let Some(data) = data {
                config.training.data_path = data;
            }
            if let Some(model) = model {
                config.training.model_path = model;
            }
            if let Some(iterations) = iterations {
                config.training.iterations = iterations;
            }

            info!("==== Starting model training ====");
            let data = TrainingData::load(&config.training.data_path).context("loading training data")?;
            let (artifact, summary) = train(&data, &config.training).context("training model")?;
            artifact
                .save(&config.training.model_path)
                .context("saving model artifact")?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Predict { model, features } => {
            let model_path = model.unwrap_or_else(|| config.training.model_path.clone());
            let artifact = ModelArtifact::load(&model_path).context("loading model artifact")?;
            let prediction = predict(&artifact, &features).context("invalid input format")?;

            info!(
                "Prediction success | input={:?} | predicted={}",
                features, prediction.predicted_major
            );
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
    }

    Ok(())
}
