pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod taxonomy;
pub mod training;
pub mod types;

pub use error::{PipelineError, Result};
pub use pipeline::{run_prepare_data, Pipeline, PipelineOptions, PreparedDataset};
pub use taxonomy::Taxonomy;
pub use types::FeatureMode;
