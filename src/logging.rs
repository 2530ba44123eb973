use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{PipelineError, Result};

const DEFAULT_DIRECTIVE: &str = "riasec_major=info";

/// Build the rotating file appender, creating the log directory if needed.
///
/// Only the file name of `file_name` is used, so `logs/app.log` and `app.log`
/// land in the same place.
pub fn file_appender(directory: &Path, file_name: &str, max_files: usize) -> Result<RollingFileAppender> {
    fs::create_dir_all(directory)?;

    let file_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("riasec_major.log")
        .to_string();

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(max_files.max(1))
        .build(directory)
        .map_err(|e| PipelineError::Config(format!("Failed to create log appender: {}", e)))
}

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes buffered file output when dropped; keep it alive
/// for the life of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let appender = file_appender(&config.directory, &config.file_name, config.max_files)?;
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(appender);

    // JSON lines in the file, human-readable on the console
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| PipelineError::Config(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_appender_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let mut appender = file_appender(&log_dir, "logs/test.log", 3).unwrap();
        appender.write_all(b"Hello\n").unwrap();
        appender.flush().unwrap();

        assert!(log_dir.is_dir());
        let entries: Vec<_> = fs::read_dir(&log_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().starts_with("test.log"));
    }
}
