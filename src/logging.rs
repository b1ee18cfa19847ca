//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use chrono::{Local, NaiveDate};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory or file could not be opened.
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    /// `logging.level` is not a valid filter directive.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    /// A global subscriber is already installed.
    #[error("logging already initialised: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Daily log file inside `dir`, e.g. `logs/nse-chain_19-10-2026.log`.
#[must_use]
pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("nse-chain_{}.log", date.format("%d-%m-%Y")))
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`. When `logging.dir` is
/// set, events are also appended to today's log file, whose path is returned.
///
/// # Errors
/// Returns error if the filter is invalid, the file cannot be opened, or a
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<Option<PathBuf>, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.trim())?,
    };

    let file = match &config.dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = log_file_path(dir, Local::now().date_naive());
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            Some((path, Arc::new(file)))
        }
        None => None,
    };
    let file_layer = file.as_ref().map(|(_, file)| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::clone(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()?;

    Ok(file.map(|(path, _)| path))
}
