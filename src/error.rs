//! Error handling for current-meter processing operations.
//!
//! Provides error types with context for file parsing, series construction,
//! statistics on empty records and RCM export failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurrentMeterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Malformed current-meter file {path} at line {line}: {reason}")]
    MalformedFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Malformed data row in {path} at line {line} ('{content}'): {reason}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        content: String,
        reason: String,
    },

    #[error(
        "Row count mismatch in {path}, block {block}: header declares {declared} rows, found {found}"
    )]
    RowCountMismatch {
        path: PathBuf,
        block: usize,
        declared: usize,
        found: usize,
    },

    #[error(
        "Series arrays differ in length: time={time}, speed={speed}, direction={direction}"
    )]
    ShapeMismatch {
        time: usize,
        speed: usize,
        direction: usize,
    },

    #[error("Cannot compute {operation} on an empty series")]
    EmptySeries { operation: &'static str },

    #[error("Series metadata '{field}' is not set")]
    MissingMetadata { field: &'static str },

    #[error("Processing failed for {path}: {reason}")]
    ProcessingFailed { path: PathBuf, reason: String },

    #[error("Output file already exists: {path} (use --force to overwrite)")]
    OutputExists { path: PathBuf },

    #[error("Output {output} for {path} clashes with the output of {other}")]
    OutputCollision {
        path: PathBuf,
        output: PathBuf,
        other: PathBuf,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CurrentMeterError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for the errors that mean the input file itself is corrupt
    pub fn is_corrupt_file(&self) -> bool {
        matches!(
            self,
            Self::MalformedFile { .. } | Self::MalformedRow { .. } | Self::RowCountMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CurrentMeterError>;
