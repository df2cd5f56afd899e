//! Error types for pose-kinematics
//!
//! Schema problems (a landmark column that is not there) fail loudly.
//! Degenerate statistics never surface here: the binning engine falls back to
//! documented defaults instead of returning an error.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// pose-kinematics error types
#[derive(Error, Debug)]
pub enum Error {
    /// Required column absent from a table (aborts the run)
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// Column name that was looked up
        column: String,
    },

    /// Required source file absent (aborts the current stage only)
    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Invalid caller-supplied input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Settings document could not be interpreted
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error (CSV/Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::MissingColumn`]
    #[must_use]
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}
