//! Error types for hydro-sweep
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// hydro-sweep error types
#[derive(Error, Debug)]
pub enum Error {
    /// `cfg.json` of a run directory is missing or malformed
    #[error("Run configuration error at {}: {message}", path.display())]
    RunConfig {
        /// Path of the configuration record
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Sweep configuration (TOML) could not be parsed or failed validation
    #[error("Sweep configuration error: {0}")]
    SweepConfig(String),

    /// Results artifact exists but cannot be decoded
    #[error("Artifact decode error in {}: {message}", path.display())]
    ArtifactDecode {
        /// Path of the results artifact
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// External program could not be started
    #[error(
        "Failed to launch `{program}`: {source}\n\
         Check the `program.command` entry of the sweep configuration"
    )]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Invalid glob pattern built from the model name
    #[error("Invalid run directory pattern: {0}")]
    Pattern(String),

    /// Storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

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
    /// Build a [`Error::RunConfig`] for the given record path.
    pub fn run_config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RunConfig {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build an [`Error::ArtifactDecode`] for the given artifact path.
    pub fn artifact(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArtifactDecode {
            path: path.into(),
            message: message.into(),
        }
    }
}
