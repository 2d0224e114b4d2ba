//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;
use vtrace_core::TraceError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Parsing or layout failed.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// A file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The example catalog is not valid JSON.
    #[error("invalid catalog {}: {source}", .path.display())]
    Catalog {
        /// Catalog file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// `--example` names no catalog entry.
    #[error("no example named \"{0}\" in catalog")]
    UnknownExample(String),

    /// `--execution` names no parsed execution.
    #[error("no execution labelled \"{0}\"")]
    UnknownExecution(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
