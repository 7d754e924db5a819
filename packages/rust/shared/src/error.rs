//! Error types for the ERDDAP ISO harvester.
//!
//! Library crates use [`HarvestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! An attribute that is simply missing from a dataset is never an error:
//! lookups return `None` for that case.

use std::path::PathBuf;

/// Top-level error type for all harvest operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the ERDDAP server.
    #[error("network error: {0}")]
    Network(String),

    /// CSV/JSON decoding error for a server response.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The MCF skeleton template could not be loaded.
    #[error("template error: {message}")]
    Template { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A dataset named in the include list is not in the fetched catalog.
    #[error("dataset '{dataset_id}' was requested but is not in the catalog")]
    DatasetNotFound { dataset_id: String },

    /// A dataset id cannot be used as an output file name.
    #[error("dataset id '{dataset_id}' is not a valid file name")]
    InvalidDatasetId { dataset_id: String },

    /// A record could not be serialized for output.
    #[error("serialize error: {0}")]
    Serialize(String),

    /// The external XML generator failed to run.
    #[error("generator error: {0}")]
    Generator(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a template error from any displayable message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The include list named a dataset the server does not publish.
    pub fn dataset_not_found(dataset_id: impl Into<String>) -> Self {
        Self::DatasetNotFound {
            dataset_id: dataset_id.into(),
        }
    }

    /// The dataset id would escape the output directory.
    pub fn invalid_dataset_id(dataset_id: impl Into<String>) -> Self {
        Self::InvalidDatasetId {
            dataset_id: dataset_id.into(),
        }
    }
}
