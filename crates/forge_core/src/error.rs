//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while handling file sets, projects and config.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Duplicate file basename: {0}")]
    DuplicateBasename(String),

    #[error("Invalid source path: {0}")]
    InvalidPath(String),

    #[error("Project directory not found: {0}")]
    ProjectNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
