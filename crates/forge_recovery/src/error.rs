//! Error types for the recovery pipeline.

use forge_core::{CoreError, ErrorCategory};
use forge_llm::LlmError;
use forge_runner::RunnerError;
use thiserror::Error;

/// Result type alias for recovery operations.
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Errors that can occur during recovery.
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// The model-assisted engine produced no usable fix.
    #[error("Model-assisted recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("{category} fixer failed on {path}: {message}")]
    Fixer {
        category: ErrorCategory,
        path: String,
        message: String,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Session aborted: {0}")]
    SessionAborted(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
