//! Error types for LLM calls and response parsing.

use thiserror::Error;

use crate::provider::LlmProvider;

/// Result type alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors raised by providers or while decoding their replies.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM not configured: set {0}")]
    NotConfigured(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("{provider} request failed: {message}")]
    Request {
        provider: LlmProvider,
        message: String,
    },

    #[error("{provider} API error {status}: {body}")]
    Http {
        provider: LlmProvider,
        status: u16,
        body: String,
    },

    #[error("{provider} timed out after {seconds} seconds")]
    Timeout { provider: LlmProvider, seconds: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response does not match schema: {0}")]
    Schema(String),

    #[error("All providers failed: {}", .0.join("; "))]
    AllProvidersFailed(Vec<String>),
}

impl LlmError {
    /// Provider that produced the error, when known.
    pub fn provider(&self) -> Option<LlmProvider> {
        match self {
            Self::Request { provider, .. }
            | Self::Http { provider, .. }
            | Self::Timeout { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}
