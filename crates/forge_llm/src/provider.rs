//! Provider identities and fallback ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    OpenAI,
    Grok,
}

impl LlmProvider {
    /// Default preference order.
    pub const ALL: [LlmProvider; 3] = [Self::Anthropic, Self::OpenAI, Self::Grok];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
            Self::Grok => "grok",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-5",
            Self::OpenAI => "gpt-4o",
            Self::Grok => "grok-3",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Grok => "XAI_API_KEY",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::OpenAI => "https://api.openai.com/v1/chat/completions",
            Self::Grok => "https://api.x.ai/v1/chat/completions",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "gpt" => Ok(Self::OpenAI),
            "grok" | "xai" => Ok(Self::Grok),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

/// Parse a configured provider list, dropping duplicates but keeping the
/// first-seen order.
pub fn parse_provider_order<S: AsRef<str>>(names: &[S]) -> Result<Vec<LlmProvider>, LlmError> {
    let mut order = Vec::new();
    for name in names {
        let provider: LlmProvider = name.as_ref().parse()?;
        if !order.contains(&provider) {
            order.push(provider);
        }
    }
    Ok(order)
}

/// Pick the provider for call number `attempt` (0-based) of a round.
///
/// Returns the first provider in `order` that has not failed yet. Each
/// provider gets at most one call per round, so once `attempt` reaches the
/// length of `order` there is nothing left to try.
pub fn next_provider(
    order: &[LlmProvider],
    failed: &[LlmProvider],
    attempt: usize,
) -> Option<LlmProvider> {
    if attempt >= order.len() {
        return None;
    }
    order.iter().copied().find(|p| !failed.contains(p))
}
