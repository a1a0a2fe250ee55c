//! HTTP adapter for chat completion APIs.
//!
//! Supports Anthropic, OpenAI and xAI Grok (which speaks the OpenAI wire
//! format). Each call is a single attempt bounded by a timeout; falling
//! back to another provider is the caller's decision.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::provider::LlmProvider;

const DEFAULT_MAX_TOKENS: u32 = 8192;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// LLM adapter that handles API calls
#[derive(Debug, Clone)]
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

/// Response from LLM including usage info
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: String, model: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            endpoint: provider.endpoint().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client: reqwest::Client::new(),
        }
    }

    /// Create an adapter for `provider` from its API key environment variable.
    pub fn from_env(provider: LlmProvider, model: Option<String>) -> LlmResult<Self> {
        match std::env::var(provider.api_key_env()) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(provider, key, model)),
            _ => Err(LlmError::NotConfigured(provider.api_key_env().to_string())),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point the adapter at a different URL (proxies, local gateways).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one system + user exchange and return the reply text.
    pub async fn complete(&self, system: &str, user: &str) -> LlmResult<LlmResponse> {
        debug!(
            provider = %self.provider,
            model = %self.model,
            prompt_chars = user.len(),
            "Sending completion request"
        );

        let call = async {
            match self.provider {
                LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
                LlmProvider::OpenAI | LlmProvider::Grok => {
                    self.complete_openai_compatible(system, user).await
                }
            }
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                provider: self.provider,
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    async fn complete_openai_compatible(&self, system: &str, user: &str) -> LlmResult<LlmResponse> {
        // OpenAI renamed the token limit for newer models; Grok keeps the old name
        let (max_tokens, max_completion_tokens) = match self.provider {
            LlmProvider::OpenAI => (None, Some(self.max_tokens)),
            _ => (Some(self.max_tokens), None),
        };
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            max_completion_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                provider: self.provider,
                status: status.as_u16(),
                body,
            });
        }

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                LlmError::InvalidResponse(format!("No response from {}", self.provider))
            })?;

        let (input_tokens, output_tokens) = result
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
        })
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> LlmResult<LlmResponse> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: (!system.is_empty()).then(|| system.to_string()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                provider: self.provider,
                status: status.as_u16(),
                body,
            });
        }

        let result: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content: String = result
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect();
        if content.is_empty() {
            return Err(LlmError::InvalidResponse(
                "No response from anthropic".to_string(),
            ));
        }

        let (input_tokens, output_tokens) = result
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
        })
    }

    fn request_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                provider: self.provider,
                seconds: self.timeout.as_secs(),
            }
        } else {
            LlmError::Request {
                provider: self.provider,
                message: err.to_string(),
            }
        }
    }
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models() {
        let openai = LlmAdapter::new(LlmProvider::OpenAI, "key".to_string(), None);
        assert_eq!(openai.model(), "gpt-4o");

        let anthropic = LlmAdapter::new(LlmProvider::Anthropic, "key".to_string(), None);
        assert_eq!(anthropic.model(), "claude-sonnet-4-5");

        let grok = LlmAdapter::new(LlmProvider::Grok, "key".to_string(), None);
        assert_eq!(grok.endpoint, "https://api.x.ai/v1/chat/completions");
    }

    #[test]
    fn test_custom_model() {
        let adapter = LlmAdapter::new(
            LlmProvider::OpenAI,
            "key".to_string(),
            Some("gpt-4.1-mini".to_string()),
        )
        .with_timeout(Duration::from_secs(5));
        assert_eq!(adapter.model(), "gpt-4.1-mini");
        assert_eq!(adapter.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_token_field_per_provider() {
        let request = OpenAIRequest {
            model: "grok-3".to_string(),
            messages: Vec::new(),
            max_tokens: Some(100),
            max_completion_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 100);
        assert!(json.get("max_completion_tokens").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let adapter = LlmAdapter::new(LlmProvider::OpenAI, "key".to_string(), None)
            .with_endpoint("http://127.0.0.1:9/v1/chat/completions")
            .with_timeout(Duration::from_secs(5));

        let err = adapter.complete("system", "hello").await.unwrap_err();
        assert_eq!(err.provider(), Some(LlmProvider::OpenAI));
    }
}
