use std::time::Duration;

use serde::Deserialize;

use super::gateway::{
    CompletionReply, CompletionRequest, LlmGateway, LlmGatewayError, LlmGatewayFuture,
    LlmTokenUsage,
};
use crate::config::{ConfigError, RelayConfig};

#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl OpenAiGatewayConfig {
    /// `None` when no credential is configured; the relay then answers chat
    /// requests with a configuration error instead of calling upstream.
    pub fn from_relay_config(config: &RelayConfig) -> Option<Self> {
        let api_key = config.openai_api_key.clone()?;
        Some(Self {
            chat_completions_url: config.chat_completions_url.clone(),
            api_key,
            timeout_ms: config.timeout_ms,
        })
    }
}

/// Single-shot client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionReply, LlmGatewayError> {
        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                LlmGatewayError::Timeout
            } else {
                LlmGatewayError::Transport(err.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(LlmGatewayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OpenAiSuccessResponse = serde_json::from_str(&body).map_err(|_| {
            LlmGatewayError::InvalidPayload("response_json_parse_failed".to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);

        Ok(CompletionReply {
            model: parsed.model,
            content,
            usage: parsed.usage.map(|usage| LlmTokenUsage {
                prompt_tokens: clamp_u64_to_u32(usage.prompt_tokens.unwrap_or(0)),
                completion_tokens: clamp_u64_to_u32(usage.completion_tokens.unwrap_or(0)),
                total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
            }),
        })
    }
}

impl LlmGateway for OpenAiGateway {
    fn generate<'a>(&'a self, request: CompletionRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move { self.send(&request).await })
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiSuccessResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
