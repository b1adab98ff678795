use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Turn;

/// Returned to the caller when the provider produced no usable content.
pub const FALLBACK_REPLY: &str = "No reply";

pub type LlmGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionReply, LlmGatewayError>> + Send + 'a>>;

/// Serialized as-is into the chat-completions request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmTokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionReply {
    pub model: Option<String>,
    pub content: Option<String>,
    pub usage: Option<LlmTokenUsage>,
}

impl CompletionReply {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// First-choice text, or [`FALLBACK_REPLY`] when it is missing or empty.
    pub fn into_reply_text(self) -> String {
        self.content
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string())
    }
}

#[derive(Debug, Error)]
pub enum LlmGatewayError {
    #[error("llm provider request timed out")]
    Timeout,
    #[error("llm provider request failed: {0}")]
    Transport(String),
    #[error("llm provider returned status {status}")]
    Upstream { status: u16, body: String },
    #[error("llm provider returned an invalid payload: {0}")]
    InvalidPayload(String),
}

impl LlmGatewayError {
    /// Diagnostic text safe to relay to the caller, if any.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Upstream { body, .. } => Some(body.clone()),
            Self::Timeout | Self::Transport(_) => Some(self.to_string()),
            Self::InvalidPayload(_) => None,
        }
    }
}

pub trait LlmGateway: Send + Sync {
    fn generate<'a>(&'a self, request: CompletionRequest) -> LlmGatewayFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_falls_back_when_content_missing_or_empty() {
        assert_eq!(CompletionReply::default().into_reply_text(), FALLBACK_REPLY);
        assert_eq!(
            CompletionReply::with_content("").into_reply_text(),
            FALLBACK_REPLY
        );
        assert_eq!(
            CompletionReply::with_content("Concrete: 7.5 m³").into_reply_text(),
            "Concrete: 7.5 m³"
        );
    }

    #[test]
    fn only_upstream_and_transport_errors_carry_details() {
        let upstream = LlmGatewayError::Upstream {
            status: 429,
            body: "{\"error\":{\"code\":\"rate_limit_exceeded\"}}".to_string(),
        };
        assert_eq!(
            upstream.details().as_deref(),
            Some("{\"error\":{\"code\":\"rate_limit_exceeded\"}}")
        );
        assert_eq!(
            LlmGatewayError::Timeout.details().as_deref(),
            Some("llm provider request timed out")
        );
        assert!(
            LlmGatewayError::InvalidPayload("response_json_parse_failed".to_string())
                .details()
                .is_none()
        );
    }
}
