pub mod gateway;
pub mod openai;
pub mod prompts;

pub use gateway::{
    CompletionReply, CompletionRequest, FALLBACK_REPLY, LlmGateway, LlmGatewayError,
    LlmGatewayFuture, LlmTokenUsage,
};
pub use openai::{OpenAiGateway, OpenAiGatewayConfig};
pub use prompts::DEFAULT_SYSTEM_PROMPT;
