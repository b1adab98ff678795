//! Conversation model behind the chat widget: visible log, client-held
//! history, single in-flight submission, and the transport to the relay.

pub mod cli;
mod log;
mod markdown;
mod transport;
mod widget;

pub use log::{ChatLog, LogEntry, Speaker};
pub use markdown::render_markdown;
pub use transport::{HttpRelayTransport, RelayTransport, TransportFuture, WidgetError};
pub use widget::{
    CHIP_PROMPTS, CLEARED_NOTICE, ChatWidget, ERROR_NOTICE, PENDING_PLACEHOLDER, SubmitOutcome,
    WELCOME_MESSAGE,
};
