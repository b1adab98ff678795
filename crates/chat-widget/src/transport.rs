use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use relay_shared::models::{ChatReply, ChatSubmission};
use thiserror::Error;
use url::Url;

pub const CHAT_PATH: &str = "/api/chat";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("invalid relay url: {0}")]
    InvalidEndpoint(String),
    #[error("relay request failed: {0}")]
    Transport(String),
    #[error("relay returned status {status}")]
    Status { status: u16, body: String },
    #[error("relay reply was not understood: {0}")]
    InvalidReply(String),
}

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<String, WidgetError>> + Send + 'a>>;

/// Delivers one submission to the relay and resolves to the reply text.
pub trait RelayTransport: Send + Sync {
    fn send<'a>(&'a self, submission: ChatSubmission) -> TransportFuture<'a>;
}

#[derive(Clone)]
pub struct HttpRelayTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRelayTransport {
    /// `base_url` is the relay origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Result<Self, WidgetError> {
        let base =
            Url::parse(base_url).map_err(|err| WidgetError::InvalidEndpoint(err.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(WidgetError::InvalidEndpoint(format!(
                "unsupported scheme: {}",
                base.scheme()
            )));
        }
        let endpoint = base
            .join(CHAT_PATH)
            .map_err(|err| WidgetError::InvalidEndpoint(err.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| WidgetError::Transport(err.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, submission: &ChatSubmission) -> Result<String, WidgetError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(submission)
            .send()
            .await
            .map_err(|err| WidgetError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| WidgetError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(WidgetError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatReply =
            serde_json::from_str(&body).map_err(|err| WidgetError::InvalidReply(err.to_string()))?;
        Ok(reply.reply)
    }
}

impl RelayTransport for HttpRelayTransport {
    fn send<'a>(&'a self, submission: ChatSubmission) -> TransportFuture<'a> {
        Box::pin(async move { self.post(&submission).await })
    }
}
