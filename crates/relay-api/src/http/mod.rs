use std::collections::HashSet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use relay_shared::config::{CompletionSettings, RelayConfig};
use relay_shared::conversation::ConversationPolicy;
use relay_shared::llm::LlmGateway;
use relay_shared::request_log::RequestLog;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

mod chat;
mod client_addr;
mod errors;
mod health;
mod layers;
mod rate_limit;

pub use client_addr::ClientAddress;
pub use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no upstream credential is configured.
    pub gateway: Option<Arc<dyn LlmGateway>>,
    pub conversation: Arc<ConversationPolicy>,
    pub completion: CompletionSettings,
    pub request_log: Arc<RequestLog>,
    pub rate_limiter: RateLimiter,
    pub trusted_proxy_ips: HashSet<IpAddr>,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub public_dir: PathBuf,
    pub trusted_origins: Vec<String>,
    pub json_body_limit_bytes: usize,
}

impl HttpSettings {
    pub fn from_relay_config(config: &RelayConfig) -> Self {
        Self {
            public_dir: config.public_dir.clone(),
            trusted_origins: config.trusted_origins.clone(),
            json_body_limit_bytes: config.json_body_limit_bytes,
        }
    }
}

pub fn build_router(app_state: AppState, settings: &HttpSettings) -> Router {
    let rate_limit_state = app_state.clone();
    let client_addr_state = app_state.clone();

    let api_routes = Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/chat",
            post(chat::chat).fallback(chat::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(settings.json_body_limit_bytes))
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            client_addr_state,
            client_addr::client_address_middleware,
        ))
        .with_state(app_state);

    let router = Router::new()
        .merge(api_routes)
        .fallback_service(ServeDir::new(&settings.public_dir))
        .layer(layers::cors_layer(&settings.trusted_origins));

    layers::with_security_headers(router)
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(TraceLayer::new_for_http())
}
