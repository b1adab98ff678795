use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_api::http::{self, AppState, HttpSettings, RateLimiter};
use relay_shared::config::RelayConfig;
use relay_shared::conversation::ConversationPolicy;
use relay_shared::llm::{LlmGateway, OpenAiGateway, OpenAiGatewayConfig};
use relay_shared::request_log::RequestLog;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "relay_api=debug,relay_shared=info,tower_http=info".to_string()
        }))
        .init();

    let config = match RelayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let gateway: Option<Arc<dyn LlmGateway>> =
        match OpenAiGatewayConfig::from_relay_config(&config) {
            Some(gateway_config) => match OpenAiGateway::new(gateway_config) {
                Ok(gateway) => Some(Arc::new(gateway)),
                Err(err) => {
                    error!("failed to build completion gateway: {err}");
                    std::process::exit(1);
                }
            },
            None => {
                warn!("OPENAI_API_KEY is not set; /api/chat will report a configuration error");
                None
            }
        };

    let request_log = match RequestLog::open(&config.request_log_path).await {
        Ok(log) => log,
        Err(err) => {
            error!("failed to open request log: {err}");
            std::process::exit(1);
        }
    };
    info!(path = %request_log.path().display(), "appending chat requests to log");

    let rate_limiter = RateLimiter::new(config.rate_limit);
    let _pruner = rate_limiter.spawn_pruner(Duration::from_millis(config.rate_limit.window_ms));

    let settings = HttpSettings::from_relay_config(&config);
    let app = http::build_router(
        AppState {
            gateway,
            conversation: Arc::new(ConversationPolicy::from_relay_config(&config)),
            completion: config.completion.clone(),
            request_log: Arc::new(request_log),
            rate_limiter,
            trusted_proxy_ips: config.trusted_proxy_ips.iter().copied().collect::<HashSet<_>>(),
        },
        &settings,
    );

    let bind_addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {bind_addr}: {err}");
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(addr) => info!("chat relay listening on http://{addr}"),
        Err(_) => info!("chat relay listening on http://{bind_addr}"),
    }

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(err) = server.await {
        error!("server terminated with error: {err}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
