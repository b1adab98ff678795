#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use relay_api::http::{AppState, HttpSettings, RateLimiter, build_router};
use relay_shared::config::RelayConfig;
use relay_shared::conversation::ConversationPolicy;
use relay_shared::llm::{LlmGateway, OpenAiGateway, OpenAiGatewayConfig};
use relay_shared::request_log::RequestLog;
use tempfile::TempDir;

pub const TEST_SYSTEM_PROMPT: &str = "You are a construction estimating assistant.";

/// A relay bound to an ephemeral port, wired the same way as the binary.
pub struct RelayServer {
    pub base_url: String,
    pub log_path: PathBuf,
    _dir: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl RelayServer {
    pub async fn start(completions_url: &str) -> Self {
        Self::start_with(&[
            ("OPENAI_API_KEY", "sk-integration"),
            ("OPENAI_CHAT_COMPLETIONS_URL", completions_url),
        ])
        .await
    }

    pub async fn start_with(vars: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("temp dir should create");
        let public_dir = dir.path().join("public");
        std::fs::create_dir_all(&public_dir).expect("public dir should create");
        std::fs::write(public_dir.join("index.html"), "<!doctype html><title>chat</title>")
            .expect("index should write");
        let log_path = dir.path().join("logs").join("requests.log");

        let mut env: HashMap<String, String> = HashMap::from([
            ("SYSTEM_PROMPT".to_string(), TEST_SYSTEM_PROMPT.to_string()),
            (
                "PUBLIC_DIR".to_string(),
                public_dir.to_string_lossy().into_owned(),
            ),
            (
                "REQUEST_LOG_PATH".to_string(),
                log_path.to_string_lossy().into_owned(),
            ),
        ]);
        for (key, value) in vars {
            env.insert((*key).to_string(), (*value).to_string());
        }

        let config = RelayConfig::from_lookup(&|key: &str| env.get(key).cloned())
            .expect("test config should be valid");

        let gateway: Option<Arc<dyn LlmGateway>> = OpenAiGatewayConfig::from_relay_config(&config)
            .map(|gateway_config| {
                Arc::new(OpenAiGateway::new(gateway_config).expect("gateway should build"))
                    as Arc<dyn LlmGateway>
            });
        let request_log = RequestLog::open(&config.request_log_path)
            .await
            .expect("request log should open");

        let app = build_router(
            AppState {
                gateway,
                conversation: Arc::new(ConversationPolicy::from_relay_config(&config)),
                completion: config.completion.clone(),
                request_log: Arc::new(request_log),
                rate_limiter: RateLimiter::new(config.rate_limit),
                trusted_proxy_ips: config.trusted_proxy_ips.iter().copied().collect::<HashSet<_>>(),
            },
            &HttpSettings::from_relay_config(&config),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("relay listener should bind");
        let bind_addr = listener
            .local_addr()
            .expect("relay local address should exist");

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("relay server should run");
        });

        Self {
            base_url: format!("http://{bind_addr}"),
            log_path,
            _dir: dir,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn log_lines(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log_path)
            .unwrap_or_default()
            .lines()
            .map(ToString::to_string)
            .collect()
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
