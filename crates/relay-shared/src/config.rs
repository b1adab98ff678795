use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::config_env::{
    EnvLookup, optional_trimmed_env, parse_f32_env, parse_int_env, parse_ip_list_env,
    parse_list_env,
};
use crate::llm::prompts::DEFAULT_SYSTEM_PROMPT;

pub const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.25;
pub const DEFAULT_MAX_TOKENS: u32 = 900;
pub const DEFAULT_HISTORY_LIMIT: usize = 8;

const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
const DEFAULT_RATE_LIMIT_MAX: usize = 30;
const DEFAULT_JSON_BODY_LIMIT_BYTES: usize = 100 * 1024;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub chat_completions_url: String,
    pub timeout_ms: u64,
    pub completion: CompletionSettings,
    pub history_limit: usize,
    pub system_prompt: String,
    pub trusted_origins: Vec<String>,
    pub trusted_proxy_ips: Vec<IpAddr>,
    pub rate_limit: RateLimitSettings,
    pub request_log_path: PathBuf,
    pub public_dir: PathBuf,
    pub json_body_limit_bytes: usize,
}

/// Fixed per deployment; applied to every outbound completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub window_ms: u64,
    pub max_requests: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
            max_requests: DEFAULT_RATE_LIMIT_MAX,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid number in env var {0}")]
    ParseFloat(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to read system prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build completion http client: {0}")]
    HttpClient(String),
}

impl RelayConfig {
    /// Reads the process environment, after loading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let chat_completions_url = optional_trimmed_env(env, "OPENAI_CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string());
        validate_http_url("OPENAI_CHAT_COMPLETIONS_URL", &chat_completions_url)?;

        let history_limit = parse_int_env(env, "HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?;

        let rate_limit = RateLimitSettings {
            window_ms: parse_int_env(env, "RATE_LIMIT_WINDOW_MS", DEFAULT_RATE_LIMIT_WINDOW_MS)?,
            max_requests: parse_int_env(env, "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX)?,
        };
        if rate_limit.window_ms == 0 || rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "RATE_LIMIT_WINDOW_MS and RATE_LIMIT_MAX must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host: optional_trimmed_env(env, "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_int_env(env, "PORT", DEFAULT_PORT)?,
            openai_api_key: optional_trimmed_env(env, "OPENAI_API_KEY"),
            chat_completions_url,
            timeout_ms: parse_int_env(env, "OPENAI_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            completion: CompletionSettings {
                model: optional_trimmed_env(env, "OPENAI_MODEL")
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature: parse_f32_env(env, "OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?,
                max_tokens: parse_int_env(env, "OPENAI_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            },
            history_limit,
            system_prompt: read_system_prompt(env)?,
            trusted_origins: parse_list_env(env, "TRUSTED_ORIGINS"),
            trusted_proxy_ips: parse_ip_list_env(env, "TRUSTED_PROXY_IPS")?,
            rate_limit,
            request_log_path: optional_trimmed_env(env, "REQUEST_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs").join("requests.log")),
            public_dir: optional_trimmed_env(env, "PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            json_body_limit_bytes: parse_int_env(
                env,
                "JSON_BODY_LIMIT_BYTES",
                DEFAULT_JSON_BODY_LIMIT_BYTES,
            )?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// SYSTEM_PROMPT wins over SYSTEM_PROMPT_FILE; the prompt is used verbatim, untrimmed.
fn read_system_prompt(env: EnvLookup<'_>) -> Result<String, ConfigError> {
    if let Some(prompt) = env("SYSTEM_PROMPT").filter(|value| !value.trim().is_empty()) {
        return Ok(prompt);
    }

    let Some(path) = optional_trimmed_env(env, "SYSTEM_PROMPT_FILE").map(PathBuf::from) else {
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    };

    let prompt =
        std::fs::read_to_string(&path).map_err(|source| ConfigError::PromptFile { path, source })?;
    if prompt.trim().is_empty() {
        return Err(ConfigError::InvalidConfiguration(
            "SYSTEM_PROMPT_FILE must not be empty".to_string(),
        ));
    }
    Ok(prompt)
}

fn validate_http_url(key: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw)
        .map_err(|err| ConfigError::InvalidConfiguration(format!("{key} is not a URL: {err}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::InvalidConfiguration(format!(
            "{key} must start with http:// or https://"
        ))),
    }
}
