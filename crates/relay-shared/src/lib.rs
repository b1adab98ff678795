pub mod config;
mod config_env;
pub mod conversation;
pub mod llm;
pub mod models;
pub mod request_log;
