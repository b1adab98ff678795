#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    delay: Duration,
    payloads: Arc<Mutex<Vec<Value>>>,
}

/// Stand-in for the chat-completions API that records every payload.
pub struct MockCompletions {
    pub url: String,
    payloads: Arc<Mutex<Vec<Value>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockCompletions {
    pub async fn replying(content: &str) -> Self {
        Self::start(StatusCode::OK, success_body(content), Duration::ZERO).await
    }

    pub async fn replying_slowly(content: &str, delay: Duration) -> Self {
        Self::start(StatusCode::OK, success_body(content), delay).await
    }

    pub async fn failing(status: StatusCode, body: &str) -> Self {
        Self::start(status, body.to_string(), Duration::ZERO).await
    }

    async fn start(status: StatusCode, body: String, delay: Duration) -> Self {
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/chat/completions", post(completions_handler))
            .with_state(MockState {
                status,
                body,
                delay,
                payloads: payloads.clone(),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock completions listener should bind");
        let bind_addr = listener
            .local_addr()
            .expect("mock completions local address should exist");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock completions server should run");
        });

        Self {
            url: format!("http://{bind_addr}/v1/chat/completions"),
            payloads,
            handle,
        }
    }

    pub async fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().await.clone()
    }
}

impl Drop for MockCompletions {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn success_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "model": "gpt-4o-mini",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 20, "completion_tokens": 10, "total_tokens": 30 }
    })
    .to_string()
}

async fn completions_handler(
    State(state): State<MockState>,
    Json(payload): Json<Value>,
) -> (StatusCode, String) {
    state.payloads.lock().await.push(payload);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body.clone())
}
