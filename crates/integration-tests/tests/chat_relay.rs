mod support;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use support::mock_completions::MockCompletions;
use support::relay_app::{RelayServer, TEST_SYSTEM_PROMPT};

struct JsonResponse {
    status: StatusCode,
    body: Value,
}

async fn post_chat(relay: &RelayServer, body: Value) -> JsonResponse {
    let response = reqwest::Client::new()
        .post(relay.url("/api/chat"))
        .json(&body)
        .send()
        .await
        .expect("chat request should complete");
    let status = response.status();
    let body = response
        .json::<Value>()
        .await
        .unwrap_or_else(|_| json!({}));

    JsonResponse { status, body }
}

async fn health_ts(relay: &RelayServer) -> i64 {
    let body = reqwest::get(relay.url("/api/health"))
        .await
        .expect("health request should complete")
        .json::<Value>()
        .await
        .expect("health body should be json");
    assert_eq!(body["ok"], json!(true));
    body["ts"].as_i64().expect("ts should be an integer")
}

#[tokio::test]
async fn chat_round_trip_through_the_completions_api() {
    let upstream = MockCompletions::replying("A 10m x 5m x 0.15m slab needs 7.5 m³ of concrete.").await;
    let relay = RelayServer::start(&upstream.url).await;

    let before = health_ts(&relay).await;
    let response = post_chat(&relay, json!({ "message": "10m x 5m x 0.15m slab" })).await;
    tokio::time::sleep(Duration::from_millis(2)).await;
    let after = health_ts(&relay).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({ "reply": "A 10m x 5m x 0.15m slab needs 7.5 m³ of concrete." })
    );
    assert!(after > before, "health ts did not increase: {before} -> {after}");

    assert_eq!(
        upstream.payloads().await,
        vec![json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": TEST_SYSTEM_PROMPT },
                { "role": "user", "content": "10m x 5m x 0.15m slab" }
            ],
            "temperature": 0.25,
            "max_tokens": 900
        })]
    );

    let lines = relay.log_lines();
    assert_eq!(lines.len(), 1);
    assert!(
        lines[0].ends_with(" | 127.0.0.1 | msg=10m x 5m x 0.15m slab"),
        "unexpected log line: {}",
        lines[0]
    );
}

#[tokio::test]
async fn only_the_last_eight_history_turns_are_forwarded_without_extra_fields() {
    let upstream = MockCompletions::replying("ok").await;
    let relay = RelayServer::start(&upstream.url).await;

    let history: Vec<Value> = (0..12)
        .map(|index| {
            let role = if index % 2 == 0 { "user" } else { "assistant" };
            json!({
                "role": role,
                "content": format!("turn {index}"),
                "timestamp": 1_700_000_000 + index,
                "id": format!("msg-{index}")
            })
        })
        .collect();

    let response = post_chat(
        &relay,
        json!({ "message": "and the footing?", "history": history }),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let payloads = upstream.payloads().await;
    assert_eq!(payloads.len(), 1);
    let messages = payloads[0]["messages"]
        .as_array()
        .expect("messages should be an array");

    assert_eq!(messages.len(), 10);
    assert_eq!(
        messages[0],
        json!({ "role": "system", "content": TEST_SYSTEM_PROMPT })
    );
    for (offset, message) in messages[1..9].iter().enumerate() {
        let index = offset + 4;
        let role = if index % 2 == 0 { "user" } else { "assistant" };
        assert_eq!(
            message,
            &json!({ "role": role, "content": format!("turn {index}") })
        );
    }
    assert_eq!(
        messages[9],
        json!({ "role": "user", "content": "and the footing?" })
    );
}

#[tokio::test]
async fn upstream_failure_is_reported_with_its_body() {
    let upstream_body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
    let upstream = MockCompletions::failing(StatusCode::TOO_MANY_REQUESTS, upstream_body).await;
    let relay = RelayServer::start(&upstream.url).await;

    let response = post_chat(&relay, json!({ "message": "hello" })).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.body,
        json!({ "error": "OpenAI error", "details": upstream_body })
    );
    assert!(response.body.get("reply").is_none());
    assert_eq!(upstream.payloads().await.len(), 1);
    assert!(relay.log_lines().is_empty());
}

#[tokio::test]
async fn missing_message_never_reaches_upstream() {
    let upstream = MockCompletions::replying("unused").await;
    let relay = RelayServer::start(&upstream.url).await;

    for body in [json!({}), json!({ "message": "" }), json!({ "history": [] })] {
        let response = post_chat(&relay, body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body, json!({ "error": "Missing message" }));
    }

    assert!(upstream.payloads().await.is_empty());
}

#[tokio::test]
async fn missing_credential_is_a_configuration_error() {
    let upstream = MockCompletions::replying("unused").await;
    let relay =
        RelayServer::start_with(&[("OPENAI_CHAT_COMPLETIONS_URL", upstream.url.as_str())]).await;

    let response = post_chat(&relay, json!({ "message": "hello" })).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.body,
        json!({ "error": "OPENAI_API_KEY not configured" })
    );
    assert!(upstream.payloads().await.is_empty());
}

#[tokio::test]
async fn unreachable_upstream_reports_openai_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("address should resolve");
    drop(listener);

    let relay = RelayServer::start(&format!("http://{addr}/v1/chat/completions")).await;
    let response = post_chat(&relay, json!({ "message": "hello" })).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], json!("OpenAI error"));
    assert!(response.body["details"].is_string());
}

#[tokio::test]
async fn index_page_is_served_from_the_public_dir() {
    let upstream = MockCompletions::replying("unused").await;
    let relay = RelayServer::start(&upstream.url).await;

    let response = reqwest::get(relay.url("/"))
        .await
        .expect("index request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("index body should read");
    assert!(body.contains("<title>chat</title>"));
}
