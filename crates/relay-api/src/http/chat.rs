use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use relay_shared::llm::LlmGatewayError;
use relay_shared::models::{ChatReply, ChatRequest};
use tracing::{debug, error, warn};

use super::AppState;
use super::client_addr::ClientAddress;
use super::errors::{
    bad_request_response, method_not_allowed_response, missing_api_key_response,
    missing_message_response, server_error_response, status_error_response,
    upstream_error_response,
};

pub(super) async fn chat(
    State(state): State<AppState>,
    Extension(client): Extension<ClientAddress>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };

    let Some(message) = request.message.filter(|message| !message.is_empty()) else {
        return missing_message_response();
    };

    let Some(gateway) = state.gateway.as_deref() else {
        error!("chat request rejected: OPENAI_API_KEY is not configured");
        return missing_api_key_response();
    };

    let completion = state.conversation.build_request(
        &state.completion,
        request.history.as_ref(),
        &message,
    );
    debug!(
        turns = completion.messages.len(),
        history_limit = state.conversation.history_limit(),
        "relaying chat request"
    );

    let reply = match gateway.generate(completion).await {
        Ok(reply) => reply,
        Err(err) => return gateway_error_response(err),
    };
    if let Some(usage) = reply.usage.as_ref() {
        debug!(
            model = reply.model.as_deref().unwrap_or("unknown"),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "completion finished"
        );
    }
    let reply = reply.into_reply_text();

    if let Err(err) = state
        .request_log
        .record_chat(Utc::now(), &client.to_string(), &message)
        .await
    {
        warn!("failed to append request log: {err}");
    }

    (StatusCode::OK, Json(ChatReply { reply })).into_response()
}

pub(super) async fn method_not_allowed() -> Response {
    method_not_allowed_response()
}

fn gateway_error_response(err: LlmGatewayError) -> Response {
    match err.details() {
        Some(details) => {
            warn!("completion provider error: {err}: {details}");
            upstream_error_response(details)
        }
        None => {
            error!("completion request failed: {err}");
            server_error_response()
        }
    }
}

// A body without a JSON content type reads as an empty body, hence "Missing message".
fn rejection_response(rejection: JsonRejection) -> Response {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => missing_message_response(),
        JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
            debug!("rejecting chat body: {rejection}");
            bad_request_response("Invalid JSON body")
        }
        other => {
            debug!("rejecting chat body: {other}");
            status_error_response(other.status(), "Invalid request body")
        }
    }
}
