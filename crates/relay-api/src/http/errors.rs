use std::any::Any;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use relay_shared::models::ErrorResponse;
use tracing::error;

pub(super) const MISSING_MESSAGE: &str = "Missing message";
pub(super) const MISSING_API_KEY: &str = "OPENAI_API_KEY not configured";
pub(super) const UPSTREAM_ERROR: &str = "OpenAI error";
pub(super) const SERVER_ERROR: &str = "Server error";
pub(super) const RATE_LIMITED: &str = "Too many requests, please try again later.";

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}

pub(super) fn bad_request_response(error: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, error, None)
}

pub(super) fn missing_message_response() -> Response {
    bad_request_response(MISSING_MESSAGE)
}

pub(super) fn missing_api_key_response() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, MISSING_API_KEY, None)
}

pub(super) fn upstream_error_response(details: String) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        UPSTREAM_ERROR,
        Some(details),
    )
}

pub(super) fn server_error_response() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR, None)
}

pub(super) fn status_error_response(status: StatusCode, error: &str) -> Response {
    error_response(status, error, None)
}

pub(super) fn method_not_allowed_response() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
}

pub(super) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!("request handler panicked: {detail}");
    server_error_response()
}

pub(super) fn too_many_requests_response(retry_after_seconds: u64) -> Response {
    let mut response = error_response(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED, None);

    if let Ok(retry_after_value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, retry_after_value);
    }

    response
}
