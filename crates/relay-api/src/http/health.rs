use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use relay_shared::models::HealthResponse;

pub(super) async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            ts: Utc::now().timestamp_millis(),
        }),
    )
}
