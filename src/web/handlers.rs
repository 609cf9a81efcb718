use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Liveness probe - always returns OK if the process is running
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}
