//! Liveness probe.

use axum::http::StatusCode;
use axum::response::IntoResponse;

/// GET /health
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Server is up")))]
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
