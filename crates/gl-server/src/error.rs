//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`gl_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on store and service calls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gl_core::FieldIssue;
use serde::Serialize;

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable message. Generic for internal failures.
    pub error: String,
    /// Machine-readable category: `validation_error`, `not_found` or
    /// `internal_error`.
    pub code: String,
    /// Field-level detail for validation failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldIssue>,
}

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: gl_core::Error,
}

impl AppError {
    pub fn new(inner: gl_core::Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &gl_core::Error {
        &self.inner
    }
}

impl From<gl_core::Error> for AppError {
    fn from(e: gl_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        let body = ErrorBody {
            error: self.inner.public_message(),
            code: self.inner.kind().code().to_string(),
            details: self.inner.fields().to_vec(),
        };

        (status, axum::Json(body)).into_response()
    }
}
