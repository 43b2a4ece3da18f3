//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`pd_core::Error`] so that route handlers
//! can return `Result<T, AppError>` directly.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: pd_core::Error,
    message: Option<String>,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: pd_core::Error) -> Self {
        Self {
            inner,
            message: None,
            request_id: None,
        }
    }

    /// Replace the user-facing error text; the original is still logged.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl From<pd_core::Error> for AppError {
    fn from(e: pd_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        let inner = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            pd_core::Error::PayloadTooLarge(e.body_text())
        } else {
            pd_core::Error::Validation(format!("invalid multipart body: {}", e.body_text()))
        };
        Self::new(inner)
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

        let body = json!({
            "success": false,
            "error": self.message.unwrap_or_else(|| self.inner.to_string()),
            "code": self.inner.code(),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
