//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::validation::ValidationErrors;

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: No token found")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    /// The diagnosis service answered with a non-success status.
    /// `body` is already normalized for the client.
    #[error("Diagnosis service rejected request with status {status}")]
    Upstream { status: StatusCode, body: Value },
    #[error("Internal error: {detail}")]
    Internal { detail: String, expose: bool },
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal {
            detail: detail.into(),
            expose: false,
        }
    }

    /// Allow internal detail in the response body (development mode only).
    pub fn exposing_detail(self, dev_mode: bool) -> Self {
        match self {
            ApiError::Internal { detail, .. } => ApiError::Internal {
                detail,
                expose: dev_mode,
            },
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Unauthorized: No token found" }),
            ),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "message": "Request body too large" }),
            ),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Validation failed", "errors": errors }),
            ),
            ApiError::Upstream { status, body } => (status, body),
            ApiError::Internal { detail, expose } => {
                tracing::error!(detail = %detail, "Diagnosis gateway internal error");
                let body = if expose {
                    json!({ "message": "Internal server error", "error": detail })
                } else {
                    json!({ "message": "Internal server error" })
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        (status, Json(body)).into_response()
    }
}
