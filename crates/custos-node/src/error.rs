//! Maps credential errors to HTTP responses with a uniform error body:
//! `{"error": {"kind": "...", "message": "..."}}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use custos_credentials::{CredentialError, ErrorKind};

#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Validation | ErrorKind::Resolution | ErrorKind::Verify => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Signature
            | ErrorKind::StatusAllocation
            | ErrorKind::StatusCheck
            | ErrorKind::StorageCorruption
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::new(ErrorKind::Validation, format!("invalid request: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = %self.kind, message = %self.message, "request failed");
        } else {
            tracing::debug!(kind = %self.kind, message = %self.message, "request rejected");
        }
        let body = serde_json::json!({
            "error": {
                "kind": self.kind.to_string(),
                "message": self.message,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}
