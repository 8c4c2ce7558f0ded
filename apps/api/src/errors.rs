use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Skill-extraction failures never reach this type: they degrade a single
/// field of the result instead of failing the request.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request input. Checked before any extraction runs.
    #[error("{0}")]
    Validation(String),

    /// The uploaded document could not be opened or decoded.
    #[error("Failed to parse document: {0}")]
    DocumentParse(String),

    /// The multipart body itself was rejected (malformed, or over the size cap).
    /// Carries the status the form reader reported.
    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upload { status, .. } => *status,
            AppError::DocumentParse(_) | AppError::Embedding(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Validation(msg) | AppError::Upload { message: msg, .. } => {
                tracing::warn!("Rejected request: {msg}")
            }
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            other => tracing::error!("{other}"),
        }

        // The message is exposed as-is; callers are internal tools.
        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
