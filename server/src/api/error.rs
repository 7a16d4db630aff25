use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{ExtractError, ParseProfileError};
use thiserror::Error;
use tracing::error;

use crate::ingest::IngestError;

/// Request boundary error. Every failure of the analyze endpoint ends up
/// here and leaves as a short JSON `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("malformed upload")]
    Upload(#[from] MultipartError),
    #[error(transparent)]
    Profile(#[from] ParseProfileError),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Ingest(IngestError::NoFile) => {
                (StatusCode::BAD_REQUEST, "No file is received".to_string())
            }
            AppError::Ingest(IngestError::EmptyUpload) => {
                (StatusCode::BAD_REQUEST, "Uploaded file is empty".to_string())
            }
            AppError::Ingest(IngestError::Stage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error writing to temp file".to_string(),
            ),
            AppError::Ingest(IngestError::Parse(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error parsing replay".to_string(),
            ),
            AppError::Upload(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (e.status(), "Uploaded file is too large".to_string())
            }
            AppError::Upload(e) => (e.status(), "No file is received".to_string()),
            AppError::Profile(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Ingest(IngestError::Worker(_)) | AppError::Extract(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            error!("API error: {:?}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
