use crate::engine::EngineError;
use crate::store::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients as `{"status":"error","message":...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing name or image")]
    MissingNameOrImage,
    #[error("Missing image")]
    MissingImage,
    #[error("Invalid image data")]
    InvalidImage,
    #[error("No face found")]
    NoFaceFound,
    #[error("Encoding database not found")]
    DatabaseNotFound,
    #[error("Encoding database is corrupt")]
    DatabaseCorrupt,
    #[error("Encoding dimension mismatch")]
    DimensionMismatch,
    #[error("Face encoding failed")]
    EncodingFailed,
    #[error("Internal server error")]
    Internal,
    #[error("{1}")]
    BadRequest(StatusCode, String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingNameOrImage | Self::MissingImage | Self::InvalidImage | Self::NoFaceFound => {
                StatusCode::BAD_REQUEST
            }
            Self::DatabaseNotFound
            | Self::DatabaseCorrupt
            | Self::DimensionMismatch
            | Self::EncodingFailed
            | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(status, _) => *status,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Decode(_) => Self::InvalidImage,
            EngineError::NoFaceDetected => Self::NoFaceFound,
            EngineError::Store(StoreError::NotFound(_)) => Self::DatabaseNotFound,
            EngineError::Store(StoreError::Corrupt(e)) => {
                tracing::error!(error = %e, "encoding database is corrupt");
                Self::DatabaseCorrupt
            }
            EngineError::DimensionMismatch { stored, probe } => {
                tracing::error!(stored, probe, "stored encoding dimension does not match probe");
                Self::DimensionMismatch
            }
            EngineError::Encoder(e) => {
                tracing::error!(error = %e, "face encoding failed");
                Self::EncodingFailed
            }
            other => {
                tracing::error!(error = %other, "engine failure");
                Self::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Well-formed JSON of the wrong shape is still a malformed request.
        let status = match &rejection {
            JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
            other => other.status(),
        };
        Self::BadRequest(status, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}
