//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vtrack_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Tracker driven out of order.
    #[error("Sequencing fault: {0}")]
    SequencingFault(String),

    /// Detector or tracker failed.
    #[error("Model failure: {0}")]
    ModelFailure(String),

    /// Storage or publish kept failing after retries, or the service is
    /// shutting down.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ModelFailure(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::SequencingFault(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "source_not_found",
            ApiError::SequencingFault(_) => "sequencing_fault",
            ApiError::ModelFailure(_) => "model_failure",
            ApiError::Unavailable(_) => "io_exhausted",
            ApiError::Internal(_) => "internal",
        }
    }

    fn is_internal(&self) -> bool {
        !matches!(self, ApiError::BadRequest(_) | ApiError::NotFound(_))
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        let msg = err.to_string();
        if err.is_source_missing() {
            ApiError::NotFound(msg)
        } else if err.is_sequencing_fault() {
            ApiError::SequencingFault(msg)
        } else if err.is_model_failure() {
            ApiError::ModelFailure(msg)
        } else if err.is_io_exhausted() || matches!(err, WorkerError::ShuttingDown) {
            ApiError::Unavailable(msg)
        } else {
            ApiError::Internal(msg)
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}
