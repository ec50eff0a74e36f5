//! ML client error types.

use thiserror::Error;
use vtrack_media::MediaError;
use vtrack_tracking::TrackingError;

pub type MlClientResult<T> = Result<T, MlClientError>;

#[derive(Debug, Error)]
pub enum MlClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Inference service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Image encoding failed: {0}")]
    Encode(#[from] MediaError),

    #[error("Tracking session already closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MlClientError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl From<MlClientError> for TrackingError {
    fn from(e: MlClientError) -> Self {
        TrackingError::inference(e.to_string())
    }
}
