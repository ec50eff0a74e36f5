//! Tracking error types.

use thiserror::Error;
use vtrack_media::MediaError;

/// Result type for tracking operations.
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Errors raised by the bootstrap, the session and the pipeline.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// `propagate` was called on a session that was never prompted.
    #[error("Uninitialized tracker: prompt must succeed before propagate")]
    Uninitialized,

    /// `prompt` was called on a session that is already prompted.
    #[error("Tracker already prompted")]
    AlreadyPrompted,

    /// The pipeline already failed and must be discarded.
    #[error("Pipeline already failed")]
    PipelineFailed,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid mask for track {track_id}: expected {expected:?}, got {got:?}")]
    InvalidMask {
        track_id: u32,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Frame source error: {0}")]
    Media(#[from] MediaError),
}

impl TrackingError {
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Caller-side ordering bug rather than a runtime condition.
    pub fn is_sequencing_fault(&self) -> bool {
        matches!(
            self,
            TrackingError::Uninitialized
                | TrackingError::AlreadyPrompted
                | TrackingError::PipelineFailed
        )
    }

    /// Detector or tracker failure.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            TrackingError::Inference(_) | TrackingError::InvalidMask { .. }
        )
    }
}
