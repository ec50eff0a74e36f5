//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tracking error: {0}")]
    Tracking(#[from] vtrack_tracking::TrackingError),

    #[error("Storage error: {0}")]
    Storage(#[from] vtrack_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] vtrack_queue::QueueError),

    #[error("Media error: {0}")]
    Media(#[from] vtrack_media::MediaError),

    /// A storage or publish call kept failing after all retries.
    #[error("{operation} failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("Upload task failed: {0}")]
    UploadTask(String),

    #[error("Worker is shutting down")]
    ShuttingDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn upload_task(msg: impl Into<String>) -> Self {
        Self::UploadTask(msg.into())
    }

    /// Final error of a retried call: `RetriesExhausted` when the last
    /// error was transient, the error itself otherwise.
    pub fn after_retries(operation: &str, error: impl Into<WorkerError>, attempts: u32) -> Self {
        let error = error.into();
        if error.is_retryable() {
            WorkerError::RetriesExhausted {
                operation: operation.to_string(),
                attempts,
                message: error.to_string(),
            }
        } else {
            error
        }
    }

    /// Check if error is a transient I/O failure worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Storage(e) => e.is_retryable(),
            WorkerError::Queue(e) => e.is_retryable(),
            WorkerError::Io(_) => true,
            _ => false,
        }
    }

    /// Storage or publish retries ran out.
    pub fn is_io_exhausted(&self) -> bool {
        matches!(self, WorkerError::RetriesExhausted { .. })
    }

    /// Tracker driven out of order; a bug, never retried.
    pub fn is_sequencing_fault(&self) -> bool {
        matches!(self, WorkerError::Tracking(e) if e.is_sequencing_fault())
    }

    /// Detector or tracker failure.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, WorkerError::Tracking(e) if e.is_model_failure())
    }

    /// The source video does not exist in the blob store.
    pub fn is_source_missing(&self) -> bool {
        matches!(
            self,
            WorkerError::Storage(vtrack_storage::StorageError::NotFound(_))
        )
    }
}
