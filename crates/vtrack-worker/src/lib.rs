//! Per-video tracking worker.
//!
//! This crate provides:
//! - `VideoProcessor`: download, decode and track one video
//! - Periodic crop extraction every K frames
//! - Crop upload and batch publish on a separate per-video task
//! - Retry with exponential backoff at the storage and publish boundary
//! - Structured per-video logging

pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod processor;
pub mod retry;
pub mod uploader;

pub use config::{WorkerConfig, DEFAULT_SAMPLE_INTERVAL};
pub use error::{WorkerError, WorkerResult};
pub use extractor::{BatchExtractor, PendingBatch, PendingCrop};
pub use logging::VideoLogger;
pub use processor::{ProcessingSummary, VideoProcessor};
pub use retry::{retry_async, retry_async_if, RetryConfig, RetryResult};
pub use uploader::{BatchUploader, UploadHandle, UploadStats};
