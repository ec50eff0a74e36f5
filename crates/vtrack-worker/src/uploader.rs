//! Crop upload and batch publish, off the frame loop.
//!
//! Each video gets one uploader task fed through an unbounded channel.
//! Batches are flushed one at a time in the order they were submitted, so
//! downstream messages follow sampled-frame order.
//!
//! Submitting never waits on storage. Queued batches hold raw crops and
//! JPEG encoding happens on the uploader task, so a slow store grows the
//! backlog by one batch per sampled frame until the video ends.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use vtrack_media::encode_jpeg;
use vtrack_models::{CropBatchMessage, CropRecord};
use vtrack_queue::{publish_json, Publisher, QueueError};
use vtrack_storage::{BlobStore, StorageError};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::extractor::PendingBatch;
use crate::logging::VideoLogger;
use crate::retry::{retry_async_if, RetryConfig};

const CROP_CONTENT_TYPE: &str = "image/jpeg";

/// Totals reported by a finished uploader.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    pub batches_published: u64,
    pub crops_uploaded: u64,
}

/// Persists crops and publishes one message per batch.
#[derive(Clone)]
pub struct BatchUploader {
    store: Arc<dyn BlobStore>,
    publisher: Arc<dyn Publisher>,
    topic: String,
    retry: RetryConfig,
    jpeg_quality: u8,
}

impl BatchUploader {
    pub fn new(
        store: Arc<dyn BlobStore>,
        publisher: Arc<dyn Publisher>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            topic: config.publish_topic.clone(),
            retry: RetryConfig::new("batch_upload")
                .with_max_retries(config.io_max_retries)
                .with_base_delay(config.io_base_delay),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Upload every crop of `batch`, then publish the batch message.
    ///
    /// Nothing is published unless all crops were stored.
    pub async fn flush(&self, batch: PendingBatch) -> WorkerResult<CropBatchMessage> {
        let mut crops = Vec::with_capacity(batch.crops.len());

        for crop in batch.crops {
            let bytes = encode_jpeg(&crop.image, self.jpeg_quality)?;
            self.upload_crop(&crop.key, bytes).await?;
            metrics::counter!("vtrack_crops_uploaded_total").increment(1);

            crops.push(CropRecord {
                storage_path: crop.key,
                track_id: crop.track_id,
                frame_idx: crop.frame_idx,
            });
        }

        let message = CropBatchMessage {
            video_id: batch.video_id,
            crops,
        };
        self.publish(&message).await?;
        metrics::counter!("vtrack_batches_published_total").increment(1);

        Ok(message)
    }

    async fn upload_crop(&self, key: &str, bytes: Vec<u8>) -> WorkerResult<()> {
        let retry = self.retry.named(format!("crop_upload {}", key));
        retry_async_if(
            &retry,
            || self.store.upload(key, bytes.clone(), CROP_CONTENT_TYPE),
            StorageError::is_retryable,
        )
        .await
        .into_result()
        .map_err(|(e, attempts)| WorkerError::after_retries("crop upload", e, attempts))
    }

    async fn publish(&self, message: &CropBatchMessage) -> WorkerResult<()> {
        let retry = self.retry.named("batch_publish");
        retry_async_if(
            &retry,
            || publish_json(self.publisher.as_ref(), &self.topic, message),
            QueueError::is_retryable,
        )
        .await
        .into_result()
        .map(|_| ())
        .map_err(|(e, attempts)| WorkerError::after_retries("batch publish", e, attempts))
    }

    /// Start the per-video uploader task.
    pub fn spawn(self, logger: VideoLogger) -> UploadHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingBatch>();
        let span = logger.create_span();

        let task = tokio::spawn(
            async move {
                let mut stats = UploadStats::default();

                while let Some(batch) = rx.recv().await {
                    let frame_idx = batch.frame_idx;
                    let message = match self.flush(batch).await {
                        Ok(message) => message,
                        Err(e) => {
                            logger.log_error(&format!("batch for frame {} failed: {}", frame_idx, e));
                            return Err(e);
                        }
                    };

                    stats.batches_published += 1;
                    stats.crops_uploaded += message.crops.len() as u64;
                    logger.log_progress(&format!(
                        "published batch for frame {} ({} crops)",
                        frame_idx,
                        message.crops.len()
                    ));
                }

                Ok(stats)
            }
            .instrument(span),
        );

        UploadHandle { tx, task }
    }
}

/// Sending side of a running uploader task.
pub struct UploadHandle {
    tx: mpsc::UnboundedSender<PendingBatch>,
    task: JoinHandle<WorkerResult<UploadStats>>,
}

impl UploadHandle {
    /// Queue a batch without waiting. Fails only when the task has already
    /// stopped.
    pub fn submit(&self, batch: PendingBatch) -> Result<(), PendingBatch> {
        self.tx.send(batch).map_err(|e| e.0)
    }

    /// True once the task has stopped; while the handle is alive that only
    /// happens after a failed flush.
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished() || self.tx.is_closed()
    }

    /// Close the channel and wait for every queued batch to be flushed.
    pub async fn finish(self) -> WorkerResult<UploadStats> {
        drop(self.tx);
        self.task
            .await
            .map_err(|e| WorkerError::upload_task(e.to_string()))?
    }

    /// Stop without flushing queued batches.
    pub fn abort(self) {
        self.task.abort();
    }
}
