//! Per-video processing.
//!
//! The frame loop runs on the calling task and never waits on storage or
//! the publisher: sampled batches are handed to the per-video uploader.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::Instrument;
use vtrack_media::{FfmpegFrameSource, FrameSource};
use vtrack_models::{TrackVideoRequest, VideoId};
use vtrack_queue::Publisher;
use vtrack_storage::{BlobStore, StorageError};
use vtrack_tracking::{ModelRegistry, VideoPipeline};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::extractor::BatchExtractor;
use crate::logging::VideoLogger;
use crate::retry::{retry_async_if, RetryConfig};
use crate::uploader::{BatchUploader, UploadHandle};

/// Outcome of one fully processed video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    pub video_id: VideoId,
    pub frames_processed: u64,
    pub batches_published: u64,
    pub crops_uploaded: u64,
    pub duration_ms: u64,
}

enum LoopOutcome {
    Drained(u64),
    UploaderStopped,
}

/// Tracks videos end to end, bounded to a fixed number at once.
pub struct VideoProcessor {
    registry: Arc<ModelRegistry>,
    store: Arc<dyn BlobStore>,
    publisher: Arc<dyn Publisher>,
    config: WorkerConfig,
    permits: Arc<Semaphore>,
}

impl VideoProcessor {
    pub fn new(
        registry: Arc<ModelRegistry>,
        store: Arc<dyn BlobStore>,
        publisher: Arc<dyn Publisher>,
        config: WorkerConfig,
    ) -> WorkerResult<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            store,
            publisher,
            permits: Arc::new(Semaphore::new(config.max_concurrent_videos)),
            config,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Videos that could start right now without waiting.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop admitting new videos. In-flight videos run to completion.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Download, decode and track one video, publishing every sampled batch.
    pub async fn process(&self, request: &TrackVideoRequest) -> WorkerResult<ProcessingSummary> {
        let logger = VideoLogger::new(&request.video_id, "track_video");
        let span = logger.create_span();

        async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| WorkerError::ShuttingDown)?;

            logger.log_start(&request.video_path);
            let result = self.process_inner(request, &logger).await;
            record_outcome(&logger, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn process_inner(
        &self,
        request: &TrackVideoRequest,
        logger: &VideoLogger,
    ) -> WorkerResult<ProcessingSummary> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let work_dir = tempfile::Builder::new()
            .prefix("vtrack-")
            .tempdir_in(&self.config.work_dir)?;

        let extension = Path::new(&request.video_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let local_path = work_dir.path().join(format!("input.{}", extension));

        self.download_source(&request.video_path, &local_path).await?;

        let source = FfmpegFrameSource::open(&local_path).await?;
        let info = source.info();
        logger.log_progress(&format!(
            "decoding {}x{} at {:.2} fps ({} frames expected)",
            info.width,
            info.height,
            info.fps,
            info.frame_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ));

        // `work_dir` is removed when it goes out of scope, after tracking.
        self.track_frames(&request.video_id, source, logger).await
    }

    async fn download_source(&self, key: &str, path: &Path) -> WorkerResult<()> {
        let retry = RetryConfig::new(format!("source_download {}", key))
            .with_max_retries(self.config.io_max_retries)
            .with_base_delay(self.config.io_base_delay);

        retry_async_if(
            &retry,
            || self.store.download_to_file(key, path),
            StorageError::is_retryable,
        )
        .await
        .into_result()
        .map_err(|(e, attempts)| WorkerError::after_retries("source download", e, attempts))
    }

    /// Run the frame loop over `source`, publishing every sampled batch.
    pub async fn track_frames<S: FrameSource>(
        &self,
        video_id: &VideoId,
        source: S,
        logger: &VideoLogger,
    ) -> WorkerResult<ProcessingSummary> {
        let started = Instant::now();
        let extractor = BatchExtractor::new(video_id.clone(), self.config.sample_interval);
        let uploads = BatchUploader::new(
            Arc::clone(&self.store),
            Arc::clone(&self.publisher),
            &self.config,
        )
        .spawn(logger.clone());

        let mut pipeline = VideoPipeline::new(&self.registry, source);
        let outcome = drive(&mut pipeline, &extractor, &uploads).await;

        if let Err(e) = pipeline.close().await {
            logger.log_warning(&format!("tracker context close failed: {}", e));
        }

        let frames_processed = match outcome {
            Ok(LoopOutcome::Drained(frames)) => frames,
            Ok(LoopOutcome::UploaderStopped) => {
                return Err(match uploads.finish().await {
                    Err(e) => e,
                    Ok(_) => WorkerError::upload_task("uploader stopped early"),
                });
            }
            Err(e) => {
                uploads.abort();
                return Err(e);
            }
        };

        let stats = uploads.finish().await?;

        Ok(ProcessingSummary {
            video_id: video_id.clone(),
            frames_processed,
            batches_published: stats.batches_published,
            crops_uploaded: stats.crops_uploaded,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

async fn drive<S: FrameSource>(
    pipeline: &mut VideoPipeline<'_, S>,
    extractor: &BatchExtractor,
    uploads: &UploadHandle,
) -> WorkerResult<LoopOutcome> {
    while let Some(tracked) = pipeline.next().await? {
        if let Some(batch) = extractor.extract(&tracked) {
            if uploads.is_stopped() || uploads.submit(batch).is_err() {
                return Ok(LoopOutcome::UploaderStopped);
            }
        }
    }
    Ok(LoopOutcome::Drained(pipeline.frames_emitted()))
}

fn record_outcome(logger: &VideoLogger, result: &WorkerResult<ProcessingSummary>) {
    match result {
        Ok(summary) => {
            metrics::counter!("vtrack_videos_processed_total").increment(1);
            metrics::histogram!("vtrack_video_duration_seconds")
                .record(summary.duration_ms as f64 / 1000.0);
            logger.log_completion(&format!(
                "{} frames, {} batches, {} crops in {} ms",
                summary.frames_processed,
                summary.batches_published,
                summary.crops_uploaded,
                summary.duration_ms
            ));
        }
        Err(e) => {
            let reason = if e.is_sequencing_fault() {
                "sequencing_fault"
            } else if e.is_model_failure() {
                "model_failure"
            } else if e.is_io_exhausted() {
                "io_exhausted"
            } else {
                "other"
            };
            metrics::counter!("vtrack_videos_failed_total", "reason" => reason).increment(1);
            logger.log_error(&e.to_string());
        }
    }
}
