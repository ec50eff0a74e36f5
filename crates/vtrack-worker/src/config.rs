//! Worker configuration.

use std::time::Duration;

use vtrack_queue::DEFAULT_TOPIC;

use crate::error::{WorkerError, WorkerResult};

/// Default sampling interval, roughly one second of 30 fps video.
pub const DEFAULT_SAMPLE_INTERVAL: u64 = 30;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum videos tracked at once
    pub max_concurrent_videos: usize,
    /// Crop extraction stride in frames (K)
    pub sample_interval: u64,
    /// Work directory for downloaded videos
    pub work_dir: String,
    /// Retries for storage and publish calls, after the first attempt
    pub io_max_retries: u32,
    /// Base backoff delay for storage and publish retries
    pub io_base_delay: Duration,
    /// Downstream topic for crop batches
    pub publish_topic: String,
    /// JPEG quality for crops
    pub jpeg_quality: u8,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_videos: 2,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            work_dir: "/tmp/vtrack".to_string(),
            io_max_retries: 3,
            io_base_delay: Duration::from_millis(200),
            publish_topic: DEFAULT_TOPIC.to_string(),
            jpeg_quality: vtrack_media::DEFAULT_JPEG_QUALITY,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_videos: std::env::var("WORKER_MAX_CONCURRENT_VIDEOS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            sample_interval: std::env::var("WORKER_SAMPLE_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SAMPLE_INTERVAL),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/vtrack".to_string()),
            io_max_retries: std::env::var("WORKER_IO_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            io_base_delay: Duration::from_millis(
                std::env::var("WORKER_IO_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
            ),
            publish_topic: std::env::var("PUBLISH_TOPIC")
                .unwrap_or_else(|_| DEFAULT_TOPIC.to_string()),
            jpeg_quality: std::env::var("WORKER_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(vtrack_media::DEFAULT_JPEG_QUALITY),
        }
    }

    /// Reject settings the worker cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.sample_interval == 0 {
            return Err(WorkerError::config_error("WORKER_SAMPLE_INTERVAL must be at least 1"));
        }
        if self.max_concurrent_videos == 0 {
            return Err(WorkerError::config_error(
                "WORKER_MAX_CONCURRENT_VIDEOS must be at least 1",
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WorkerError::config_error("WORKER_JPEG_QUALITY must be 1-100"));
        }
        if self.publish_topic.trim().is_empty() {
            return Err(WorkerError::config_error("PUBLISH_TOPIC must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WorkerConfig::default();
        assert_eq!(config.sample_interval, 30);
        assert_eq!(config.publish_topic, "process-identities");
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = WorkerConfig {
            sample_interval: 0,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
