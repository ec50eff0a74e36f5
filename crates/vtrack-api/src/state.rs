//! Application state.

use std::sync::Arc;

use anyhow::Context;
use vtrack_ml_client::MlClient;
use vtrack_queue::{Publisher, RedisStreamPublisher};
use vtrack_storage::{BlobStore, S3BlobStore};
use vtrack_tracking::{BootstrapConfig, ModelRegistry, SegmentFilterConfig};
use vtrack_worker::{VideoProcessor, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub processor: Arc<VideoProcessor>,
    pub store: Arc<dyn BlobStore>,
    pub publisher: Arc<dyn Publisher>,
}

impl AppState {
    /// Build state from explicit collaborators.
    pub fn new(
        config: ApiConfig,
        registry: Arc<ModelRegistry>,
        store: Arc<dyn BlobStore>,
        publisher: Arc<dyn Publisher>,
        worker_config: WorkerConfig,
    ) -> anyhow::Result<Self> {
        let processor = VideoProcessor::new(
            registry,
            Arc::clone(&store),
            Arc::clone(&publisher),
            worker_config,
        )
        .context("invalid worker configuration")?;

        Ok(Self {
            config,
            processor: Arc::new(processor),
            store,
            publisher,
        })
    }

    /// Build state from the environment. The model registry is created here
    /// once and shared by every request.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let ml = MlClient::from_env().context("failed to configure inference client")?;
        let registry = ModelRegistry::new(ml.detector, ml.segmenter)
            .with_bootstrap_config(BootstrapConfig::from_env())
            .with_segment_filter(SegmentFilterConfig::from_env());

        let store = S3BlobStore::from_env()
            .await
            .context("failed to configure blob store")?;
        let publisher =
            RedisStreamPublisher::from_env().context("failed to configure publisher")?;

        Self::new(
            config,
            Arc::new(registry),
            Arc::new(store),
            Arc::new(publisher),
            WorkerConfig::from_env(),
        )
    }
}
