//! Process-wide model registry.

use std::sync::Arc;

use crate::config::{BootstrapConfig, SegmentFilterConfig};
use crate::detector::Detector;
use crate::segmenter::SegmentationModel;

/// Immutable set of loaded models and their thresholds.
///
/// Built once at process start and shared behind an `Arc`. Sessions borrow
/// it to open their own tracker context and never mutate it.
pub struct ModelRegistry {
    detector: Arc<dyn Detector>,
    segmenter: Arc<dyn SegmentationModel>,
    bootstrap: BootstrapConfig,
    segment_filter: SegmentFilterConfig,
}

impl ModelRegistry {
    /// Create a registry with default thresholds.
    pub fn new(detector: Arc<dyn Detector>, segmenter: Arc<dyn SegmentationModel>) -> Self {
        Self {
            detector,
            segmenter,
            bootstrap: BootstrapConfig::default(),
            segment_filter: SegmentFilterConfig::default(),
        }
    }

    /// Set the bootstrap configuration.
    pub fn with_bootstrap_config(mut self, config: BootstrapConfig) -> Self {
        self.bootstrap = config;
        self
    }

    /// Set the mask filter configuration.
    pub fn with_segment_filter(mut self, config: SegmentFilterConfig) -> Self {
        self.segment_filter = config;
        self
    }

    pub fn detector(&self) -> &dyn Detector {
        self.detector.as_ref()
    }

    pub fn segmenter(&self) -> &dyn SegmentationModel {
        self.segmenter.as_ref()
    }

    pub fn bootstrap_config(&self) -> &BootstrapConfig {
        &self.bootstrap
    }

    pub fn segment_filter(&self) -> SegmentFilterConfig {
        self.segment_filter
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("detector", &self.detector.name())
            .field("segmenter", &self.segmenter.name())
            .field("bootstrap", &self.bootstrap)
            .field("segment_filter", &self.segment_filter)
            .finish()
    }
}
