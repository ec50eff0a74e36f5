//! One-shot object detector collaborator.

use async_trait::async_trait;
use vtrack_media::RgbImage;
use vtrack_models::BoundingBox;

use crate::error::TrackingResult;

/// Raw detector output before class filtering and identity assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: u32,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(class_id: u32, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            class_id,
            bbox,
            confidence,
        }
    }
}

/// Stateless object detector, invoked once per video on frame 0.
///
/// Implementations are shared process-wide and must not keep per-video state.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect objects with the given confidence and NMS overlap thresholds.
    ///
    /// Detections are returned in detector-defined order.
    async fn infer(
        &self,
        image: &RgbImage,
        confidence: f32,
        iou_threshold: f32,
    ) -> TrackingResult<Vec<RawDetection>>;

    /// Detector name for logging.
    fn name(&self) -> &str;
}
