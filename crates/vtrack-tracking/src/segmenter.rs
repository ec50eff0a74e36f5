//! Stateful segmentation tracker collaborator.
//!
//! The model weights (`SegmentationModel`) are loaded once per process and
//! shared read-only. Everything that changes while a video is tracked lives
//! in a `TrackerContext`, opened per video and never shared.

use async_trait::async_trait;
use ndarray::Array2;
use vtrack_media::RgbImage;
use vtrack_models::{BoundingBox, TrackId};

use crate::error::TrackingResult;

/// Mask confidence field (logits, `height x width`) for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskField {
    pub track_id: TrackId,
    pub logits: Array2<f32>,
}

impl MaskField {
    pub fn new(track_id: TrackId, logits: Array2<f32>) -> Self {
        Self { track_id, logits }
    }
}

/// Process-wide segmentation model.
#[async_trait]
pub trait SegmentationModel: Send + Sync {
    /// Open a fresh, private tracking context for one video.
    async fn open_context(&self) -> TrackingResult<Box<dyn TrackerContext>>;

    /// Model name for logging.
    fn name(&self) -> &str;
}

/// Mutable per-video tracker state (prompt set, internal frame counter).
///
/// Calls must follow the order: `load_first_frame`, one or more
/// `add_prompt`, then `advance` once per subsequent frame in strict order.
#[async_trait]
pub trait TrackerContext: Send {
    /// Hand the first frame to the tracker.
    async fn load_first_frame(&mut self, image: &RgbImage) -> TrackingResult<()>;

    /// Register one region prompt for `track_id` anchored at `frame_index`.
    async fn add_prompt(
        &mut self,
        frame_index: u64,
        track_id: TrackId,
        bbox: BoundingBox,
    ) -> TrackingResult<()>;

    /// Advance one frame, returning a mask field per still-tracked identity.
    async fn advance(&mut self, image: &RgbImage) -> TrackingResult<Vec<MaskField>>;

    /// Release the context. The default does nothing.
    async fn close(&mut self) -> TrackingResult<()> {
        Ok(())
    }
}
