//! Frames and per-track detections.

use vtrack_media::RgbImage;
use vtrack_models::{BoundingBox, TrackId};

use crate::mask::Mask;

/// One decoded frame with its zero-based position in the video.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A tracked subject at one frame.
///
/// Bootstrap detections carry `class_id` and `confidence` but no mask;
/// propagated detections carry a mask and a box derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub track_id: TrackId,
    pub bbox: BoundingBox,
    pub class_id: Option<u32>,
    pub confidence: Option<f32>,
    pub mask: Option<Mask>,
}

/// Output of the pipeline for one frame.
#[derive(Debug, Clone)]
pub struct TrackedFrame {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

impl TrackedFrame {
    pub fn index(&self) -> u64 {
        self.frame.index
    }

    /// Track identities present at this frame, in output order.
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.detections.iter().map(|d| d.track_id).collect()
    }
}
