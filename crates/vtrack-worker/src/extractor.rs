//! Periodic crop extraction.

use tracing::warn;
use vtrack_media::{crop_region, RgbImage};
use vtrack_models::{crop_storage_key, TrackId, VideoId};
use vtrack_tracking::TrackedFrame;

/// One subject crop awaiting upload.
#[derive(Debug, Clone)]
pub struct PendingCrop {
    pub track_id: TrackId,
    pub frame_idx: u64,
    /// Blob-store key the crop is written to
    pub key: String,
    pub image: RgbImage,
}

/// Crops of one sampled frame; flushed as exactly one downstream message.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    pub video_id: VideoId,
    pub frame_idx: u64,
    pub crops: Vec<PendingCrop>,
}

/// Samples every `interval`-th frame and crops each tracked subject.
#[derive(Debug, Clone)]
pub struct BatchExtractor {
    video_id: VideoId,
    interval: u64,
}

impl BatchExtractor {
    /// `interval` must be at least 1.
    pub fn new(video_id: VideoId, interval: u64) -> Self {
        Self {
            video_id,
            interval: interval.max(1),
        }
    }

    pub fn is_sampled(&self, frame_idx: u64) -> bool {
        frame_idx % self.interval == 0
    }

    /// Crop every detection of a sampled frame.
    ///
    /// `None` for frames off the sampling grid and for sampled frames with
    /// nothing to crop, so empty batches are never flushed.
    pub fn extract(&self, tracked: &TrackedFrame) -> Option<PendingBatch> {
        let frame_idx = tracked.index();
        if !self.is_sampled(frame_idx) {
            return None;
        }

        let crops: Vec<PendingCrop> = tracked
            .detections
            .iter()
            .filter_map(|detection| {
                let image = crop_region(&tracked.frame.image, &detection.bbox);
                if image.is_none() {
                    warn!(
                        frame = frame_idx,
                        track_id = %detection.track_id,
                        "No pixels to crop"
                    );
                }
                Some(PendingCrop {
                    track_id: detection.track_id,
                    frame_idx,
                    key: crop_storage_key(&self.video_id, detection.track_id, frame_idx),
                    image: image?,
                })
            })
            .collect();

        if crops.is_empty() {
            return None;
        }

        Some(PendingBatch {
            video_id: self.video_id.clone(),
            frame_idx,
            crops,
        })
    }
}
