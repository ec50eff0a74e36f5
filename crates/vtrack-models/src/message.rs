//! Inbound and outbound message schemas.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::track::TrackId;
use crate::video::VideoId;

/// Request to track one video, decoded from the ingress envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrackVideoRequest {
    /// Blob-store key of the source video (e.g. `source/game1.mp4`)
    pub video_path: String,
    /// Video identity used in crop keys and the outbound batch
    pub video_id: VideoId,
}

/// One persisted crop of one tracked subject at one sampled frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropRecord {
    /// Blob-store key of the crop image
    #[serde(rename = "gcs_path")]
    pub storage_path: String,
    pub track_id: TrackId,
    pub frame_idx: u64,
}

/// Batch of crops published downstream for one sampled frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropBatchMessage {
    pub video_id: VideoId,
    pub crops: Vec<CropRecord>,
}

impl CropBatchMessage {
    /// Frame index shared by every crop of the batch, if any.
    pub fn frame_idx(&self) -> Option<u64> {
        self.crops.first().map(|c| c.frame_idx)
    }
}

/// Storage key for a crop: `crops/{video_id}/{track_id}_{frame_idx}.jpg`.
pub fn crop_storage_key(video_id: &VideoId, track_id: TrackId, frame_idx: u64) -> String {
    format!("crops/{}/{}_{}.jpg", video_id, track_id, frame_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_storage_key() {
        let key = crop_storage_key(&VideoId::parse("game1").unwrap(), TrackId(2), 30);
        assert_eq!(key, "crops/game1/2_30.jpg");
    }

    #[test]
    fn test_batch_wire_format() {
        let video_id = VideoId::parse("game1").unwrap();
        let batch = CropBatchMessage {
            video_id: video_id.clone(),
            crops: vec![CropRecord {
                storage_path: crop_storage_key(&video_id, TrackId(1), 0),
                track_id: TrackId(1),
                frame_idx: 0,
            }],
        };

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "video_id": "game1",
                "crops": [{"gcs_path": "crops/game1/1_0.jpg", "track_id": 1, "frame_idx": 0}]
            })
        );
        assert_eq!(batch.frame_idx(), Some(0));
    }

    #[test]
    fn test_request_roundtrip_from_json() {
        let req: TrackVideoRequest =
            serde_json::from_str(r#"{"video_path": "source/game1.mp4", "video_id": "game1"}"#)
                .unwrap();
        assert_eq!(req.video_path, "source/game1.mp4");
        assert_eq!(req.video_id.as_str(), "game1");
    }
}
