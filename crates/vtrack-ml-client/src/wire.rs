//! Request and response bodies of the inference service.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use vtrack_media::{encode_jpeg, RgbImage};

use crate::error::{MlClientError, MlClientResult};

/// JPEG quality for frames sent to the service.
const FRAME_JPEG_QUALITY: u8 = 95;

/// Base64 JPEG of a frame.
pub(crate) fn encode_frame(image: &RgbImage) -> MlClientResult<String> {
    Ok(STANDARD.encode(encode_jpeg(image, FRAME_JPEG_QUALITY)?))
}

#[derive(Debug, Serialize)]
pub(crate) struct DetectRequest<'a> {
    pub image: String,
    pub confidence: f32,
    pub iou_threshold: f32,
    pub model_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetectResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Prediction {
    pub class_id: u32,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct FrameRequest {
    pub image: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PromptRequest {
    pub frame_idx: u64,
    pub obj_id: u32,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f64; 4],
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackResponse {
    #[serde(default)]
    pub objects: Vec<TrackedObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackedObject {
    pub obj_id: u32,
    pub height: usize,
    pub width: usize,
    /// Base64 of `height * width` little-endian f32 logits, row-major.
    pub logits: String,
}

impl TrackedObject {
    pub fn decode_logits(&self) -> MlClientResult<Array2<f32>> {
        let expected = self
            .height
            .checked_mul(self.width)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                MlClientError::invalid_response(format!(
                    "logits for {}: {}x{} mask is too large",
                    self.obj_id, self.height, self.width
                ))
            })?;

        let bytes = STANDARD.decode(&self.logits).map_err(|e| {
            MlClientError::invalid_response(format!("logits for {}: {}", self.obj_id, e))
        })?;

        if bytes.len() != expected {
            return Err(MlClientError::invalid_response(format!(
                "logits for {}: expected {} bytes, got {}",
                self.obj_id,
                expected,
                bytes.len()
            )));
        }

        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Array2::from_shape_vec((self.height, self.width), values)
            .map_err(|e| MlClientError::invalid_response(e.to_string()))
    }
}

/// Base64 of little-endian f32 values; the inverse of `decode_logits`.
#[cfg(test)]
pub(crate) fn encode_logits(values: &[f32]) -> String {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}
