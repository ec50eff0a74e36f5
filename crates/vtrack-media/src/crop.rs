//! Crop extraction and encoding.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ColorType};
use vtrack_models::BoundingBox;

use crate::error::{MediaError, MediaResult};
use crate::RgbImage;

/// JPEG quality used for subject crops.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Copy the pixels inside `bbox` out of `frame`.
///
/// The box is clipped to the frame; `None` only for an empty frame.
pub fn crop_region(frame: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let rect = bbox.to_pixel_rect(frame.width(), frame.height())?;
    Some(imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// Encode an RGB image as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> MediaResult<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .map_err(|e| MediaError::Encode(e.to_string()))?;
    Ok(out)
}
