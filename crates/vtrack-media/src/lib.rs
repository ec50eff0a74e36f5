//! Frame decoding and crop extraction.
//!
//! This crate provides:
//! - Video probing via FFprobe
//! - Sequential RGB frame decoding via an FFmpeg `rawvideo` pipe
//! - The `FrameSource` abstraction and an in-memory source
//! - Crop extraction and JPEG encoding

pub mod crop;
pub mod error;
pub mod frames;
pub mod probe;

pub use crop::{crop_region, encode_jpeg, DEFAULT_JPEG_QUALITY};
pub use error::{MediaError, MediaResult};
pub use frames::{FfmpegFrameSource, FrameSource, MemoryFrameSource};
pub use probe::{probe_video, VideoInfo};

/// Decoded frame pixels, packed RGB8.
pub type RgbImage = image::RgbImage;
