//! Shared data models for the video tracking service.
//!
//! This crate provides Serde-serializable types for:
//! - Video and track identities
//! - Pixel-space bounding boxes
//! - The inbound tracking trigger and the outbound crop batch message
//! - The crop storage key convention

pub mod geometry;
pub mod message;
pub mod track;
pub mod video;

// Re-export common types
pub use geometry::{BoundingBox, PixelRect};
pub use message::{crop_storage_key, CropBatchMessage, CropRecord, TrackVideoRequest};
pub use track::TrackId;
pub use video::{InvalidVideoId, VideoId};
