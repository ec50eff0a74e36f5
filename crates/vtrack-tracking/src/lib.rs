//! Multi-subject video tracking core.
//!
//! This crate provides:
//! - Collaborator traits for the one-shot detector and the stateful
//!   segmentation tracker
//! - An immutable `ModelRegistry` shared by every video in the process
//! - Detection bootstrap on frame 0
//! - The per-video `TrackingSession` state machine
//! - Mask operations (binarize, edge-proximity filter, mask to box)
//! - The `VideoPipeline` orchestrator yielding `(index, frame, detections)`

pub mod bootstrap;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod mask;
pub mod pipeline;
pub mod registry;
pub mod segmenter;
pub mod session;

#[cfg(any(test, feature = "test-util"))]
pub mod fakes;

pub use bootstrap::run_bootstrap;
pub use config::{BootstrapConfig, IdentityOrder, SegmentFilterConfig};
pub use detection::{Detection, Frame, TrackedFrame};
pub use detector::{Detector, RawDetection};
pub use error::{TrackingError, TrackingResult};
pub use mask::Mask;
pub use pipeline::VideoPipeline;
pub use registry::ModelRegistry;
pub use segmenter::{MaskField, SegmentationModel, TrackerContext};
pub use session::{SessionState, TrackingSession};
