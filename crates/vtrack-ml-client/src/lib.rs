//! Client for the detection and segmentation inference service.
//!
//! Implements the `vtrack-tracking` collaborator traits over HTTP so that
//! model weights stay in a dedicated inference process.

mod client;
pub mod config;
pub mod detector;
pub mod error;
pub mod segmenter;
mod wire;

pub use client::MlClient;
pub use config::{MlClientConfig, DEFAULT_DETECTION_MODEL_ID};
pub use detector::HttpDetector;
pub use error::{MlClientError, MlClientResult};
pub use segmenter::{HttpSegmentationModel, HttpTrackerContext};
