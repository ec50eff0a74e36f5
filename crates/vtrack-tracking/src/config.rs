//! Detection and tracking configuration.

use std::fmt;
use std::str::FromStr;

/// Default detector confidence threshold.
pub const DEFAULT_CONFIDENCE: f32 = 0.4;
/// Default detector NMS overlap threshold.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.9;
/// Player, possession, jump-shot, layup/dunk and shot-block classes.
pub const DEFAULT_CLASS_IDS: [u32; 5] = [3, 4, 5, 6, 7];
/// Default edge-proximity distance, relative to frame size.
pub const DEFAULT_EDGE_DISTANCE: f64 = 0.03;

/// How bootstrap detections are ordered before identities are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityOrder {
    /// Keep the order the detector returned.
    #[default]
    Detector,
    /// Sort by left edge, then top edge, for run-to-run stable identities.
    LeftToRight,
}

impl FromStr for IdentityOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detector" => Ok(IdentityOrder::Detector),
            "left_to_right" | "positional" => Ok(IdentityOrder::LeftToRight),
            other => Err(format!("unknown identity order: {}", other)),
        }
    }
}

impl fmt::Display for IdentityOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityOrder::Detector => write!(f, "detector"),
            IdentityOrder::LeftToRight => write!(f, "left_to_right"),
        }
    }
}

/// Detection bootstrap configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    /// Detector confidence threshold
    pub confidence: f32,
    /// Detector NMS overlap threshold
    pub iou_threshold: f32,
    /// Classes kept after detection
    pub class_ids: Vec<u32>,
    /// Ordering used for identity assignment
    pub identity_order: IdentityOrder,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            class_ids: DEFAULT_CLASS_IDS.to_vec(),
            identity_order: IdentityOrder::default(),
        }
    }
}

impl BootstrapConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            confidence: std::env::var("DETECTION_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONFIDENCE),
            iou_threshold: std::env::var("DETECTION_IOU")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_IOU_THRESHOLD),
            class_ids: std::env::var("DETECTION_CLASS_IDS")
                .ok()
                .and_then(|s| parse_class_ids(&s))
                .filter(|ids| !ids.is_empty())
                .unwrap_or_else(|| DEFAULT_CLASS_IDS.to_vec()),
            identity_order: std::env::var("TRACK_ID_ORDER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    pub fn allows(&self, class_id: u32) -> bool {
        self.class_ids.contains(&class_id)
    }
}

/// Mask post-processing configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentFilterConfig {
    /// Logit threshold for binarization
    pub mask_threshold: f32,
    /// Edge-proximity distance relative to frame size; 0 disables the filter
    pub edge_distance: f64,
}

impl Default for SegmentFilterConfig {
    fn default() -> Self {
        Self {
            mask_threshold: 0.0,
            edge_distance: DEFAULT_EDGE_DISTANCE,
        }
    }
}

impl SegmentFilterConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            mask_threshold: 0.0,
            edge_distance: std::env::var("SEGMENT_EDGE_DISTANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|d: &f64| d.is_finite() && *d >= 0.0)
                .unwrap_or(DEFAULT_EDGE_DISTANCE),
        }
    }
}

/// Parse a comma-separated class list; `None` if any entry is not a number.
fn parse_class_ids(s: &str) -> Option<Vec<u32>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse().ok())
        .collect()
}
