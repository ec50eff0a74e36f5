//! One-shot detection on the first frame of a video.

use tracing::{debug, info};
use vtrack_models::TrackId;

use crate::config::{BootstrapConfig, IdentityOrder};
use crate::detection::{Detection, Frame};
use crate::detector::{Detector, RawDetection};
use crate::error::TrackingResult;

/// Detect subjects on `frame` and assign their track identities.
///
/// Keeps only allow-listed classes and numbers the survivors 1, 2, 3, ...
/// in the configured order. An empty result is not an error.
pub async fn run_bootstrap(
    detector: &dyn Detector,
    frame: &Frame,
    config: &BootstrapConfig,
) -> TrackingResult<Vec<Detection>> {
    let start = std::time::Instant::now();

    let raw = detector
        .infer(&frame.image, config.confidence, config.iou_threshold)
        .await?;
    let raw_count = raw.len();

    let mut kept: Vec<RawDetection> = raw
        .into_iter()
        .filter(|d| config.allows(d.class_id))
        .collect();

    if config.identity_order == IdentityOrder::LeftToRight {
        kept.sort_by(|a, b| {
            a.bbox
                .x1
                .total_cmp(&b.bbox.x1)
                .then(a.bbox.y1.total_cmp(&b.bbox.y1))
        });
    }

    let detections: Vec<Detection> = kept
        .into_iter()
        .zip(TrackId::FIRST.get()..)
        .map(|(raw, id)| Detection {
            track_id: TrackId(id),
            bbox: raw.bbox,
            class_id: Some(raw.class_id),
            confidence: Some(raw.confidence),
            mask: None,
        })
        .collect();

    metrics::histogram!("vtrack_bootstrap_duration_seconds").record(start.elapsed().as_secs_f64());
    metrics::histogram!("vtrack_bootstrap_tracks").record(detections.len() as f64);

    debug!(
        detector = detector.name(),
        raw = raw_count,
        kept = detections.len(),
        "Bootstrap detector returned"
    );
    info!(
        frame = frame.index,
        tracks = detections.len(),
        order = %config.identity_order,
        "Bootstrap assigned track identities"
    );

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{blank_frame, FakeDetector};
    use crate::error::TrackingError;
    use vtrack_models::BoundingBox;

    fn raw(class_id: u32, x1: f64, y1: f64) -> RawDetection {
        RawDetection::new(class_id, BoundingBox::new(x1, y1, x1 + 10.0, y1 + 20.0), 0.8)
    }

    #[tokio::test]
    async fn test_assigns_consecutive_ids_in_detector_order() {
        let detector = FakeDetector::new(vec![raw(3, 50.0, 0.0), raw(1, 0.0, 0.0), raw(5, 10.0, 0.0)]);
        let frame = blank_frame(0, 64, 64);

        let detections = run_bootstrap(&detector, &frame, &BootstrapConfig::default())
            .await
            .unwrap();

        // Class 1 is not allow-listed and does not consume an identity.
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].track_id, TrackId(1));
        assert_eq!(detections[0].bbox.x1, 50.0);
        assert_eq!(detections[1].track_id, TrackId(2));
        assert_eq!(detections[1].bbox.x1, 10.0);
        assert!(detections.iter().all(|d| d.mask.is_none()));
        assert_eq!(detections[0].class_id, Some(3));
    }

    #[tokio::test]
    async fn test_passes_configured_thresholds() {
        let detector = FakeDetector::new(vec![]);
        let frame = blank_frame(0, 8, 8);
        let config = BootstrapConfig {
            confidence: 0.25,
            iou_threshold: 0.5,
            ..BootstrapConfig::default()
        };

        run_bootstrap(&detector, &frame, &config).await.unwrap();

        assert_eq!(detector.calls(), vec![(0.25, 0.5)]);
    }

    #[tokio::test]
    async fn test_no_surviving_detections_is_empty_not_error() {
        let detector = FakeDetector::new(vec![raw(0, 1.0, 1.0), raw(9, 2.0, 2.0)]);
        let frame = blank_frame(0, 8, 8);

        let detections = run_bootstrap(&detector, &frame, &BootstrapConfig::default())
            .await
            .unwrap();

        assert!(detections.is_empty());
    }

    #[tokio::test]
    async fn test_left_to_right_order_sorts_by_position() {
        let detector = FakeDetector::new(vec![
            raw(3, 40.0, 5.0),
            raw(4, 10.0, 30.0),
            raw(4, 10.0, 2.0),
        ]);
        let frame = blank_frame(0, 64, 64);
        let config = BootstrapConfig {
            identity_order: IdentityOrder::LeftToRight,
            ..BootstrapConfig::default()
        };

        let detections = run_bootstrap(&detector, &frame, &config).await.unwrap();

        let positions: Vec<(u32, f64, f64)> = detections
            .iter()
            .map(|d| (d.track_id.get(), d.bbox.x1, d.bbox.y1))
            .collect();
        assert_eq!(
            positions,
            vec![(1, 10.0, 2.0), (2, 10.0, 30.0), (3, 40.0, 5.0)]
        );
    }

    #[tokio::test]
    async fn test_detector_failure_propagates() {
        let detector = FakeDetector::failing("model offline");
        let frame = blank_frame(0, 8, 8);

        let err = run_bootstrap(&detector, &frame, &BootstrapConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TrackingError::Inference(_)));
        assert!(err.is_model_failure());
    }
}
