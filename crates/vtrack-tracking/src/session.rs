//! Per-video tracking session.
//!
//! A session owns one private `TrackerContext` and moves through exactly one
//! transition, `Uninitialized -> Prompted`. Sessions are never shared
//! between videos and never reused.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use tracing::{debug, warn};
use vtrack_models::TrackId;

use crate::config::SegmentFilterConfig;
use crate::detection::{Detection, Frame};
use crate::error::{TrackingError, TrackingResult};
use crate::mask::Mask;
use crate::registry::ModelRegistry;
use crate::segmenter::TrackerContext;

/// Prompt frame for every bootstrap region.
const PROMPT_FRAME_INDEX: u64 = 0;

/// Lifecycle state of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Prompted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Prompted => write!(f, "prompted"),
        }
    }
}

/// Bootstrap-then-propagate state machine for one video.
pub struct TrackingSession {
    context: Box<dyn TrackerContext>,
    state: SessionState,
    prompted: BTreeSet<TrackId>,
    filter: SegmentFilterConfig,
    propagated: u64,
}

impl TrackingSession {
    /// Open a session with a fresh tracker context from the registry.
    pub async fn open(registry: &ModelRegistry) -> TrackingResult<Self> {
        let context = registry.segmenter().open_context().await?;
        Ok(Self::with_context(context, registry.segment_filter()))
    }

    /// Wrap an already opened tracker context.
    pub fn with_context(context: Box<dyn TrackerContext>, filter: SegmentFilterConfig) -> Self {
        Self {
            context,
            state: SessionState::Uninitialized,
            prompted: BTreeSet::new(),
            filter,
            propagated: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identities registered at bootstrap.
    pub fn prompted_ids(&self) -> &BTreeSet<TrackId> {
        &self.prompted
    }

    /// Register one region prompt per bootstrap detection, anchored to
    /// frame 0, then transition to `Prompted`.
    ///
    /// An empty detection set leaves the session `Uninitialized` and does
    /// not touch the tracker.
    pub async fn prompt(&mut self, frame: &Frame, detections: &[Detection]) -> TrackingResult<()> {
        if self.state != SessionState::Uninitialized {
            return Err(TrackingError::AlreadyPrompted);
        }

        if detections.is_empty() {
            warn!(
                frame = frame.index,
                "No bootstrap detections, tracker left uninitialized"
            );
            return Ok(());
        }

        self.context.load_first_frame(&frame.image).await?;

        for detection in detections {
            self.context
                .add_prompt(PROMPT_FRAME_INDEX, detection.track_id, detection.bbox)
                .await?;
            self.prompted.insert(detection.track_id);
        }

        self.state = SessionState::Prompted;
        debug!(tracks = self.prompted.len(), "Tracker prompted");
        Ok(())
    }

    /// Advance the tracker by one frame and derive per-track masks and boxes.
    ///
    /// Output follows the tracker's order. Identities with an empty mask
    /// are omitted, as are identities that were never prompted.
    pub async fn propagate(&mut self, frame: &Frame) -> TrackingResult<Vec<Detection>> {
        if self.state != SessionState::Prompted {
            return Err(TrackingError::Uninitialized);
        }

        let start = Instant::now();
        let fields = self.context.advance(&frame.image).await?;
        let expected = (frame.height() as usize, frame.width() as usize);

        let mut detections = Vec::with_capacity(fields.len());
        for field in fields {
            let got = field.logits.dim();
            if got != expected {
                return Err(TrackingError::InvalidMask {
                    track_id: field.track_id.get(),
                    expected,
                    got,
                });
            }

            if !self.prompted.contains(&field.track_id) {
                warn!(
                    frame = frame.index,
                    track_id = %field.track_id,
                    "Tracker reported an identity that was never prompted, dropping"
                );
                metrics::counter!("vtrack_unknown_track_ids_total").increment(1);
                continue;
            }

            let raw = Mask::from_logits(&field.logits, self.filter.mask_threshold);
            let mask = raw.filter_edge_segments(self.filter.edge_distance);
            let (raw_area, kept_area) = (raw.area(), mask.area());
            if kept_area < raw_area {
                debug!(
                    frame = frame.index,
                    track_id = %field.track_id,
                    dropped = raw_area - kept_area,
                    "Dropped border fragments"
                );
            }

            let Some(bbox) = mask.bounding_box() else {
                debug!(
                    frame = frame.index,
                    track_id = %field.track_id,
                    "Mask empty"
                );
                continue;
            };

            detections.push(Detection {
                track_id: field.track_id,
                bbox,
                class_id: None,
                confidence: None,
                mask: Some(mask),
            });
        }

        self.propagated += 1;
        metrics::histogram!("vtrack_propagate_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        Ok(detections)
    }

    /// Number of successful `propagate` calls.
    pub fn frames_propagated(&self) -> u64 {
        self.propagated
    }

    /// Release the tracker context.
    pub async fn close(mut self) -> TrackingResult<()> {
        self.context.close().await
    }
}

impl fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingSession")
            .field("state", &self.state)
            .field("prompted", &self.prompted)
            .field("propagated", &self.propagated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{blank_frame, logits_empty, logits_rect, ScriptedCall, ScriptedSegmenter};
    use ndarray::s;
    use crate::segmenter::{MaskField, SegmentationModel};
    use vtrack_models::BoundingBox;

    fn bootstrap_detection(id: u32, bbox: BoundingBox) -> Detection {
        Detection {
            track_id: TrackId(id),
            bbox,
            class_id: Some(3),
            confidence: Some(0.9),
            mask: None,
        }
    }

    async fn session_for(segmenter: &ScriptedSegmenter) -> TrackingSession {
        let context = segmenter.open_context().await.unwrap();
        TrackingSession::with_context(context, SegmentFilterConfig::default())
    }

    #[tokio::test]
    async fn test_propagate_before_prompt_is_sequencing_fault() {
        let segmenter = ScriptedSegmenter::new(vec![]);
        let mut session = session_for(&segmenter).await;

        let err = session.propagate(&blank_frame(1, 10, 10)).await.unwrap_err();

        assert!(matches!(err, TrackingError::Uninitialized));
        assert!(err.is_sequencing_fault());
        assert!(segmenter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_registers_every_detection_at_frame_zero() {
        let segmenter = ScriptedSegmenter::new(vec![]);
        let mut session = session_for(&segmenter).await;
        let a = BoundingBox::new(1.0, 1.0, 4.0, 4.0);
        let b = BoundingBox::new(5.0, 5.0, 8.0, 8.0);

        session
            .prompt(
                &blank_frame(0, 10, 10),
                &[bootstrap_detection(1, a), bootstrap_detection(2, b)],
            )
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Prompted);
        assert_eq!(
            segmenter.calls(),
            vec![
                ScriptedCall::LoadFirstFrame,
                ScriptedCall::AddPrompt(0, TrackId(1), a),
                ScriptedCall::AddPrompt(0, TrackId(2), b),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_prompt_keeps_session_uninitialized() {
        let segmenter = ScriptedSegmenter::new(vec![vec![]]);
        let mut session = session_for(&segmenter).await;

        session.prompt(&blank_frame(0, 10, 10), &[]).await.unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(segmenter.calls().is_empty());

        // The next frame surfaces the missing bootstrap as a sequencing fault.
        let err = session.propagate(&blank_frame(1, 10, 10)).await.unwrap_err();
        assert!(matches!(err, TrackingError::Uninitialized));
    }

    #[tokio::test]
    async fn test_second_prompt_is_rejected() {
        let segmenter = ScriptedSegmenter::new(vec![]);
        let mut session = session_for(&segmenter).await;
        let detections = [bootstrap_detection(1, BoundingBox::new(0.0, 0.0, 2.0, 2.0))];

        session.prompt(&blank_frame(0, 10, 10), &detections).await.unwrap();
        let err = session
            .prompt(&blank_frame(0, 10, 10), &detections)
            .await
            .unwrap_err();

        assert!(matches!(err, TrackingError::AlreadyPrompted));
    }

    #[tokio::test]
    async fn test_propagate_derives_tight_boxes_from_masks() {
        let segmenter = ScriptedSegmenter::new(vec![vec![
            MaskField::new(TrackId(2), logits_rect(100, 100, (40, 20, 59, 69))),
            MaskField::new(TrackId(1), logits_rect(100, 100, (10, 30, 25, 50))),
        ]]);
        let mut session = session_for(&segmenter).await;
        session
            .prompt(
                &blank_frame(0, 100, 100),
                &[
                    bootstrap_detection(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
                    bootstrap_detection(2, BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
                ],
            )
            .await
            .unwrap();

        let detections = session.propagate(&blank_frame(1, 100, 100)).await.unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].track_id, TrackId(2));
        assert_eq!(detections[0].bbox, BoundingBox::new(40.0, 20.0, 59.0, 69.0));
        assert_eq!(detections[1].track_id, TrackId(1));
        assert_eq!(detections[1].bbox, BoundingBox::new(10.0, 30.0, 25.0, 50.0));
        assert!(detections.iter().all(|d| d.mask.is_some() && d.class_id.is_none()));
        assert_eq!(session.frames_propagated(), 1);
    }

    #[tokio::test]
    async fn test_propagate_filters_border_fragments_and_omits_empty_masks() {
        // Track 1 keeps a stray sliver on the right border next to its body.
        let mut track1 = logits_rect(100, 100, (30, 30, 60, 60));
        track1.slice_mut(s![10..=40, 98..=99]).fill(4.0);

        let segmenter = ScriptedSegmenter::new(vec![vec![
            MaskField::new(TrackId(1), track1),
            MaskField::new(TrackId(2), logits_empty(100, 100)),
        ]]);
        let mut session = session_for(&segmenter).await;
        session
            .prompt(
                &blank_frame(0, 100, 100),
                &[
                    bootstrap_detection(1, BoundingBox::new(30.0, 30.0, 60.0, 60.0)),
                    bootstrap_detection(2, BoundingBox::new(90.0, 10.0, 99.0, 40.0)),
                ],
            )
            .await
            .unwrap();

        let detections = session.propagate(&blank_frame(1, 100, 100)).await.unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].track_id, TrackId(1));
        assert_eq!(detections[0].bbox, BoundingBox::new(30.0, 30.0, 60.0, 60.0));
    }

    #[tokio::test]
    async fn test_propagate_keeps_subject_standing_at_border() {
        let segmenter = ScriptedSegmenter::new(vec![vec![MaskField::new(
            TrackId(1),
            logits_rect(100, 100, (0, 0, 1, 99)),
        )]]);
        let mut session = session_for(&segmenter).await;
        session
            .prompt(
                &blank_frame(0, 100, 100),
                &[bootstrap_detection(1, BoundingBox::new(0.0, 0.0, 10.0, 99.0))],
            )
            .await
            .unwrap();

        let detections = session.propagate(&blank_frame(1, 100, 100)).await.unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, BoundingBox::new(0.0, 0.0, 1.0, 99.0));
    }

    #[tokio::test]
    async fn test_propagate_never_introduces_new_identity() {
        let segmenter = ScriptedSegmenter::new(vec![vec![
            MaskField::new(TrackId(1), logits_rect(50, 50, (10, 10, 20, 20))),
            MaskField::new(TrackId(7), logits_rect(50, 50, (25, 25, 35, 35))),
        ]]);
        let mut session = session_for(&segmenter).await;
        session
            .prompt(
                &blank_frame(0, 50, 50),
                &[bootstrap_detection(1, BoundingBox::new(10.0, 10.0, 20.0, 20.0))],
            )
            .await
            .unwrap();

        let detections = session.propagate(&blank_frame(1, 50, 50)).await.unwrap();

        let ids: Vec<TrackId> = detections.iter().map(|d| d.track_id).collect();
        assert_eq!(ids, vec![TrackId(1)]);
        assert!(ids.iter().all(|id| session.prompted_ids().contains(id)));
    }

    #[tokio::test]
    async fn test_mask_shape_mismatch_is_model_failure() {
        let segmenter = ScriptedSegmenter::new(vec![vec![MaskField::new(
            TrackId(1),
            logits_rect(20, 30, (1, 1, 5, 5)),
        )]]);
        let mut session = session_for(&segmenter).await;
        session
            .prompt(
                &blank_frame(0, 40, 40),
                &[bootstrap_detection(1, BoundingBox::new(1.0, 1.0, 5.0, 5.0))],
            )
            .await
            .unwrap();

        let err = session.propagate(&blank_frame(1, 40, 40)).await.unwrap_err();

        assert!(matches!(
            err,
            TrackingError::InvalidMask {
                track_id: 1,
                expected: (40, 40),
                got: (20, 30)
            }
        ));
        assert!(err.is_model_failure());
    }

    #[tokio::test]
    async fn test_tracker_failure_propagates() {
        let segmenter = ScriptedSegmenter::new(vec![]);
        let mut session = session_for(&segmenter).await;
        session
            .prompt(
                &blank_frame(0, 10, 10),
                &[bootstrap_detection(1, BoundingBox::new(1.0, 1.0, 5.0, 5.0))],
            )
            .await
            .unwrap();

        // Script exhausted: the fake tracker reports an inference failure.
        let err = session.propagate(&blank_frame(1, 10, 10)).await.unwrap_err();
        assert!(err.is_model_failure());
    }
}
