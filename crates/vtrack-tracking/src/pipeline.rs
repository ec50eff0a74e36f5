//! Frame pipeline for one video.

use tracing::{debug, info};
use vtrack_media::FrameSource;

use crate::bootstrap::run_bootstrap;
use crate::detection::{Frame, TrackedFrame};
use crate::error::{TrackingError, TrackingResult};
use crate::registry::ModelRegistry;
use crate::session::TrackingSession;

/// Drives a frame source through bootstrap and propagation.
///
/// Frame 0 is bootstrapped and prompted; every later frame is propagated.
/// Emitted indices are `0, 1, 2, ...` with no gaps. After any error the
/// pipeline refuses further work.
pub struct VideoPipeline<'r, S> {
    registry: &'r ModelRegistry,
    source: S,
    session: Option<TrackingSession>,
    next_index: u64,
    exhausted: bool,
    failed: bool,
}

impl<'r, S: FrameSource> VideoPipeline<'r, S> {
    pub fn new(registry: &'r ModelRegistry, source: S) -> Self {
        Self {
            registry,
            source,
            session: None,
            next_index: 0,
            exhausted: false,
            failed: false,
        }
    }

    /// Produce the next tracked frame, or `None` once the source is drained.
    pub async fn next(&mut self) -> TrackingResult<Option<TrackedFrame>> {
        if self.failed {
            return Err(TrackingError::PipelineFailed);
        }
        if self.exhausted {
            return Ok(None);
        }

        match self.step().await {
            Ok(frame) => Ok(frame),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    async fn step(&mut self) -> TrackingResult<Option<TrackedFrame>> {
        let Some(image) = self.source.next_frame().await? else {
            self.exhausted = true;
            if self.next_index == 0 {
                info!("Frame source empty, nothing to track");
            } else {
                debug!(frames = self.next_index, "Frame source exhausted");
            }
            return Ok(None);
        };

        let frame = Frame::new(self.next_index, image);

        let detections = match self.session.as_mut() {
            None => {
                let detections = run_bootstrap(
                    self.registry.detector(),
                    &frame,
                    self.registry.bootstrap_config(),
                )
                .await?;

                let mut session = TrackingSession::open(self.registry).await?;
                session.prompt(&frame, &detections).await?;
                self.session = Some(session);
                detections
            }
            Some(session) => session.propagate(&frame).await?,
        };

        self.next_index += 1;
        metrics::counter!("vtrack_frames_processed_total").increment(1);

        let tracked = TrackedFrame { frame, detections };
        debug!(frame = tracked.index(), tracks = ?tracked.track_ids(), "Frame tracked");
        Ok(Some(tracked))
    }

    /// Number of frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.next_index
    }

    pub fn session(&self) -> Option<&TrackingSession> {
        self.session.as_ref()
    }

    /// Release the tracker context, if one was opened.
    pub async fn close(self) -> TrackingResult<()> {
        match self.session {
            Some(session) => {
                debug!(
                    tracks = session.prompted_ids().len(),
                    propagated = session.frames_propagated(),
                    "Closing tracker context"
                );
                session.close().await
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::detector::RawDetection;
    use crate::fakes::{logits_empty, logits_rect, FakeDetector, ScriptedCall, ScriptedSegmenter};
    use crate::segmenter::MaskField;
    use crate::session::SessionState;
    use vtrack_media::{MemoryFrameSource, RgbImage};
    use vtrack_models::{BoundingBox, TrackId};

    fn frames(count: usize, width: u32, height: u32) -> MemoryFrameSource {
        MemoryFrameSource::new((0..count).map(|_| RgbImage::new(width, height)))
    }

    fn player(x1: f64, y1: f64, x2: f64, y2: f64) -> RawDetection {
        RawDetection::new(3, BoundingBox::new(x1, y1, x2, y2), 0.9)
    }

    fn registry(detector: Arc<FakeDetector>, segmenter: &ScriptedSegmenter) -> ModelRegistry {
        ModelRegistry::new(detector, Arc::new(segmenter.clone()))
    }

    async fn drain<S: FrameSource>(
        pipeline: &mut VideoPipeline<'_, S>,
    ) -> TrackingResult<Vec<TrackedFrame>> {
        let mut out = Vec::new();
        while let Some(frame) = pipeline.next().await? {
            out.push(frame);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_empty_source_emits_nothing_and_skips_models() {
        let detector = Arc::new(FakeDetector::new(vec![player(1.0, 1.0, 5.0, 5.0)]));
        let segmenter = ScriptedSegmenter::new(vec![]);
        let registry = registry(detector.clone(), &segmenter);

        let mut pipeline = VideoPipeline::new(&registry, frames(0, 10, 10));
        let out = drain(&mut pipeline).await.unwrap();

        assert!(out.is_empty());
        assert!(detector.calls().is_empty());
        assert_eq!(segmenter.contexts_opened(), 0);
        assert!(pipeline.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_indices_are_contiguous_from_zero() {
        let detector = Arc::new(FakeDetector::new(vec![player(10.0, 10.0, 20.0, 20.0)]));
        let script = (0..4)
            .map(|_| vec![MaskField::new(TrackId(1), logits_rect(40, 40, (10, 10, 20, 20)))])
            .collect();
        let segmenter = ScriptedSegmenter::new(script);
        let registry = registry(detector.clone(), &segmenter);

        let mut pipeline = VideoPipeline::new(&registry, frames(5, 40, 40));
        let out = drain(&mut pipeline).await.unwrap();

        let indices: Vec<u64> = out.iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(pipeline.frames_emitted(), 5);
        assert_eq!(detector.calls().len(), 1);
        assert_eq!(segmenter.contexts_opened(), 1);

        pipeline.close().await.unwrap();
        assert_eq!(segmenter.calls().last(), Some(&ScriptedCall::Close));
    }

    #[tokio::test]
    async fn test_three_frame_video_keeps_identity_subset() {
        let detector = Arc::new(FakeDetector::new(vec![
            player(10.0, 10.0, 30.0, 40.0),
            player(50.0, 10.0, 70.0, 40.0),
        ]));
        let segmenter = ScriptedSegmenter::new(vec![
            vec![
                MaskField::new(TrackId(1), logits_rect(100, 100, (12, 12, 30, 40))),
                // Track 2 has left the frame.
                MaskField::new(TrackId(2), logits_empty(100, 100)),
            ],
            vec![MaskField::new(TrackId(1), logits_rect(100, 100, (14, 12, 32, 40)))],
        ]);
        let registry = registry(detector, &segmenter);

        let mut pipeline = VideoPipeline::new(&registry, frames(3, 100, 100));
        let out = drain(&mut pipeline).await.unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].track_ids(), vec![TrackId(1), TrackId(2)]);
        assert_eq!(out[1].track_ids(), vec![TrackId(1)]);
        assert_eq!(out[2].track_ids(), vec![TrackId(1)]);
        assert_eq!(
            out[1].detections[0].bbox,
            BoundingBox::new(12.0, 12.0, 30.0, 40.0)
        );

        let initial = out[0].track_ids();
        for frame in &out[1..] {
            assert!(frame.track_ids().iter().all(|id| initial.contains(id)));
        }
    }

    #[tokio::test]
    async fn test_empty_bootstrap_fails_on_second_frame() {
        let detector = Arc::new(FakeDetector::new(vec![]));
        let segmenter = ScriptedSegmenter::new(vec![]);
        let registry = registry(detector, &segmenter);

        let mut pipeline = VideoPipeline::new(&registry, frames(3, 10, 10));

        let first = pipeline.next().await.unwrap().unwrap();
        assert_eq!(first.index(), 0);
        assert!(first.detections.is_empty());
        assert_eq!(
            pipeline.session().map(|s| s.state()),
            Some(SessionState::Uninitialized)
        );

        let err = pipeline.next().await.unwrap_err();
        assert!(matches!(err, TrackingError::Uninitialized));
        assert!(err.is_sequencing_fault());

        let err = pipeline.next().await.unwrap_err();
        assert!(matches!(err, TrackingError::PipelineFailed));
    }

    #[tokio::test]
    async fn test_empty_bootstrap_on_single_frame_video_succeeds() {
        let detector = Arc::new(FakeDetector::new(vec![]));
        let segmenter = ScriptedSegmenter::new(vec![]);
        let registry = registry(detector, &segmenter);

        let mut pipeline = VideoPipeline::new(&registry, frames(1, 10, 10));
        let out = drain(&mut pipeline).await.unwrap();

        assert_eq!(out.len(), 1);
        assert!(out[0].detections.is_empty());
    }

    #[tokio::test]
    async fn test_detector_failure_fails_pipeline() {
        let detector = Arc::new(FakeDetector::failing("boom"));
        let segmenter = ScriptedSegmenter::new(vec![]);
        let registry = registry(detector, &segmenter);

        let mut pipeline = VideoPipeline::new(&registry, frames(2, 10, 10));

        let err = pipeline.next().await.unwrap_err();
        assert!(err.is_model_failure());
        assert!(matches!(
            pipeline.next().await.unwrap_err(),
            TrackingError::PipelineFailed
        ));
        assert_eq!(segmenter.contexts_opened(), 0);
    }

    #[tokio::test]
    async fn test_each_pipeline_opens_its_own_context() {
        let detector = Arc::new(FakeDetector::new(vec![player(1.0, 1.0, 4.0, 4.0)]));
        let segmenter = ScriptedSegmenter::new(vec![]);
        let registry = registry(detector, &segmenter);

        let mut a = VideoPipeline::new(&registry, frames(1, 10, 10));
        let mut b = VideoPipeline::new(&registry, frames(1, 10, 10));
        drain(&mut a).await.unwrap();
        drain(&mut b).await.unwrap();

        assert_eq!(segmenter.contexts_opened(), 2);
    }
}
