//! Scripted detector and tracker fakes for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::Array2;
use vtrack_media::RgbImage;
use vtrack_models::{BoundingBox, TrackId};

use crate::detection::Frame;
use crate::detector::{Detector, RawDetection};
use crate::error::{TrackingError, TrackingResult};
use crate::segmenter::{MaskField, SegmentationModel, TrackerContext};

/// Black frame of the given size.
pub fn blank_frame(index: u64, width: u32, height: u32) -> Frame {
    Frame::new(index, RgbImage::new(width, height))
}

/// Logit field that is positive inside the inclusive rectangle
/// `(x1, y1, x2, y2)` and negative elsewhere.
pub fn logits_rect(
    height: usize,
    width: usize,
    (x1, y1, x2, y2): (usize, usize, usize, usize),
) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(y, x)| {
        if (x1..=x2).contains(&x) && (y1..=y2).contains(&y) {
            4.0
        } else {
            -4.0
        }
    })
}

/// Logit field with no pixel above the mask threshold.
pub fn logits_empty(height: usize, width: usize) -> Array2<f32> {
    Array2::from_elem((height, width), -4.0)
}

/// Detector returning a fixed result.
pub struct FakeDetector {
    result: Result<Vec<RawDetection>, String>,
    calls: Mutex<Vec<(f32, f32)>>,
}

impl FakeDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self {
            result: Ok(detections),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(confidence, iou_threshold)` of every call so far.
    pub fn calls(&self) -> Vec<(f32, f32)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Detector for FakeDetector {
    async fn infer(
        &self,
        _image: &RgbImage,
        confidence: f32,
        iou_threshold: f32,
    ) -> TrackingResult<Vec<RawDetection>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((confidence, iou_threshold));
        }
        self.result.clone().map_err(TrackingError::inference)
    }

    fn name(&self) -> &str {
        "fake-detector"
    }
}

/// Tracker call recorded by `ScriptedSegmenter`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedCall {
    LoadFirstFrame,
    AddPrompt(u64, TrackId, BoundingBox),
    Advance,
    Close,
}

#[derive(Default)]
struct Script {
    frames: VecDeque<Vec<MaskField>>,
    calls: Vec<ScriptedCall>,
    contexts_opened: usize,
}

/// Segmentation model whose contexts replay a fixed list of per-frame
/// mask fields. Advancing past the end of the script fails like a tracker
/// inference error.
#[derive(Clone)]
pub struct ScriptedSegmenter {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSegmenter {
    pub fn new(frames: Vec<Vec<MaskField>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                frames: frames.into(),
                ..Script::default()
            })),
        }
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.script
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn contexts_opened(&self) -> usize {
        self.script.lock().map(|s| s.contexts_opened).unwrap_or(0)
    }
}

#[async_trait]
impl SegmentationModel for ScriptedSegmenter {
    async fn open_context(&self) -> TrackingResult<Box<dyn TrackerContext>> {
        if let Ok(mut script) = self.script.lock() {
            script.contexts_opened += 1;
        }
        Ok(Box::new(ScriptedContext {
            script: Arc::clone(&self.script),
        }))
    }

    fn name(&self) -> &str {
        "scripted-segmenter"
    }
}

struct ScriptedContext {
    script: Arc<Mutex<Script>>,
}

impl ScriptedContext {
    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> TrackingResult<T> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| TrackingError::inference("script lock poisoned"))?;
        Ok(f(&mut script))
    }
}

#[async_trait]
impl TrackerContext for ScriptedContext {
    async fn load_first_frame(&mut self, _image: &RgbImage) -> TrackingResult<()> {
        self.with_script(|s| s.calls.push(ScriptedCall::LoadFirstFrame))
    }

    async fn add_prompt(
        &mut self,
        frame_index: u64,
        track_id: TrackId,
        bbox: BoundingBox,
    ) -> TrackingResult<()> {
        self.with_script(|s| {
            s.calls
                .push(ScriptedCall::AddPrompt(frame_index, track_id, bbox))
        })
    }

    async fn advance(&mut self, _image: &RgbImage) -> TrackingResult<Vec<MaskField>> {
        self.with_script(|s| {
            s.calls.push(ScriptedCall::Advance);
            s.frames.pop_front()
        })?
        .ok_or_else(|| TrackingError::inference("tracker script exhausted"))
    }

    async fn close(&mut self) -> TrackingResult<()> {
        self.with_script(|s| s.calls.push(ScriptedCall::Close))
    }
}
