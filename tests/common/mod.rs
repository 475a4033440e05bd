//! Fake camera, model and frontend shared by the integration tests.
#![allow(dead_code)]

use face_capture::{
    CaptureBuffer, Command, Detection, DetectionAdapter, DetectionLoop, DetectorConfig, FaceModel,
    Frame, FrameSource, Frontend, Outcome, RelativeBox, Viewport,
};
use image::Rgb;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

pub fn gray_frame(width: u32, height: u32) -> Frame {
    Frame::from_pixel(width, height, GRAY)
}

pub fn face(xmin: f64, ymin: f64, width: f64, height: f64) -> Detection {
    Detection {
        bbox: RelativeBox::new(xmin, ymin, width, height),
        confidence: 0.9,
    }
}

/// Camera replaying a fixed script; `None` entries are missed frames and an
/// exhausted script keeps missing.
pub struct ScriptedSource {
    frames: VecDeque<Option<Frame>>,
    repeat: Option<Frame>,
    pub closed: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Option<Frame>>) -> Self {
        Self {
            frames: frames.into(),
            repeat: None,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Camera that never misses and always yields `frame`.
    pub fn steady(frame: Frame) -> Self {
        Self {
            frames: VecDeque::new(),
            repeat: Some(frame),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Option<Frame> {
        match self.frames.pop_front() {
            Some(frame) => frame,
            None => self.repeat.clone(),
        }
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Model that always finds the same faces and counts how often it ran.
pub struct CountingModel {
    detections: Vec<Detection>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingModel {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FaceModel for CountingModel {
    fn infer(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

pub struct Harness {
    pub pipeline: DetectionLoop<ScriptedSource>,
    pub model_calls: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

pub fn harness(source: ScriptedSource, faces: Vec<Detection>, thumbnail_size: u32) -> Harness {
    let model = CountingModel::new(faces);
    let model_calls = model.calls.clone();
    let closed = source.closed.clone();
    let detector = DetectionAdapter::new(Box::new(model), DetectorConfig::default());
    Harness {
        pipeline: DetectionLoop::new(source, detector, thumbnail_size),
        model_calls,
        closed,
    }
}

/// Frontend replaying one batch of commands per poll. Once the script runs
/// out it asks to quit.
#[derive(Default)]
pub struct ScriptedFrontend {
    script: VecDeque<Vec<Command>>,
    pub viewport: Viewport,
    pub loading_shown: usize,
    pub main_shown: bool,
    pub presented: Vec<(u32, u32)>,
    pub outcomes: Vec<String>,
    pub gallery_sizes: Vec<usize>,
    pub fail_present: bool,
    pub shown_main_flag: Option<Arc<AtomicBool>>,
}

impl ScriptedFrontend {
    pub fn new(script: Vec<Vec<Command>>) -> Self {
        Self {
            script: script.into(),
            ..Default::default()
        }
    }
}

impl Frontend for ScriptedFrontend {
    fn show_loading(&mut self) -> anyhow::Result<()> {
        assert!(!self.main_shown, "loading surface shown after main view");
        self.loading_shown += 1;
        Ok(())
    }

    fn show_main(&mut self) -> anyhow::Result<()> {
        self.main_shown = true;
        if let Some(flag) = &self.shown_main_flag {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn poll_commands(&mut self) -> anyhow::Result<Vec<Command>> {
        Ok(self.script.pop_front().unwrap_or_else(|| vec![Command::Quit]))
    }

    fn present(&mut self, frame: &Frame) -> anyhow::Result<()> {
        if self.fail_present {
            anyhow::bail!("window closed");
        }
        self.presented.push(frame.dimensions());
        Ok(())
    }

    fn on_outcome(&mut self, outcome: &Outcome, gallery: &CaptureBuffer) -> anyhow::Result<()> {
        self.outcomes.push(format!("{outcome:?}"));
        self.gallery_sizes.push(gallery.len());
        Ok(())
    }
}
