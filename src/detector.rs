use crate::bbox::RelativeBox;
use crate::source::Frame;
use log::{debug, warn};

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub bbox: RelativeBox,
    pub confidence: f32,
}

/// Which trade-off the face model is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ModelVariant {
    /// Close-range faces, cheaper per frame.
    #[default]
    Fast,
    /// Smaller and more distant faces at a higher per-frame cost.
    Accurate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub variant: ModelVariant,
    pub min_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Opaque face model. Returns every candidate it finds, unfiltered.
pub trait FaceModel: Send {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<Vec<Detection>>;

    /// Name used in log output.
    fn name(&self) -> &str;
}

/// Runs a [`FaceModel`] and keeps only detections above the configured
/// confidence threshold. The configuration is fixed at construction.
pub struct DetectionAdapter {
    model: Box<dyn FaceModel>,
    config: DetectorConfig,
}

impl DetectionAdapter {
    pub fn new(model: Box<dyn FaceModel>, config: DetectorConfig) -> Self {
        debug!(
            "Face detection using {} ({:?}, min confidence {})",
            model.name(),
            config.variant,
            config.min_confidence
        );
        Self { model, config }
    }

    pub fn config(&self) -> DetectorConfig {
        self.config
    }

    /// Detects faces in `frame`. A model failure is logged and reported as no
    /// faces; detection never fails the caller.
    pub fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        if frame.width() == 0 || frame.height() == 0 {
            return Vec::new();
        }
        let candidates = match self.model.infer(frame) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("{} inference failed: {e:#}", self.model.name());
                return Vec::new();
            }
        };
        candidates
            .into_iter()
            .filter(|detection| detection.confidence >= self.config.min_confidence)
            .collect()
    }
}
