//! Live camera face capture.
//!
//! Frames flow from a [`FrameSource`] through the [`DetectionLoop`], which
//! overlays detected faces for display and crops captured faces into a
//! [`CaptureBuffer`] gallery that can be exported as PNG files.

pub mod bbox;
pub mod config;
pub mod detector;
pub mod error;
pub mod frontend;
pub mod gallery;
pub mod init;
pub mod pipeline;
pub mod scheduler;
pub mod source;

#[cfg(feature = "opencv")]
pub mod backend;

pub use bbox::{to_absolute, AbsoluteBox, RelativeBox};
pub use config::PipelineConfig;
pub use detector::{DetectionAdapter, Detection, DetectorConfig, FaceModel, ModelVariant};
pub use error::{ExportCause, ExportError, PipelineError};
pub use frontend::Frontend;
pub use gallery::{CaptureBuffer, CapturedFace};
pub use init::initialize;
pub use pipeline::{Command, DetectionLoop, Outcome, RunState, Viewport};
pub use source::{Frame, FrameSource};
