use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("camera device {index} unavailable: {reason}")]
    DeviceUnavailable { index: i32, reason: String },

    #[error("failed to load face model: {0}")]
    ModelLoad(String),

    #[error("initialization task failed: {0}")]
    Init(String),

    #[error("frontend error: {0}")]
    Frontend(String),
}

impl PipelineError {
    pub fn device_unavailable<S: Into<String>>(index: i32, reason: S) -> Self {
        Self::DeviceUnavailable {
            index,
            reason: reason.into(),
        }
    }

    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoad(msg.into())
    }
}

/// Gallery export failure. Files written before the failure stay on disk.
#[derive(Error, Debug)]
#[error("export to {} failed after {} file(s): {}", .path.display(), .written, .cause)]
pub struct ExportError {
    pub written: usize,
    pub path: PathBuf,
    #[source]
    pub cause: ExportCause,
}

#[derive(Error, Debug)]
pub enum ExportCause {
    #[error("destination is not an existing directory")]
    MissingDirectory,

    #[error("image write error {0}")]
    Image(#[from] image::ImageError),
}
