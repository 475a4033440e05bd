use crate::error::{ExportCause, ExportError};
use image::RgbImage;
use log::{debug, info};
use std::path::Path;

pub const DEFAULT_THUMBNAIL_SIZE: u32 = 100;

/// A captured face thumbnail. `index` is its 0-based position in the buffer.
#[derive(Debug, Clone)]
pub struct CapturedFace {
    index: usize,
    image: RgbImage,
}

impl CapturedFace {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Name the thumbnail is exported under, numbered from 1.
    pub fn file_name(&self) -> String {
        format!("face_{}.png", self.index + 1)
    }
}

/// Captured thumbnails in insertion order.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    faces: Vec<CapturedFace>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, image: RgbImage) -> &CapturedFace {
        let index = self.faces.len();
        self.faces.push(CapturedFace { index, image });
        &self.faces[index]
    }

    pub fn clear(&mut self) {
        if !self.faces.is_empty() {
            debug!("Clearing {} captured face(s)", self.faces.len());
        }
        self.faces.clear();
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CapturedFace> {
        self.faces.get(index)
    }

    pub fn last(&self) -> Option<&CapturedFace> {
        self.faces.last()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CapturedFace> + ExactSizeIterator {
        self.faces.iter()
    }

    /// Writes every thumbnail into `dir` as `face_<n>.png`.
    ///
    /// Stops at the first failure. Files written before it are left in place
    /// and counted in [`ExportError::written`].
    pub fn export(&self, dir: &Path) -> Result<usize, ExportError> {
        if !dir.is_dir() {
            return Err(ExportError {
                written: 0,
                path: dir.to_path_buf(),
                cause: ExportCause::MissingDirectory,
            });
        }

        for (written, face) in self.faces.iter().enumerate() {
            let path = dir.join(face.file_name());
            face.image.save(&path).map_err(|e| ExportError {
                written,
                path: path.clone(),
                cause: e.into(),
            })?;
        }

        info!("Exported {} face(s) to {}", self.faces.len(), dir.display());
        Ok(self.faces.len())
    }
}
