//! OpenCV camera and Haar cascade face model.

use crate::bbox::RelativeBox;
use crate::detector::{Detection, FaceModel, ModelVariant};
use crate::error::PipelineError;
use crate::source::{Frame, FrameSource};
use log::{debug, info, warn};
use opencv::core::{self, Mat, Rect, Size, Vector};
use opencv::prelude::*;
use opencv::{imgproc, objdetect, videoio};
use std::path::Path;

pub struct CameraSource {
    capture: videoio::VideoCapture,
    device_index: i32,
    closed: bool,
}

impl CameraSource {
    pub fn open(device_index: i32) -> Result<Self, PipelineError> {
        let capture = videoio::VideoCapture::new(device_index, videoio::CAP_ANY)
            .map_err(|e| PipelineError::device_unavailable(device_index, e.to_string()))?;
        let opened = videoio::VideoCapture::is_opened(&capture)
            .map_err(|e| PipelineError::device_unavailable(device_index, e.to_string()))?;
        if !opened {
            return Err(PipelineError::device_unavailable(
                device_index,
                "unable to open camera",
            ));
        }
        info!("Opened camera {device_index}");
        Ok(Self {
            capture,
            device_index,
            closed: false,
        })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Option<Frame> {
        if self.closed {
            return None;
        }
        let mut frame = Mat::default();
        match self.capture.read(&mut frame) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("Camera {} read failed: {e}", self.device_index);
                return None;
            }
        }
        match bgr_mat_to_frame(&frame) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping undecodable camera frame: {e}");
                None
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera {}: {e}", self.device_index);
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Converts a BGR camera image. Empty images yield `None`.
pub fn bgr_mat_to_frame(image: &Mat) -> opencv::Result<Option<Frame>> {
    let size = image.size()?;
    if size.width <= 0 || size.height <= 0 {
        return Ok(None);
    }
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(image, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let bytes = rgb.data_bytes()?.to_vec();
    Ok(Frame::from_raw(size.width as u32, size.height as u32, bytes))
}

/// Wraps a frame in a 3 channel RGB `Mat`.
pub fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        core::Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    Ok(mat)
}

/// Converts a frame to the BGR layout highgui expects.
pub fn frame_to_bgr_mat(frame: &Frame) -> opencv::Result<Mat> {
    let rgb = frame_to_mat(frame)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

pub fn convert_to_grayscale(image: &Mat) -> opencv::Result<Mat> {
    let mut gray = Mat::default();
    imgproc::cvt_color_def(image, &mut gray, imgproc::COLOR_RGB2GRAY)?;
    Ok(gray)
}

struct CascadeParams {
    file: &'static str,
    scale_factor: f64,
    min_neighbors: i32,
    min_face: i32,
}

impl CascadeParams {
    fn for_variant(variant: ModelVariant) -> Self {
        match variant {
            ModelVariant::Fast => Self {
                file: "haarcascade_frontalface_alt.xml",
                scale_factor: 1.2,
                min_neighbors: 3,
                min_face: 60,
            },
            ModelVariant::Accurate => Self {
                file: "haarcascade_frontalface_alt2.xml",
                scale_factor: 1.05,
                min_neighbors: 4,
                min_face: 30,
            },
        }
    }
}

/// Haar cascade face model. Confidence is the logistic of the cascade's final
/// stage weight, so 0.5 corresponds to a weight of zero.
pub struct CascadeModel {
    classifier: objdetect::CascadeClassifier,
    params: CascadeParams,
}

impl CascadeModel {
    /// Loads the cascade for `variant` from `cascade_dir`, or from OpenCV's
    /// bundled data when no directory is given.
    pub fn new(variant: ModelVariant, cascade_dir: Option<&Path>) -> Result<Self, PipelineError> {
        let params = CascadeParams::for_variant(variant);
        let xml = match cascade_dir {
            Some(dir) => dir.join(params.file).to_string_lossy().into_owned(),
            None => core::find_file_def(&format!("haarcascades/{}", params.file))
                .map_err(|e| PipelineError::model_load(e.to_string()))?,
        };
        let classifier = objdetect::CascadeClassifier::new(&xml)
            .map_err(|e| PipelineError::model_load(format!("{xml}: {e}")))?;
        if classifier
            .empty()
            .map_err(|e| PipelineError::model_load(e.to_string()))?
        {
            return Err(PipelineError::model_load(format!("{xml} is empty")));
        }
        debug!("Loaded cascade {xml}");
        Ok(Self { classifier, params })
    }
}

impl FaceModel for CascadeModel {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<Vec<Detection>> {
        let gray = convert_to_grayscale(&frame_to_mat(frame)?)?;

        let mut faces: Vector<Rect> = Vector::new();
        let mut reject_levels: Vector<i32> = Vector::new();
        let mut level_weights: Vector<f64> = Vector::new();
        self.classifier.detect_multi_scale3(
            &gray,
            &mut faces,
            &mut reject_levels,
            &mut level_weights,
            self.params.scale_factor,
            self.params.min_neighbors,
            objdetect::CASCADE_SCALE_IMAGE,
            Size::new(self.params.min_face, self.params.min_face),
            Size::new(0, 0),
            true,
        )?;

        let width = frame.width() as f64;
        let height = frame.height() as f64;
        Ok(faces
            .iter()
            .zip(level_weights.iter())
            .map(|(face, weight)| Detection {
                bbox: RelativeBox::new(
                    face.x as f64 / width,
                    face.y as f64 / height,
                    face.width as f64 / width,
                    face.height as f64 / height,
                ),
                confidence: (1.0 / (1.0 + (-weight).exp())) as f32,
            })
            .collect())
    }

    fn name(&self) -> &str {
        self.params.file
    }
}
