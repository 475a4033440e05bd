use crate::bbox::{to_absolute, AbsoluteBox};
use crate::detector::{Detection, DetectionAdapter};
use crate::error::ExportError;
use crate::gallery::CaptureBuffer;
use crate::source::{Frame, FrameSource};
use image::imageops::{self, FilterType};
use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{debug, info, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;

const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const OVERLAY_THICKNESS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Detecting,
}

/// Display area the frontend currently has for the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Size to scale to, or `None` when the viewport has no usable area.
    fn target_size(&self) -> Option<(u32, u32)> {
        if self.width > 0 && self.height > 0 {
            Some((self.width as u32, self.height as u32))
        } else {
            None
        }
    }
}

/// Requests the frontend can make of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartDetection,
    StopDetection,
    Capture,
    ClearGallery,
    Export(PathBuf),
    Quit,
}

#[derive(Debug)]
pub enum Outcome {
    StateChanged(RunState),
    /// A thumbnail was appended at this gallery index.
    Captured(usize),
    /// Capture had nothing to work with.
    Ignored,
    Cleared,
    Exported(usize),
    ExportFailed(ExportError),
    Quit,
}

/// Owns the camera, the detector and everything captured from them.
///
/// All state is mutated through `&mut self` from the interactive thread.
pub struct DetectionLoop<S> {
    source: S,
    detector: DetectionAdapter,
    state: RunState,
    last_frame: Option<Frame>,
    last_detections: Vec<Detection>,
    gallery: CaptureBuffer,
    thumbnail_size: u32,
}

impl<S: FrameSource> DetectionLoop<S> {
    pub fn new(source: S, detector: DetectionAdapter, thumbnail_size: u32) -> Self {
        Self {
            source,
            detector,
            state: RunState::Idle,
            last_frame: None,
            last_detections: Vec::new(),
            gallery: CaptureBuffer::new(),
            thumbnail_size: thumbnail_size.max(1),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn start_detection(&mut self) {
        if self.state != RunState::Detecting {
            info!("Face detection started");
        }
        self.state = RunState::Detecting;
    }

    pub fn stop_detection(&mut self) {
        if self.state != RunState::Idle {
            info!("Face detection stopped");
        }
        self.state = RunState::Idle;
    }

    /// Whether a capture request can currently find faces.
    pub fn can_capture(&self) -> bool {
        self.state == RunState::Detecting
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn last_detections(&self) -> &[Detection] {
        &self.last_detections
    }

    pub fn gallery(&self) -> &CaptureBuffer {
        &self.gallery
    }

    pub fn thumbnail_size(&self) -> u32 {
        self.thumbnail_size
    }

    /// Runs one frame through the pipeline and returns the frame to display.
    ///
    /// Returns `None` when the camera missed a frame; nothing else changes in
    /// that case.
    pub fn tick(&mut self, viewport: Viewport) -> Option<Frame> {
        let Some(frame) = self.source.read() else {
            trace!("Missed camera frame");
            return None;
        };

        // detections always belong to the frame stored next to them
        self.last_detections.clear();
        let mut display = frame.clone();

        if self.state == RunState::Detecting {
            let detections = self.detector.detect(&frame);
            for detection in &detections {
                let bbox = to_absolute(&detection.bbox, frame.width(), frame.height());
                draw_box(&mut display, &bbox);
            }
            self.last_detections = detections;
        }
        self.last_frame = Some(frame);

        match viewport.target_size() {
            Some((width, height)) if (width, height) != display.dimensions() => Some(
                imageops::resize(&display, width, height, FilterType::Triangle),
            ),
            _ => Some(display),
        }
    }

    /// Crops one randomly chosen detected face from the last raw frame into
    /// the gallery. Returns the new gallery index, or `None` if detection is
    /// stopped or there was no frame, no detection, or only zero-area
    /// detections.
    pub fn capture<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if !self.can_capture() {
            return None;
        }
        let frame = self.last_frame.as_ref()?;
        if self.last_detections.is_empty() {
            return None;
        }

        let regions: Vec<AbsoluteBox> = self
            .last_detections
            .iter()
            .map(|detection| to_absolute(&detection.bbox, frame.width(), frame.height()))
            .filter(|bbox| !bbox.is_degenerate())
            .collect();
        let region = regions.choose(rng)?;

        let crop = imageops::crop_imm(frame, region.x, region.y, region.width, region.height)
            .to_image();
        let thumbnail = imageops::resize(
            &crop,
            self.thumbnail_size,
            self.thumbnail_size,
            FilterType::Triangle,
        );
        let index = self.gallery.append(thumbnail).index();
        debug!(
            "Captured face {} from {}x{} region at ({}, {}), {} candidate(s)",
            index,
            region.width,
            region.height,
            region.x,
            region.y,
            regions.len()
        );
        Some(index)
    }

    pub fn clear_gallery(&mut self) {
        self.gallery.clear();
    }

    pub fn export(&self, dir: &std::path::Path) -> Result<usize, ExportError> {
        self.gallery.export(dir)
    }

    pub fn handle<R: Rng + ?Sized>(&mut self, command: Command, rng: &mut R) -> Outcome {
        match command {
            Command::StartDetection => {
                self.start_detection();
                Outcome::StateChanged(self.state)
            }
            Command::StopDetection => {
                self.stop_detection();
                Outcome::StateChanged(self.state)
            }
            Command::Capture => match self.capture(rng) {
                Some(index) => Outcome::Captured(index),
                None => Outcome::Ignored,
            },
            Command::ClearGallery => {
                self.clear_gallery();
                Outcome::Cleared
            }
            Command::Export(dir) => match self.export(&dir) {
                Ok(count) => Outcome::Exported(count),
                Err(e) => Outcome::ExportFailed(e),
            },
            Command::Quit => Outcome::Quit,
        }
    }

    /// Releases the camera. Safe to call more than once.
    pub fn close(&mut self) {
        self.source.close();
    }
}

fn draw_box(image: &mut Frame, bbox: &AbsoluteBox) {
    for inset in 0..OVERLAY_THICKNESS {
        let width = bbox.width.saturating_sub(2 * inset);
        let height = bbox.height.saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let rect =
            Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(image, rect, OVERLAY_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::RelativeBox;
    use crate::detector::{DetectorConfig, FaceModel};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;

    struct QueueSource {
        frames: VecDeque<Option<Frame>>,
    }

    impl FrameSource for QueueSource {
        fn read(&mut self) -> Option<Frame> {
            self.frames.pop_front().flatten()
        }

        fn close(&mut self) {}
    }

    struct FixedModel(Vec<Detection>);

    impl FaceModel for FixedModel {
        fn infer(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Detection>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn face(xmin: f64, ymin: f64, size: f64) -> Detection {
        Detection {
            bbox: RelativeBox::new(xmin, ymin, size, size),
            confidence: 0.9,
        }
    }

    fn build(frames: Vec<Option<Frame>>, faces: Vec<Detection>) -> DetectionLoop<QueueSource> {
        let source = QueueSource {
            frames: frames.into(),
        };
        let detector =
            DetectionAdapter::new(Box::new(FixedModel(faces)), DetectorConfig::default());
        DetectionLoop::new(source, detector, 100)
    }

    fn gray(width: u32, height: u32) -> Frame {
        Frame::from_pixel(width, height, Rgb([128, 128, 128]))
    }

    #[test]
    fn missed_frame_keeps_previous_state() {
        let mut pipeline = build(vec![Some(gray(40, 30)), None], vec![face(0.1, 0.1, 0.5)]);
        pipeline.start_detection();
        assert!(pipeline.tick(Viewport::default()).is_some());
        assert_eq!(pipeline.last_detections().len(), 1);

        assert!(pipeline.tick(Viewport::default()).is_none());
        assert_eq!(pipeline.last_detections().len(), 1);
        assert!(pipeline.last_frame().is_some());
    }

    #[test]
    fn overlay_is_drawn_on_display_copy_only() {
        let mut pipeline = build(vec![Some(gray(40, 40))], vec![face(0.25, 0.25, 0.5)]);
        pipeline.start_detection();
        let display = pipeline.tick(Viewport::default()).unwrap();

        assert_eq!(display.get_pixel(10, 10), &OVERLAY_COLOR);
        assert_eq!(display.get_pixel(11, 11), &OVERLAY_COLOR);
        assert_eq!(display.get_pixel(20, 20), &Rgb([128, 128, 128]));
        let raw = pipeline.last_frame().unwrap();
        assert_eq!(raw.get_pixel(10, 10), &Rgb([128, 128, 128]));
    }

    #[test]
    fn display_is_scaled_to_viewport() {
        let mut pipeline = build(vec![Some(gray(64, 48)), Some(gray(64, 48))], vec![]);
        let display = pipeline.tick(Viewport::new(320, 200)).unwrap();
        assert_eq!(display.dimensions(), (320, 200));
        assert_eq!(pipeline.last_frame().unwrap().dimensions(), (64, 48));

        let display = pipeline.tick(Viewport::new(0, 200)).unwrap();
        assert_eq!(display.dimensions(), (64, 48));
    }

    #[test]
    fn capture_crops_selected_region() {
        let mut frame = gray(40, 40);
        for y in 20..40 {
            for x in 20..40 {
                frame.put_pixel(x, y, Rgb([200, 10, 10]));
            }
        }
        let mut pipeline = build(vec![Some(frame)], vec![face(0.5, 0.5, 0.5)]);
        pipeline.start_detection();
        pipeline.tick(Viewport::default());

        let index = pipeline.capture(&mut StdRng::seed_from_u64(1));
        assert_eq!(index, Some(0));
        let thumb = pipeline.gallery().get(0).unwrap().image();
        assert_eq!(thumb.dimensions(), (100, 100));
        assert!(thumb.pixels().all(|p| *p == Rgb([200, 10, 10])));
    }

    #[test]
    fn capture_skips_degenerate_regions() {
        let mut pipeline = build(
            vec![Some(gray(40, 40))],
            vec![face(0.5, 0.5, 0.0), face(1.5, 0.1, 0.3)],
        );
        pipeline.start_detection();
        pipeline.tick(Viewport::default());
        assert_eq!(pipeline.last_detections().len(), 2);

        assert_eq!(pipeline.capture(&mut StdRng::seed_from_u64(1)), None);
        assert!(pipeline.gallery().is_empty());
    }

    #[test]
    fn commands_map_to_operations() {
        let mut pipeline = build(vec![Some(gray(40, 40))], vec![face(0.1, 0.1, 0.5)]);
        let mut rng = StdRng::seed_from_u64(3);

        assert!(!pipeline.can_capture());
        assert!(matches!(
            pipeline.handle(Command::StartDetection, &mut rng),
            Outcome::StateChanged(RunState::Detecting)
        ));
        assert!(pipeline.can_capture());
        assert!(matches!(
            pipeline.handle(Command::Capture, &mut rng),
            Outcome::Ignored
        ));

        pipeline.tick(Viewport::default());
        assert!(matches!(
            pipeline.handle(Command::Capture, &mut rng),
            Outcome::Captured(0)
        ));
        assert!(matches!(
            pipeline.handle(Command::ClearGallery, &mut rng),
            Outcome::Cleared
        ));
        assert!(pipeline.gallery().is_empty());
        assert!(matches!(
            pipeline.handle(Command::StopDetection, &mut rng),
            Outcome::StateChanged(RunState::Idle)
        ));
        assert!(matches!(pipeline.handle(Command::Quit, &mut rng), Outcome::Quit));
    }

    #[test]
    fn capture_after_stop_is_ignored() {
        let mut pipeline = build(vec![Some(gray(40, 40))], vec![face(0.1, 0.1, 0.5)]);
        let mut rng = StdRng::seed_from_u64(3);

        pipeline.handle(Command::StartDetection, &mut rng);
        pipeline.tick(Viewport::default());
        assert_eq!(pipeline.last_detections().len(), 1);

        pipeline.handle(Command::StopDetection, &mut rng);
        assert!(!pipeline.can_capture());
        assert!(matches!(
            pipeline.handle(Command::Capture, &mut rng),
            Outcome::Ignored
        ));
        assert!(pipeline.gallery().is_empty());
    }

    #[test]
    fn export_command_reports_failure() {
        let mut pipeline = build(vec![], vec![]);
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut rng = StdRng::seed_from_u64(3);

        match pipeline.handle(Command::Export(missing), &mut rng) {
            Outcome::ExportFailed(e) => assert_eq!(e.written, 0),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(
            pipeline.handle(Command::Export(dir.path().to_path_buf()), &mut rng),
            Outcome::Exported(0)
        ));
    }
}
