use clap::Parser;
use face_capture::backend::{frame_to_bgr_mat, CameraSource, CascadeModel};
use face_capture::config::DEFAULT_TICK_PERIOD;
use face_capture::detector::DEFAULT_MIN_CONFIDENCE;
use face_capture::gallery::DEFAULT_THUMBNAIL_SIZE;
use face_capture::source::DEFAULT_DEVICE_INDEX;
use face_capture::{
    initialize, scheduler, CaptureBuffer, Command, DetectionAdapter, DetectorConfig, Frame,
    Frontend, ModelVariant, Outcome, PipelineConfig, RunState, Viewport,
};
use image::{imageops, Rgb, RgbImage};
use log::{error, info};
use opencv::core::{Mat, Point, Scalar, CV_8UC3};
use opencv::{highgui, imgproc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

const VIDEO_WINDOW: &str = "Face Capture";
const GALLERY_WINDOW: &str = "Captured Faces";
const WINDOW_SIZE: (i32, i32) = (1000, 600);
const GALLERY_PADDING: u32 = 5;
const KEY_ESCAPE: i32 = 27;

#[derive(Parser, Debug)]
#[command(about = "Live camera face capture")]
struct Args {
    /// Camera device index.
    #[clap(short, long, default_value_t = DEFAULT_DEVICE_INDEX)]
    device: i32,

    /// Face model variant.
    #[clap(short, long, value_enum, default_value_t = ModelVariant::Fast)]
    model: ModelVariant,

    /// Detections below this confidence are dropped.
    #[clap(long, default_value_t = DEFAULT_MIN_CONFIDENCE, value_parser = parse_confidence)]
    min_confidence: f32,

    /// Edge length of captured thumbnails in pixels.
    #[clap(long, default_value_t = DEFAULT_THUMBNAIL_SIZE)]
    thumbnail_size: u32,

    /// Milliseconds between frames.
    #[clap(long, default_value_t = DEFAULT_TICK_PERIOD.as_millis() as u64)]
    tick_ms: u64,

    /// Existing directory the gallery is exported into.
    #[clap(short, long, default_value = ".")]
    export_dir: PathBuf,

    /// Directory holding the Haar cascade files. Defaults to OpenCV's data.
    #[clap(long)]
    cascade_dir: Option<PathBuf>,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            device_index: self.device,
            detector: DetectorConfig {
                variant: self.model,
                min_confidence: self.min_confidence,
            },
            thumbnail_size: self.thumbnail_size,
            tick_period: Duration::from_millis(self.tick_ms.max(1)),
        }
    }
}

fn parse_confidence(value: &str) -> Result<f32, String> {
    let confidence: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(format!("{confidence} is not between 0 and 1"))
    }
}

struct HighguiFrontend {
    export_dir: PathBuf,
    thumbnail_size: u32,
    main_visible: bool,
}

impl HighguiFrontend {
    fn new(export_dir: PathBuf, thumbnail_size: u32) -> anyhow::Result<Self> {
        highgui::named_window(VIDEO_WINDOW, highgui::WINDOW_NORMAL)?;
        highgui::resize_window(VIDEO_WINDOW, WINDOW_SIZE.0, WINDOW_SIZE.1)?;
        Ok(Self {
            export_dir,
            thumbnail_size,
            main_visible: false,
        })
    }

    fn set_status(&self, status: &str) -> anyhow::Result<()> {
        highgui::set_window_title(VIDEO_WINDOW, &format!("{VIDEO_WINDOW} - {status}"))?;
        Ok(())
    }

    /// Stacks the newest thumbnails that fit the window, latest at the bottom.
    fn draw_gallery(&self, gallery: &CaptureBuffer) -> anyhow::Result<()> {
        let thumbnail = self.thumbnail_size;
        let slot = thumbnail + GALLERY_PADDING;
        let visible = ((WINDOW_SIZE.1 as u32).saturating_sub(GALLERY_PADDING) / slot).max(1);

        let mut canvas = RgbImage::from_pixel(
            thumbnail + 2 * GALLERY_PADDING,
            visible * slot + GALLERY_PADDING,
            Rgb([40, 40, 40]),
        );
        let shown = gallery.len().min(visible as usize);
        for (row, face) in gallery.iter().skip(gallery.len() - shown).enumerate() {
            let y = GALLERY_PADDING + row as u32 * slot;
            imageops::replace(
                &mut canvas,
                face.image(),
                GALLERY_PADDING as i64,
                y as i64,
            );
        }
        highgui::imshow(GALLERY_WINDOW, &frame_to_bgr_mat(&canvas)?)?;
        Ok(())
    }
}

impl Frontend for HighguiFrontend {
    fn show_loading(&mut self) -> anyhow::Result<()> {
        let mut surface = Mat::new_rows_cols_with_default(
            WINDOW_SIZE.1,
            WINDOW_SIZE.0,
            CV_8UC3,
            Scalar::all(30.0),
        )?;
        imgproc::put_text_def(
            &mut surface,
            "Loading camera and face model...",
            Point::new(40, WINDOW_SIZE.1 / 2),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            Scalar::all(220.0),
        )?;
        highgui::imshow(VIDEO_WINDOW, &surface)?;
        // input is ignored until the main view is up
        _ = highgui::poll_key()?;
        Ok(())
    }

    fn show_main(&mut self) -> anyhow::Result<()> {
        highgui::named_window(GALLERY_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        self.draw_gallery(&CaptureBuffer::new())?;
        self.set_status("idle (s: start, e: stop, c: capture, r: clear, x: export, esc: quit)")?;
        self.main_visible = true;
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        match highgui::get_window_image_rect(VIDEO_WINDOW) {
            Ok(rect) => Viewport::new(rect.width, rect.height),
            Err(_) => Viewport::default(),
        }
    }

    fn poll_commands(&mut self) -> anyhow::Result<Vec<Command>> {
        let key = highgui::poll_key()?;
        if !self.main_visible || key < 0 {
            return Ok(Vec::new());
        }
        let command = match key & 0xff {
            k if k == b's' as i32 => Command::StartDetection,
            k if k == b'e' as i32 => Command::StopDetection,
            k if k == b'c' as i32 => Command::Capture,
            k if k == b'r' as i32 => Command::ClearGallery,
            k if k == b'x' as i32 => Command::Export(self.export_dir.clone()),
            k if k == b'q' as i32 || k == KEY_ESCAPE => Command::Quit,
            _ => return Ok(Vec::new()),
        };
        Ok(vec![command])
    }

    fn present(&mut self, frame: &Frame) -> anyhow::Result<()> {
        highgui::imshow(VIDEO_WINDOW, &frame_to_bgr_mat(frame)?)?;
        Ok(())
    }

    fn on_outcome(&mut self, outcome: &Outcome, gallery: &CaptureBuffer) -> anyhow::Result<()> {
        match outcome {
            Outcome::StateChanged(RunState::Detecting) => self.set_status("detecting")?,
            Outcome::StateChanged(RunState::Idle) => self.set_status("idle")?,
            Outcome::Captured(_) | Outcome::Cleared => self.draw_gallery(gallery)?,
            Outcome::Exported(count) => self.set_status(&format!(
                "exported {count} face(s) to {}",
                self.export_dir.display()
            ))?,
            Outcome::ExportFailed(e) => self.set_status(&format!("export failed: {e}"))?,
            Outcome::Ignored | Outcome::Quit => {}
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = Args::parse();
    let config = args.pipeline_config();
    info!("Starting with {:?}", config);

    let mut frontend = HighguiFrontend::new(args.export_dir.clone(), config.thumbnail_size.max(1))?;

    let device_index = config.device_index;
    let detector_config = config.detector;
    let cascade_dir = args.cascade_dir.clone();
    let mut pipeline = match initialize(&mut frontend, &config, move || {
        let camera = CameraSource::open(device_index)?;
        let model = CascadeModel::new(detector_config.variant, cascade_dir.as_deref())?;
        Ok((camera, DetectionAdapter::new(Box::new(model), detector_config)))
    })
    .await
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Unable to start: {e}");
            highgui::destroy_all_windows()?;
            return Err(e.into());
        }
    };

    let mut rng = StdRng::from_entropy();
    scheduler::run(&mut pipeline, &mut frontend, config.tick_period, &mut rng).await?;

    highgui::destroy_all_windows()?;
    Ok(())
}
