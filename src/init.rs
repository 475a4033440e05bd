use crate::config::PipelineConfig;
use crate::detector::DetectionAdapter;
use crate::error::PipelineError;
use crate::frontend::Frontend;
use crate::pipeline::DetectionLoop;
use crate::source::FrameSource;
use log::{error, info};
use std::time::{Duration, Instant};
use tokio::time;

/// How often the loading surface is refreshed while the camera and model load.
const LOADING_REFRESH_PERIOD: Duration = Duration::from_millis(30);

/// Builds the camera and detector on a blocking worker thread while the
/// frontend shows its loading surface, then switches the frontend to the main
/// view.
///
/// The returned pipeline is complete; ticking may start as soon as this
/// returns. Any error is fatal for the application.
pub async fn initialize<S, F, U>(
    frontend: &mut U,
    config: &PipelineConfig,
    build: F,
) -> Result<DetectionLoop<S>, PipelineError>
where
    S: FrameSource + 'static,
    F: FnOnce() -> Result<(S, DetectionAdapter), PipelineError> + Send + 'static,
    U: Frontend,
{
    let started = Instant::now();
    frontend.show_loading().map_err(frontend_error)?;

    let mut task = tokio::task::spawn_blocking(build);
    let mut refresh = time::interval(LOADING_REFRESH_PERIOD);
    let built = loop {
        tokio::select! {
            joined = &mut task => {
                break joined.map_err(|e| PipelineError::Init(e.to_string()))?;
            }
            _ = refresh.tick() => frontend.show_loading().map_err(frontend_error)?,
        }
    };

    let (source, detector) = match built {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup failed: {e}");
            return Err(e);
        }
    };

    let pipeline = DetectionLoop::new(source, detector, config.thumbnail_size);
    frontend.show_main().map_err(frontend_error)?;
    info!("Pipeline ready after {:?}", started.elapsed());
    Ok(pipeline)
}

pub(crate) fn frontend_error(e: anyhow::Error) -> PipelineError {
    PipelineError::Frontend(format!("{e:#}"))
}
