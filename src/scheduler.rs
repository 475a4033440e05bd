use crate::error::PipelineError;
use crate::frontend::Frontend;
use crate::init::frontend_error;
use crate::pipeline::{DetectionLoop, Outcome};
use crate::source::FrameSource;
use log::{info, warn};
use rand::Rng;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Ticks the pipeline every `period` until the frontend asks to quit.
///
/// Each iteration applies pending commands, runs one tick and presents its
/// frame before the next iteration is scheduled. The camera is closed on the
/// way out, also when the frontend fails.
pub async fn run<S, U, R>(
    pipeline: &mut DetectionLoop<S>,
    frontend: &mut U,
    period: Duration,
    rng: &mut R,
) -> Result<(), PipelineError>
where
    S: FrameSource,
    U: Frontend,
    R: Rng + ?Sized,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
        interval.tick().await;
        match step(pipeline, frontend, rng) {
            Ok(true) => continue,
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    pipeline.close();
    info!("Camera released");
    result
}

/// One scheduler iteration. Returns `false` once a quit was requested.
fn step<S, U, R>(
    pipeline: &mut DetectionLoop<S>,
    frontend: &mut U,
    rng: &mut R,
) -> Result<bool, PipelineError>
where
    S: FrameSource,
    U: Frontend,
    R: Rng + ?Sized,
{
    for command in frontend.poll_commands().map_err(frontend_error)? {
        let outcome = pipeline.handle(command, rng);
        if let Outcome::ExportFailed(e) = &outcome {
            warn!("{e}");
        }
        frontend
            .on_outcome(&outcome, pipeline.gallery())
            .map_err(frontend_error)?;
        if matches!(outcome, Outcome::Quit) {
            return Ok(false);
        }
    }

    if let Some(frame) = pipeline.tick(frontend.viewport()) {
        frontend.present(&frame).map_err(frontend_error)?;
    }
    Ok(true)
}
