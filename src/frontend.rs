use crate::gallery::CaptureBuffer;
use crate::pipeline::{Command, Outcome, Viewport};
use crate::source::Frame;

/// The window the pipeline is shown in.
///
/// The frontend owns layout and key bindings; it only ever asks the pipeline
/// to do things through [`Command`]s and never touches pipeline state itself.
pub trait Frontend {
    /// Shows the blocking loading surface. Called repeatedly while startup is
    /// in progress so the window keeps handling its events.
    fn show_loading(&mut self) -> anyhow::Result<()>;

    /// Replaces the loading surface with the main view.
    fn show_main(&mut self) -> anyhow::Result<()>;

    fn viewport(&self) -> Viewport;

    /// Commands requested since the last call, in the order they were made.
    fn poll_commands(&mut self) -> anyhow::Result<Vec<Command>>;

    fn present(&mut self, frame: &Frame) -> anyhow::Result<()>;

    /// Reacts to the result of a command, e.g. by redrawing the gallery.
    fn on_outcome(&mut self, outcome: &Outcome, gallery: &CaptureBuffer) -> anyhow::Result<()>;
}
