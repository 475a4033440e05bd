use image::RgbImage;

/// One camera frame: packed RGB, row-major.
pub type Frame = RgbImage;

pub const DEFAULT_DEVICE_INDEX: i32 = 0;

/// A camera yielding frames on demand.
///
/// Opening is left to the concrete source since it is where a missing device
/// surfaces as [`crate::PipelineError::DeviceUnavailable`].
pub trait FrameSource: Send {
    /// Reads the next frame. `None` is a missed frame, not an error; callers
    /// skip the tick and try again on the next one.
    fn read(&mut self) -> Option<Frame>;

    /// Releases the device. Calling it again has no effect.
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Option<Frame> {
        (**self).read()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
