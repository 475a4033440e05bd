use crate::detector::DetectorConfig;
use crate::gallery::DEFAULT_THUMBNAIL_SIZE;
use crate::source::DEFAULT_DEVICE_INDEX;
use std::time::Duration;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Settings fixed for the lifetime of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub device_index: i32,
    pub detector: DetectorConfig,
    /// Edge length of the square gallery thumbnails.
    pub thumbnail_size: u32,
    pub tick_period: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device_index: DEFAULT_DEVICE_INDEX,
            detector: DetectorConfig::default(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}
