/// Face box relative to the frame, as produced by the face model.
///
/// Fields are nominally in `[0, 1]` with the origin at the top-left corner,
/// but models regularly report boxes that extend past the frame edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeBox {
    pub xmin: f64,
    pub ymin: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeBox {
    pub fn new(xmin: f64, ymin: f64, width: f64, height: f64) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
        }
    }
}

/// Box in pixel units of one specific frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AbsoluteBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AbsoluteBox {
    /// Zero-area boxes can be drawn around but never cropped.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Maps a relative box onto a `frame_width` x `frame_height` frame.
///
/// The result always lies inside `[0, frame_width) x [0, frame_height)`;
/// parts of the box outside the frame are cut off.
pub fn to_absolute(bbox: &RelativeBox, frame_width: u32, frame_height: u32) -> AbsoluteBox {
    if frame_width == 0 || frame_height == 0 {
        return AbsoluteBox::default();
    }
    let (x, width) = clamp_span(bbox.xmin, bbox.width, frame_width);
    let (y, height) = clamp_span(bbox.ymin, bbox.height, frame_height);
    AbsoluteBox {
        x,
        y,
        width,
        height,
    }
}

fn clamp_span(start: f64, extent: f64, limit: u32) -> (u32, u32) {
    let length = f64::from(limit);
    let raw_start = (start * length).floor();
    let raw_end = raw_start + (extent * length).floor();

    let start = clamp_edge(raw_start, length);
    let end = clamp_edge(raw_end, length);
    let origin = start.min(limit - 1);
    (origin, end.saturating_sub(start))
}

// NaN edges collapse onto the frame origin.
fn clamp_edge(edge: f64, length: f64) -> u32 {
    if edge.is_nan() {
        0
    } else {
        edge.clamp(0.0, length) as u32
    }
}
