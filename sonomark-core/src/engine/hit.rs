//! Pixel-space hit testing for annotations and their edit handles.

use crate::geometry::{Geometry, Handle};
use crate::transform;
use crate::types::{AnnotationId, CanvasSize, SoundEventAnnotation, Window};

/// How a geometry lands on a canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Footprint {
    /// Full-height line (time stamps, or a point seen without its frequency).
    Line { x: f64 },
    /// Full-height band (time intervals).
    Band { x0: f64, x1: f64 },
    Dot { x: f64, y: f64 },
    Rect { x: f64, y: f64, w: f64, h: f64 },
}

/// Where `geometry` lands on a canvas showing `window`. With `time_only` the
/// frequency axis is ignored, which is how the waveform canvas shows
/// annotations. Line strings and degenerate windows have no footprint.
pub fn footprint(geometry: &Geometry, window: &Window, size: CanvasSize, time_only: bool) -> Option<Footprint> {
    let x = |t: f64| transform::time_to_x(t, window, size);
    match geometry {
        Geometry::TimeStamp(g) => Some(Footprint::Line { x: x(g.time)? }),
        Geometry::TimeInterval(g) => Some(Footprint::Band { x0: x(g.start)?, x1: x(g.end)? }),
        Geometry::Point(g) if time_only => Some(Footprint::Line { x: x(g.time)? }),
        Geometry::Point(g) => {
            let (x, y) = transform::to_pixel(g.time, g.freq, window, size)?;
            Some(Footprint::Dot { x, y })
        }
        Geometry::BoundingBox(b) if time_only => Some(Footprint::Band { x0: x(b.time_min)?, x1: x(b.time_max)? }),
        Geometry::BoundingBox(b) => {
            let (x0, y0) = transform::to_pixel(b.time_min, b.freq_max, window, size)?;
            let (x1, y1) = transform::to_pixel(b.time_max, b.freq_min, window, size)?;
            Some(Footprint::Rect { x: x0, y: y0, w: x1 - x0, h: y1 - y0 })
        }
        Geometry::LineString(_) => None,
    }
}

impl Footprint {
    pub fn contains(&self, px: f64, py: f64, tolerance: f64) -> bool {
        match *self {
            Footprint::Line { x } => (px - x).abs() <= tolerance,
            Footprint::Band { x0, x1 } => px >= x0 - tolerance && px <= x1 + tolerance,
            Footprint::Dot { x, y } => (px - x).hypot(py - y) <= tolerance,
            Footprint::Rect { x, y, w, h } => {
                px >= x - tolerance && px <= x + w + tolerance && py >= y - tolerance && py <= y + h + tolerance
            }
        }
    }
}

/// Topmost annotation under the pointer. Later annotations paint over
/// earlier ones, so the search runs back to front.
pub fn annotation_at(
    annotations: &[SoundEventAnnotation],
    px: f64,
    py: f64,
    window: &Window,
    size: CanvasSize,
    tolerance: f64,
) -> Option<AnnotationId> {
    annotations
        .iter()
        .rev()
        .find(|a| {
            footprint(&a.geometry, window, size, false).is_some_and(|fp| fp.contains(px, py, tolerance))
        })
        .map(|a| a.id)
}

/// Pixel centre of each handle. Handles without a frequency sit at mid-height.
pub fn handle_positions(geometry: &Geometry, window: &Window, size: CanvasSize) -> Vec<(Handle, f64, f64)> {
    geometry
        .handles()
        .into_iter()
        .filter_map(|(handle, time, freq)| {
            let x = transform::time_to_x(time, window, size)?;
            let y = match freq {
                Some(f) => transform::freq_to_y(f, window, size)?,
                None => size.height / 2.0,
            };
            Some((handle, x, y))
        })
        .collect()
}

/// Handle within `radius` pixels of the pointer. Corners win over edges when
/// both are in reach.
pub fn handle_at(geometry: &Geometry, px: f64, py: f64, window: &Window, size: CanvasSize, radius: f64) -> Option<Handle> {
    handle_positions(geometry, window, size)
        .into_iter()
        .find(|&(_, x, y)| (px - x).hypot(py - y) <= radius)
        .map(|(h, _, _)| h)
}
