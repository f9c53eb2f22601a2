//! Mapping between canvas pixels and time/frequency.
//!
//! x grows with time, y is inverted: row 0 is the window's top frequency.
//! Both directions return `None` for a degenerate canvas or window so callers
//! can skip drawing instead of dividing by zero.

use crate::types::{CanvasSize, Window};

fn degenerate(window: &Window, size: CanvasSize) -> bool {
    size.is_empty() || !(window.time.span() > 0.0) || !(window.freq.span() > 0.0)
}

pub fn to_pixel(time: f64, freq: f64, window: &Window, size: CanvasSize) -> Option<(f64, f64)> {
    if degenerate(window, size) {
        return None;
    }
    let x = (time - window.time.min) / window.time.span() * size.width;
    let y = (window.freq.max - freq) / window.freq.span() * size.height;
    Some((x, y))
}

pub fn to_domain(x: f64, y: f64, window: &Window, size: CanvasSize) -> Option<(f64, f64)> {
    if degenerate(window, size) {
        return None;
    }
    let time = window.time.min + x / size.width * window.time.span();
    let freq = window.freq.max - y / size.height * window.freq.span();
    Some((time, freq))
}

/// Horizontal pixel of `time`, ignoring the frequency axis.
pub fn time_to_x(time: f64, window: &Window, size: CanvasSize) -> Option<f64> {
    if size.is_empty() || !(window.time.span() > 0.0) {
        return None;
    }
    Some((time - window.time.min) / window.time.span() * size.width)
}

pub fn freq_to_y(freq: f64, window: &Window, size: CanvasSize) -> Option<f64> {
    if size.is_empty() || !(window.freq.span() > 0.0) {
        return None;
    }
    Some((window.freq.max - freq) / window.freq.span() * size.height)
}

/// Seconds per horizontal pixel.
pub fn time_per_pixel(window: &Window, size: CanvasSize) -> Option<f64> {
    (size.width > 0.0).then(|| window.time.span() / size.width)
}

/// Hz per vertical pixel.
pub fn freq_per_pixel(window: &Window, size: CanvasSize) -> Option<f64> {
    (size.height > 0.0).then(|| window.freq.span() / size.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Interval;

    fn window() -> Window {
        Window::new(Interval::new(0.0, 10.0), Interval::new(0.0, 22050.0))
    }

    #[test]
    fn test_frequency_axis_is_inverted() {
        let size = CanvasSize::new(800.0, 400.0);
        let (x, y) = to_pixel(0.0, 22050.0, &window(), size).unwrap();
        assert_eq!((x, y), (0.0, 0.0));
        let (x, y) = to_pixel(10.0, 0.0, &window(), size).unwrap();
        assert_eq!((x, y), (800.0, 400.0));
    }

    #[test]
    fn test_to_domain_center() {
        let size = CanvasSize::new(800.0, 400.0);
        let (t, f) = to_domain(400.0, 200.0, &window(), size).unwrap();
        assert!((t - 5.0).abs() < 1e-9);
        assert!((f - 11025.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_canvas_is_noop() {
        let size = CanvasSize::new(0.0, 0.0);
        assert!(to_pixel(1.0, 1.0, &window(), size).is_none());
        assert!(to_domain(1.0, 1.0, &window(), size).is_none());
        assert!(time_per_pixel(&window(), size).is_none());
    }

    #[test]
    fn test_degenerate_window_is_noop() {
        let flat = Window::new(Interval::new(3.0, 3.0), Interval::new(0.0, 100.0));
        assert!(to_domain(1.0, 1.0, &flat, CanvasSize::new(10.0, 10.0)).is_none());
    }
}
