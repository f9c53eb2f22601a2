//! The visible time/frequency window and the operations that move it.
//!
//! Navigation operations (`zoom_to`, `pan`, `center_on`, ...) are pure: they
//! return the window the viewport *would* show, already clamped to the bounds.
//! The host applies it with [`Viewport::commit`], which also records history.

use crate::transform;
use crate::types::{CanvasSize, Interval, Window};

/// Maximum number of windows kept for [`Viewport::back`].
const MAX_HISTORY: usize = 100;

/// Fraction of the span below which two windows count as the same history entry.
const HISTORY_TOLERANCE: f64 = 0.01;

#[derive(Clone, Debug)]
pub struct Viewport {
    bounds: Window,
    initial: Window,
    window: Window,
    size: CanvasSize,
    /// Locked ratio of seconds-per-pixel to Hz-per-pixel, when aspect lock is on.
    locked_density: Option<f64>,
    history: Vec<Window>,
    /// Window a continuous gesture started from, until [`Viewport::settle`].
    gesture_start: Option<Window>,
}

/// Clamp one axis to its bounds: shrink the span to fit (re-centering), then
/// shift by the minimum amount that brings it inside.
fn clamp_axis(iv: Interval, bounds: Interval) -> Interval {
    let iv = if iv.min > iv.max { Interval::new(iv.max, iv.min) } else { iv };
    let bounds_span = bounds.span().max(0.0);
    let iv = if iv.span() > bounds_span {
        Interval::centered(iv.center(), bounds_span)
    } else {
        iv
    };
    let span = iv.span();
    let iv = if iv.min < bounds.min {
        Interval::new(bounds.min, bounds.min + span)
    } else if iv.max > bounds.max {
        Interval::new(bounds.max - span, bounds.max)
    } else {
        iv
    };
    Interval::new(iv.min.max(bounds.min), iv.max.min(bounds.max))
}

fn nearly_equal(a: &Window, b: &Window) -> bool {
    let tol_t = a.time.span().abs() * HISTORY_TOLERANCE;
    let tol_f = a.freq.span().abs() * HISTORY_TOLERANCE;
    (a.time.min - b.time.min).abs() <= tol_t
        && (a.time.max - b.time.max).abs() <= tol_t
        && (a.freq.min - b.freq.min).abs() <= tol_f
        && (a.freq.max - b.freq.max).abs() <= tol_f
}

impl Viewport {
    pub fn new(bounds: Window, initial: Window) -> Self {
        let mut viewport = Self {
            bounds,
            initial,
            window: initial,
            size: CanvasSize::default(),
            locked_density: None,
            history: Vec::new(),
            gesture_start: None,
        };
        viewport.initial = viewport.clamp(initial);
        viewport.window = viewport.initial;
        viewport
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn bounds(&self) -> Window {
        self.bounds
    }

    pub fn set_canvas_size(&mut self, size: CanvasSize) {
        self.size = size;
    }

    pub fn fixed_aspect_ratio(&self) -> bool {
        self.locked_density.is_some()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Clamp `window` component-wise to the bounds, honouring the aspect lock.
    pub fn clamp(&self, window: Window) -> Window {
        let mut time = clamp_axis(window.time, self.bounds.time);
        let mut freq = clamp_axis(window.freq, self.bounds.freq);
        if let Some(freq_span) = self.locked_freq_span(time.span()) {
            if freq_span <= self.bounds.freq.span() {
                freq = clamp_axis(Interval::centered(window.freq.center(), freq_span), self.bounds.freq);
            } else if let Some(time_span) = self.locked_time_span(self.bounds.freq.span()) {
                freq = self.bounds.freq;
                time = clamp_axis(Interval::centered(time.center(), time_span), self.bounds.time);
            }
        }
        Window::new(time, freq)
    }

    /// Window to show on reset: the initial window, clamped.
    pub fn reset(&self) -> Window {
        self.clamp(self.initial)
    }

    /// Zoom by `factor` (> 1 zooms in) keeping `anchor` `(time, freq)` fixed
    /// on screen; the window center when no anchor is given.
    pub fn zoom_to(&self, factor: f64, anchor: Option<(f64, f64)>) -> Window {
        if !(factor.is_finite() && factor > 0.0) {
            return self.window;
        }
        let w = self.window;
        let (at, af) = anchor.unwrap_or((w.time.center(), w.freq.center()));
        let time_span = w.time.span() / factor;
        let freq_span = self.locked_freq_span(time_span).unwrap_or(w.freq.span() / factor);

        let rel_t = if w.time.span() > 0.0 { (at - w.time.min) / w.time.span() } else { 0.5 };
        let rel_f = if w.freq.span() > 0.0 { (af - w.freq.min) / w.freq.span() } else { 0.5 };
        let time_min = at - rel_t * time_span;
        let freq_min = af - rel_f * freq_span;
        self.clamp(Window::new(
            Interval::new(time_min, time_min + time_span),
            Interval::new(freq_min, freq_min + freq_span),
        ))
    }

    pub fn pan(&self, delta_time: f64, delta_freq: f64) -> Window {
        let w = self.window;
        self.clamp(Window::new(w.time.shifted(delta_time), w.freq.shifted(delta_freq)))
    }

    /// Pan by a pixel delta, as produced by wheel or drag gestures. Positive
    /// `dy` moves the view toward lower frequencies.
    pub fn pan_pixels(&self, dx: f64, dy: f64) -> Window {
        let dt = transform::time_per_pixel(&self.window, self.size).unwrap_or(0.0) * dx;
        let df = transform::freq_per_pixel(&self.window, self.size).unwrap_or(0.0) * -dy;
        self.pan(dt, df)
    }

    pub fn center_on(&self, time: f64) -> Window {
        let w = self.window;
        self.clamp(Window::new(Interval::centered(time, w.time.span()), w.freq))
    }

    pub fn drag_to(&self, window: Window) -> Window {
        self.clamp(window)
    }

    /// Toggle the aspect lock. When turned on, the frequency span is derived
    /// from the time span using the initial window's pixel density.
    pub fn set_fixed_aspect_ratio(&mut self, on: bool) -> Window {
        self.locked_density = if on { self.density_of(&self.initial) } else { None };
        self.clamp(self.window)
    }

    /// Apply `window` (clamped) and record the previous one for [`Viewport::back`].
    pub fn commit(&mut self, window: Window) -> Window {
        self.settle();
        let previous = self.window;
        self.window = self.clamp(window);
        self.record(previous);
        self.window
    }

    /// Apply `window` (clamped) without touching history. Used while a drag
    /// or wheel gesture is still running; [`Viewport::settle`] records it once.
    pub fn preview(&mut self, window: Window) -> Window {
        if self.gesture_start.is_none() {
            self.gesture_start = Some(self.window);
        }
        self.window = self.clamp(window);
        self.window
    }

    /// Apply `window` (clamped) without ever recording it, for moves the
    /// user did not make (playback follow-scroll).
    pub fn follow(&mut self, window: Window) -> Window {
        self.window = self.clamp(window);
        self.window
    }

    /// Finish a gesture started with [`Viewport::preview`].
    pub fn settle(&mut self) {
        if let Some(start) = self.gesture_start.take() {
            self.record(start);
        }
    }

    fn record(&mut self, previous: Window) {
        if nearly_equal(&previous, &self.window) {
            return;
        }
        let duplicate = self.history.last().map(|w| nearly_equal(w, &previous)).unwrap_or(false);
        if !duplicate {
            self.history.push(previous);
            if self.history.len() > MAX_HISTORY {
                self.history.remove(0);
            }
        }
    }

    /// Return to the previously committed window.
    pub fn back(&mut self) -> Option<Window> {
        self.settle();
        let previous = self.history.pop()?;
        self.window = self.clamp(previous);
        Some(self.window)
    }

    /// Replace the bounds (new clip), resetting the view and its history.
    pub fn set_bounds(&mut self, bounds: Window, initial: Window) {
        self.bounds = bounds;
        self.initial = self.clamp(initial);
        self.window = self.initial;
        self.history.clear();
        self.gesture_start = None;
    }

    fn density_of(&self, window: &Window) -> Option<f64> {
        let tpp = transform::time_per_pixel(window, self.size)?;
        let fpp = transform::freq_per_pixel(window, self.size)?;
        (fpp > 0.0 && tpp > 0.0).then(|| tpp / fpp)
    }

    fn locked_freq_span(&self, time_span: f64) -> Option<f64> {
        let density = self.locked_density?;
        if self.size.is_empty() {
            return None;
        }
        Some(time_span * self.size.height / (self.size.width * density))
    }

    fn locked_time_span(&self, freq_span: f64) -> Option<f64> {
        let density = self.locked_density?;
        if self.size.is_empty() {
            return None;
        }
        Some(freq_span * self.size.width * density / self.size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Window {
        Window::new(Interval::new(0.0, 60.0), Interval::new(0.0, 24000.0))
    }

    fn viewport() -> Viewport {
        let initial = Window::new(Interval::new(0.0, 10.0), Interval::new(0.0, 24000.0));
        let mut vp = Viewport::new(bounds(), initial);
        vp.set_canvas_size(CanvasSize::new(1000.0, 500.0));
        vp
    }

    #[test]
    fn test_oversized_span_is_clamped_to_bounds() {
        let vp = viewport();
        let huge = Window::new(Interval::new(-100.0, 200.0), Interval::new(-5.0, 50000.0));
        assert_eq!(vp.clamp(huge), bounds());
    }

    #[test]
    fn test_translation_shifts_minimum_amount() {
        let vp = viewport();
        let w = vp.pan(-3.0, 0.0);
        assert_eq!(w.time, Interval::new(0.0, 10.0));
        let mut vp = vp;
        vp.commit(Window::new(Interval::new(45.0, 55.0), Interval::new(0.0, 24000.0)));
        let w = vp.pan(20.0, 0.0);
        assert_eq!(w.time, Interval::new(50.0, 60.0));
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let vp = viewport();
        let w = vp.zoom_to(2.0, Some((2.0, 12000.0)));
        assert!((w.time.span() - 5.0).abs() < 1e-9);
        // anchor at 20% of the old window stays at 20% of the new one
        let rel = (2.0 - w.time.min) / w.time.span();
        assert!((rel - 0.2).abs() < 1e-9, "anchor moved to {rel}");
    }

    #[test]
    fn test_zoom_out_past_bounds_stops_at_bounds() {
        let vp = viewport();
        let w = vp.zoom_to(0.01, None);
        assert_eq!(w, bounds());
    }

    #[test]
    fn test_invalid_zoom_factor_is_ignored() {
        let vp = viewport();
        assert_eq!(vp.zoom_to(0.0, None), vp.window());
        assert_eq!(vp.zoom_to(f64::NAN, None), vp.window());
    }

    #[test]
    fn test_center_on_keeps_span() {
        let vp = viewport();
        let w = vp.center_on(30.0);
        assert_eq!(w.time, Interval::new(25.0, 35.0));
        let w = vp.center_on(59.0);
        assert_eq!(w.time, Interval::new(50.0, 60.0));
    }

    #[test]
    fn test_back_restores_previous_window() {
        let mut vp = viewport();
        let first = vp.window();
        let next = vp.center_on(30.0);
        vp.commit(next);
        assert!(vp.can_go_back());
        assert_eq!(vp.back(), Some(first));
        assert_eq!(vp.back(), None);
    }

    #[test]
    fn test_aspect_lock_ties_freq_span_to_time_span() {
        let mut vp = viewport();
        let locked = vp.set_fixed_aspect_ratio(true);
        vp.commit(locked);
        let ratio = vp.window().freq.span() / vp.window().time.span();
        let zoomed = vp.zoom_to(2.0, None);
        vp.commit(zoomed);
        let after = vp.window().freq.span() / vp.window().time.span();
        assert!((ratio - after).abs() < 1e-6, "ratio {ratio} became {after}");
        assert!(vp.fixed_aspect_ratio());
    }

    #[test]
    fn test_pan_pixels_matches_pixel_density() {
        let vp = viewport();
        let w = vp.pan_pixels(100.0, 0.0);
        // 10 s over 1000 px → 100 px is one second
        assert!((w.time.min - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gesture_records_one_history_entry() {
        let mut vp = viewport();
        let start = vp.window();
        for step in 1..=20 {
            let w = vp.pan(step as f64 * 0.5, 0.0);
            vp.preview(w);
        }
        assert!(!vp.can_go_back(), "nothing recorded mid-gesture");
        vp.settle();
        assert_eq!(vp.back(), Some(start));
        assert!(!vp.can_go_back());
    }

    #[test]
    fn test_follow_scroll_leaves_no_history() {
        let mut vp = viewport();
        for time in [12.0, 22.0, 32.0] {
            let w = vp.center_on(time);
            vp.follow(w);
        }
        assert_eq!(vp.window().time, Interval::new(27.0, 37.0));
        vp.settle();
        assert!(!vp.can_go_back(), "playback moves are not navigation");

        // a drag during playback still records where the drag began
        let dragged_from = vp.window();
        let w = vp.pan(5.0, 0.0);
        vp.preview(w);
        let w = vp.center_on(50.0);
        vp.follow(w);
        vp.settle();
        assert_eq!(vp.back(), Some(dragged_from));
    }
}
