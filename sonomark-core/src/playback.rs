//! Playback onset marker and follow-scrolling.

use crate::surface::{DrawingSurface, Stroke};
use crate::transform;
use crate::types::{CanvasSize, Window};

pub const MARKER_COLOR: &str = "rgba(255, 80, 80, 0.9)";

/// Last known playback position, fed from the audio element's clock.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackSync {
    time: f64,
    playing: bool,
}

impl PlaybackSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_time(&mut self, time: f64) {
        if time.is_finite() {
            self.time = time.max(0.0);
        }
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Horizontal position of the marker, `None` when it is off screen.
    pub fn marker_x(&self, window: &Window, width: f64) -> Option<f64> {
        if !window.time.contains(self.time) {
            return None;
        }
        let size = CanvasSize::new(width, 1.0);
        transform::time_to_x(self.time, window, size)
    }

    /// Time to center the view on so the marker stays visible. Only while
    /// playing with auto-scroll on; a paused marker never moves the view.
    pub fn follow(&self, window: &Window, auto_scroll: bool) -> Option<f64> {
        (self.playing && auto_scroll && !window.time.contains(self.time)).then_some(self.time)
    }

    pub fn draw<S: DrawingSurface>(&self, surface: &mut S, window: &Window) {
        let size = surface.size();
        let Some(x) = self.marker_x(window, size.width) else { return };
        surface.line(x, 0.0, x, size.height, Stroke::solid(MARKER_COLOR, 2.0));
    }
}
