//! Ephemeral ruler shared by the spectrogram and waveform canvases.
//!
//! Both canvases publish gesture messages to one [`MeasureBus`] and both
//! draw from it; neither holds a reference to the other. A gesture locks the
//! bus to the canvas it started on until it finishes. A ruler finished on the
//! spectrogram also leaves its time extent highlighted on the waveform until
//! the next measurement starts or measure mode is re-entered.

use serde::{Deserialize, Serialize};

use crate::geometry::LineString;
use crate::surface::{DrawingSurface, Stroke};
use crate::transform;
use crate::types::{CanvasId, Interval, Window};

const RULER_COLOR: &str = "rgba(255, 220, 80, 0.95)";
pub const HIGHLIGHT_COLOR: &str = "rgba(255, 220, 80, 0.18)";
const LABEL_BG: &str = "rgba(0, 0, 0, 0.6)";
const LABEL_FONT: &str = "11px sans-serif";

#[derive(Clone, Debug, PartialEq)]
pub enum MeasureMessage {
    Started { canvas: CanvasId, at: (f64, f64) },
    Moved { canvas: CanvasId, to: (f64, f64) },
    Finished { canvas: CanvasId, at: (f64, f64) },
    Cleared,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Gesture {
    canvas: CanvasId,
    start: (f64, f64),
    current: (f64, f64),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureBus {
    active: Option<Gesture>,
    committed: Option<(CanvasId, LineString)>,
    waveform_highlight: Option<Interval>,
}

impl MeasureBus {
    /// Apply a message. Returns false when it was ignored because another
    /// canvas owns the gesture (or no gesture is running).
    pub fn publish(&mut self, message: MeasureMessage) -> bool {
        match message {
            MeasureMessage::Started { canvas, at } => {
                if self.active.is_some() {
                    return false;
                }
                self.active = Some(Gesture { canvas, start: at, current: at });
                self.committed = None;
                self.waveform_highlight = None;
                true
            }
            MeasureMessage::Moved { canvas, to } => match self.active.as_mut() {
                Some(g) if g.canvas == canvas => {
                    g.current = to;
                    true
                }
                _ => false,
            },
            MeasureMessage::Finished { canvas, at } => {
                let Some(g) = self.active.take_if(|g| g.canvas == canvas) else {
                    return false;
                };
                let line = LineString { points: vec![g.start, at] };
                if canvas == CanvasId::Spectrogram {
                    let t0 = g.start.0.min(at.0);
                    let t1 = g.start.0.max(at.0);
                    self.waveform_highlight = Some(Interval::new(t0, t1));
                }
                self.committed = Some((canvas, line));
                true
            }
            MeasureMessage::Cleared => {
                *self = Self::default();
                true
            }
        }
    }

    pub fn active_canvas(&self) -> Option<CanvasId> {
        self.active.as_ref().map(|g| g.canvas)
    }

    pub fn is_measuring(&self) -> bool {
        self.active.is_some()
    }

    /// The ruler to draw on `canvas`: the gesture in progress, else the last
    /// finished measurement made there.
    pub fn line(&self, canvas: CanvasId) -> Option<LineString> {
        if let Some(g) = self.active.as_ref().filter(|g| g.canvas == canvas) {
            return Some(LineString { points: vec![g.start, g.current] });
        }
        self.committed
            .as_ref()
            .filter(|(c, _)| *c == canvas)
            .map(|(_, line)| line.clone())
    }

    pub fn committed(&self) -> Option<&LineString> {
        self.committed.as_ref().map(|(_, line)| line)
    }

    pub fn waveform_highlight(&self) -> Option<Interval> {
        self.waveform_highlight
    }
}

fn ruler_label(line: &LineString, canvas: CanvasId) -> Option<String> {
    let (a, b) = (line.points.first()?, line.points.last()?);
    let dt_ms = (b.0 - a.0).abs() * 1000.0;
    Some(match canvas {
        CanvasId::Spectrogram => {
            let df_khz = (b.1 - a.1).abs() / 1000.0;
            format!("Δt {:.1} ms  Δf {:.2} kHz", dt_ms, df_khz)
        }
        CanvasId::Waveform => format!("Δt {:.1} ms", dt_ms),
    })
}

/// Paint the projected spectrogram measurement on the waveform. Stays up
/// outside measure mode.
pub fn draw_highlight<S: DrawingSurface>(surface: &mut S, bus: &MeasureBus, window: &Window) {
    let size = surface.size();
    let Some(span) = bus.waveform_highlight() else { return };
    if let (Some(x0), Some(x1)) = (
        transform::time_to_x(span.min, window, size),
        transform::time_to_x(span.max, window, size),
    ) {
        surface.fill_rect(x0, 0.0, (x1 - x0).max(1.0), size.height, HIGHLIGHT_COLOR);
    }
}

/// Draw the bus contents for `canvas`. `window` is that canvas's window
/// (amplitude on the vertical axis for the waveform).
pub fn draw<S: DrawingSurface>(surface: &mut S, bus: &MeasureBus, canvas: CanvasId, window: &Window) {
    let size = surface.size();
    if canvas == CanvasId::Waveform {
        draw_highlight(surface, bus, window);
    }

    let Some(line) = bus.line(canvas) else { return };
    let pixels: Vec<(f64, f64)> = line
        .points
        .iter()
        .filter_map(|&(t, v)| transform::to_pixel(t, v, window, size))
        .collect();
    if pixels.len() < 2 {
        return;
    }
    surface.stroke_path(&pixels, Stroke::dashed(RULER_COLOR, 1.5, &[4.0, 3.0]));
    for &(x, y) in &pixels {
        surface.fill_rect(x - 2.0, y - 2.0, 4.0, 4.0, RULER_COLOR);
    }

    if let Some(label) = ruler_label(&line, canvas) {
        let (x, y) = pixels[pixels.len() - 1];
        let tw = surface.text_width(&label, LABEL_FONT);
        let lx = (x + 6.0).min(size.width - tw - 4.0).max(2.0);
        let ly = (y - 6.0).max(14.0);
        surface.fill_rect(lx - 2.0, ly - 12.0, tw + 4.0, 15.0, LABEL_BG);
        surface.fill_text(&label, lx, ly, LABEL_FONT, RULER_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::recording::RecordingSurface;

    #[test]
    fn test_gesture_locks_to_starting_canvas() {
        let mut bus = MeasureBus::default();
        assert!(bus.publish(MeasureMessage::Started { canvas: CanvasId::Waveform, at: (1.0, 0.0) }));
        assert!(!bus.publish(MeasureMessage::Started { canvas: CanvasId::Spectrogram, at: (2.0, 10.0) }));
        assert!(!bus.publish(MeasureMessage::Moved { canvas: CanvasId::Spectrogram, to: (3.0, 10.0) }));
        assert!(bus.publish(MeasureMessage::Moved { canvas: CanvasId::Waveform, to: (1.5, 0.2) }));
        assert_eq!(bus.active_canvas(), Some(CanvasId::Waveform));
        assert!(!bus.publish(MeasureMessage::Finished { canvas: CanvasId::Spectrogram, at: (3.0, 1.0) }));
        assert!(bus.publish(MeasureMessage::Finished { canvas: CanvasId::Waveform, at: (2.0, 0.5) }));
        assert!(!bus.is_measuring());
        assert_eq!(bus.line(CanvasId::Waveform).unwrap().points, vec![(1.0, 0.0), (2.0, 0.5)]);
        assert!(bus.waveform_highlight().is_none(), "waveform rulers are not projected");
    }

    #[test]
    fn test_spectrogram_ruler_projects_onto_waveform() {
        let mut bus = MeasureBus::default();
        bus.publish(MeasureMessage::Started { canvas: CanvasId::Spectrogram, at: (4.0, 1000.0) });
        bus.publish(MeasureMessage::Finished { canvas: CanvasId::Spectrogram, at: (2.5, 3000.0) });
        assert_eq!(bus.waveform_highlight(), Some(Interval::new(2.5, 4.0)));

        // a new measurement drops the old highlight
        bus.publish(MeasureMessage::Started { canvas: CanvasId::Waveform, at: (0.0, 0.0) });
        assert!(bus.waveform_highlight().is_none());
        assert!(bus.committed().is_none());
    }

    #[test]
    fn test_cleared_resets_everything() {
        let mut bus = MeasureBus::default();
        bus.publish(MeasureMessage::Started { canvas: CanvasId::Spectrogram, at: (1.0, 1.0) });
        bus.publish(MeasureMessage::Finished { canvas: CanvasId::Spectrogram, at: (2.0, 2.0) });
        bus.publish(MeasureMessage::Cleared);
        assert_eq!(bus, MeasureBus::default());
    }

    #[test]
    fn test_draw_waveform_highlight_and_label() {
        let mut bus = MeasureBus::default();
        bus.publish(MeasureMessage::Started { canvas: CanvasId::Spectrogram, at: (2.0, 1000.0) });
        bus.publish(MeasureMessage::Finished { canvas: CanvasId::Spectrogram, at: (4.0, 3000.0) });

        let window = Window::waveform(Interval::new(0.0, 10.0));
        let mut wave = RecordingSurface::new(100.0, 50.0);
        draw(&mut wave, &bus, CanvasId::Waveform, &window);
        assert_eq!(wave.first_with(HIGHLIGHT_COLOR), Some(0));
        assert!(wave.texts().is_empty(), "no ruler on the waveform");

        let spec = Window::new(Interval::new(0.0, 10.0), Interval::new(0.0, 10000.0));
        let mut surface = RecordingSurface::new(100.0, 50.0);
        draw(&mut surface, &bus, CanvasId::Spectrogram, &spec);
        assert_eq!(surface.texts(), vec!["Δt 2000.0 ms  Δf 2.00 kHz"]);
    }
}
