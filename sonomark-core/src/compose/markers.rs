use crate::surface::{DrawingSurface, Stroke};
use crate::types::Window;

// ── Time scale ────────────────────────────────────────────────────────────

/// Nice 1-2-5 progression of tick intervals in seconds, from 0.1 ms to 10 min.
const TICK_INTERVALS: &[f64] = &[
    0.0001, 0.0002, 0.0005,         // sub-ms
    0.001, 0.002, 0.005,             // 1–5 ms
    0.01, 0.02, 0.05,               // 10–50 ms
    0.1, 0.2, 0.5,                  // 100–500 ms
    1.0, 2.0, 5.0,                  // 1–5 s
    10.0, 30.0, 60.0,               // 10 s – 1 min
    120.0, 300.0, 600.0,            // 2–10 min
];

/// Frequency steps in Hz, for labels at least 40 px apart.
const FREQ_INTERVALS: &[f64] = &[
    10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0, 50000.0,
];

const LABEL_FONT: &str = "10px sans-serif";
const LABEL_BG: &str = "rgba(0,0,0,0.6)";
const LABEL_FG: &str = "rgba(255,255,255,0.7)";
const MAJOR_TICK: &str = "rgba(255,255,255,0.35)";
const MINOR_TICK: &str = "rgba(255,255,255,0.15)";
const TOP_TICK: &str = "rgba(255,255,255,0.10)";

/// Format a time value as a compact label whose precision matches the tick interval.
pub fn format_time_label(seconds: f64, interval: f64) -> String {
    if interval < 0.001 {
        format!("{:.1}ms", seconds * 1000.0)
    } else if interval < 1.0 {
        let ms = seconds * 1000.0;
        if interval >= 0.01 {
            format!("{:.0}ms", ms)
        } else {
            format!("{:.1}ms", ms)
        }
    } else if interval < 60.0 {
        if (seconds - seconds.round()).abs() < 0.001 {
            format!("{:.0}s", seconds)
        } else {
            format!("{:.1}s", seconds)
        }
    } else {
        let mins = (seconds / 60.0).floor() as u32;
        let secs = (seconds % 60.0).round() as u32;
        if secs == 0 {
            format!("{}m", mins)
        } else {
            format!("{}m{:02}s", mins, secs)
        }
    }
}

pub fn format_freq_label(hz: f64, interval: f64) -> String {
    if interval >= 1000.0 {
        format!("{:.0}k", hz / 1000.0)
    } else if hz >= 1000.0 {
        format!("{:.1}k", hz / 1000.0)
    } else {
        format!("{:.0}", hz)
    }
}

fn pick(intervals: &[f64], min_interval: f64) -> f64 {
    intervals
        .iter()
        .copied()
        .find(|&i| i >= min_interval)
        .unwrap_or(intervals[intervals.len() - 1])
}

/// Draw time tick marks and labels along the bottom of a canvas.
pub fn draw_time_markers<S: DrawingSurface>(surface: &mut S, window: &Window) {
    let size = surface.size();
    let visible_time = window.time.span();
    if !(visible_time > 0.0) || size.width <= 0.0 {
        return;
    }
    let (w, h) = (size.width, size.height);
    let start = window.time.min;
    let px_per_sec = w / visible_time;

    // smallest nice interval that keeps labels ≥100 px apart
    let interval = pick(TICK_INTERVALS, 100.0 / px_per_sec);
    let end_time = window.time.max;

    // ── Minor ticks (no labels) ──
    let minor_interval = interval / 5.0;
    if minor_interval * px_per_sec >= 4.0 {
        let mut t = (start / minor_interval).ceil() * minor_interval;
        while t <= end_time + minor_interval * 0.5 {
            let on_major = ((t / interval).round() * interval - t).abs() < minor_interval * 0.01;
            let x = (t - start) * px_per_sec;
            if !on_major && x >= 0.0 && x <= w {
                surface.line(x, h - 6.0, x, h, Stroke::solid(MINOR_TICK, 1.0));
            }
            t += minor_interval;
        }
    }

    // ── Major ticks + labels ──
    let tick_h = 12.0;
    let mut t = (start / interval).ceil() * interval;
    while t <= end_time + interval * 0.01 {
        let x = (t - start) * px_per_sec;
        if x >= 0.0 && x <= w {
            surface.line(x, h - tick_h, x, h, Stroke::solid(MAJOR_TICK, 1.0));
            surface.line(x, 0.0, x, 4.0, Stroke::solid(TOP_TICK, 1.0));

            let label = format_time_label(t, interval);
            let tw = surface.text_width(&label, LABEL_FONT);
            let lx = x + 3.0;
            if lx + tw < w - 2.0 {
                surface.fill_rect(lx - 1.0, h - tick_h - 12.0, tw + 2.0, 12.0, LABEL_BG);
                surface.fill_text(&label, lx, h - tick_h - 1.0, LABEL_FONT, LABEL_FG);
            }
        }
        t += interval;
    }
}

/// Draw frequency ticks and labels along the left edge.
pub fn draw_freq_markers<S: DrawingSurface>(surface: &mut S, window: &Window) {
    let size = surface.size();
    let span = window.freq.span();
    if !(span > 0.0) || size.height <= 0.0 {
        return;
    }
    let px_per_hz = size.height / span;
    let interval = pick(FREQ_INTERVALS, 40.0 / px_per_hz);

    let mut f = (window.freq.min / interval).ceil() * interval;
    while f <= window.freq.max {
        let y = (window.freq.max - f) * px_per_hz;
        if y >= 12.0 && y <= size.height - 2.0 {
            surface.line(0.0, y, 8.0, y, Stroke::solid(MAJOR_TICK, 1.0));
            let label = format_freq_label(f, interval);
            let tw = surface.text_width(&label, LABEL_FONT);
            surface.fill_rect(9.0, y - 11.0, tw + 2.0, 12.0, LABEL_BG);
            surface.fill_text(&label, 10.0, y - 1.0, LABEL_FONT, LABEL_FG);
        }
        f += interval;
    }
}
