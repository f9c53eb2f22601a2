use crate::surface::{DrawingSurface, Stroke};
use crate::types::Interval;

const BACKGROUND: &str = "#0a0a0a";
const CENTER_LINE: &str = "#333";
pub const WAVE_COLOR: &str = "#6a6";

/// Draw the waveform for the visible time range.
/// Uses min/max envelope at low zoom, individual samples at high zoom.
pub fn draw_waveform<S: DrawingSurface>(surface: &mut S, samples: &[f32], sample_rate: u32, time: Interval) {
    let size = surface.size();
    let (canvas_width, canvas_height) = (size.width, size.height);
    surface.fill_rect(0.0, 0.0, canvas_width, canvas_height, BACKGROUND);

    let visible_time = time.span();
    if samples.is_empty() || sample_rate == 0 || !(visible_time > 0.0) || canvas_width <= 0.0 {
        return;
    }

    let mid_y = canvas_height / 2.0;
    let start_time = time.min;
    let px_per_sec = canvas_width / visible_time;
    let rate = sample_rate as f64;

    surface.line(0.0, mid_y, canvas_width, mid_y, Stroke::solid(CENTER_LINE, 1.0));

    let samples_per_pixel = (visible_time * rate) / canvas_width;
    let amp_to_y = |s: f32| mid_y - (s as f64 * mid_y * 0.9);

    if samples_per_pixel <= 2.0 {
        // High zoom: individual samples as one connected line
        let mut points = Vec::with_capacity(canvas_width as usize);
        for px in 0..(canvas_width as usize) {
            let t = start_time + (px as f64 / px_per_sec);
            if t < 0.0 {
                continue;
            }
            let idx = (t * rate) as usize;
            let Some(&s) = samples.get(idx) else { break };
            points.push((px as f64, amp_to_y(s)));
        }
        if points.len() >= 2 {
            surface.stroke_path(&points, Stroke::solid(WAVE_COLOR, 1.0));
        }
    } else {
        // Low zoom: min/max envelope per pixel column
        for px in 0..(canvas_width as usize) {
            let t0 = start_time + (px as f64 / px_per_sec);
            let t1 = start_time + ((px as f64 + 1.0) / px_per_sec);
            if t1 <= 0.0 {
                continue;
            }
            let i0 = ((t0.max(0.0) * rate) as usize).min(samples.len());
            let i1 = ((t1 * rate) as usize).min(samples.len());
            if i0 >= i1 {
                break;
            }

            let (min_val, max_val) = samples[i0..i1]
                .iter()
                .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));

            surface.line(px as f64, amp_to_y(max_val), px as f64, amp_to_y(min_val), Stroke::solid(WAVE_COLOR, 1.0));
        }
    }
}
