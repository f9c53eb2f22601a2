//! Property tests for the window model and coordinate transform.
//!
//! 1. **Round-trip**: `to_pixel(to_domain(p))` returns `p` for any pixel in
//!    the canvas, any non-degenerate window and any canvas size.
//! 2. **Clamping**: every window a navigation operation returns lies inside
//!    the bounds on both axes.
//! 3. **Cycling**: repeated `SelectNext` visits every visible annotation in
//!    time order and wraps.

use proptest::prelude::*;
use sonomark_core::geometry::{BoundingBox, Geometry, TimeInterval};
use sonomark_core::{
    transform, transition, AnnotationId, CanvasSize, EngineConfig, EngineState, Event, Interval, Scene,
    SoundEventAnnotation, Viewport, Window,
};

// ── Strategies ──────────────────────────────────────────────────────────

fn interval_strategy(lo: f64, hi: f64) -> impl Strategy<Value = Interval> {
    (lo..hi, 1e-3..(hi - lo)).prop_map(|(min, span)| Interval::new(min, min + span))
}

fn window_strategy() -> impl Strategy<Value = Window> {
    (interval_strategy(0.0, 3600.0), interval_strategy(0.0, 250_000.0))
        .prop_map(|(time, freq)| Window::new(time, freq))
}

fn size_strategy() -> impl Strategy<Value = CanvasSize> {
    (1.0f64..4000.0, 1.0f64..4000.0).prop_map(|(w, h)| CanvasSize::new(w, h))
}

#[derive(Debug, Clone)]
enum Nav {
    Zoom(f64, f64, f64),
    Pan(f64, f64),
    Center(f64),
    Drag(Window),
    Reset,
}

fn nav_strategy() -> impl Strategy<Value = Nav> {
    prop_oneof![
        (0.01f64..100.0, -100.0f64..200.0, -1e5f64..1e5).prop_map(|(f, t, q)| Nav::Zoom(f, t, q)),
        (-500.0f64..500.0, -1e5f64..1e5).prop_map(|(dt, df)| Nav::Pan(dt, df)),
        (-500.0f64..500.0).prop_map(Nav::Center),
        (interval_strategy(-200.0, 400.0), interval_strategy(-1e5, 1e5))
            .prop_map(|(t, f)| Nav::Drag(Window::new(t, f))),
        Just(Nav::Reset),
    ]
}

fn within(window: &Window, bounds: &Window) -> bool {
    let eps = 1e-9 * (1.0 + bounds.time.span().abs() + bounds.freq.span().abs());
    window.time.min >= bounds.time.min - eps
        && window.time.max <= bounds.time.max + eps
        && window.freq.min >= bounds.freq.min - eps
        && window.freq.max <= bounds.freq.max + eps
}

// ═══════════════════════════════════════════════════════════════════════════
// 1. Pixel → domain → pixel is the identity
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn pixel_round_trip(
        window in window_strategy(),
        size in size_strategy(),
        rx in 0.0f64..=1.0,
        ry in 0.0f64..=1.0,
    ) {
        let (x, y) = (rx * size.width, ry * size.height);
        let (t, f) = transform::to_domain(x, y, &window, size).unwrap();
        let (x2, y2) = transform::to_pixel(t, f, &window, size).unwrap();
        let tol_x = 1e-6 * size.width.max(1.0);
        let tol_y = 1e-6 * size.height.max(1.0);
        prop_assert!((x2 - x).abs() <= tol_x, "x drifted: {} → {}", x, x2);
        prop_assert!((y2 - y).abs() <= tol_y, "y drifted: {} → {}", y, y2);
    }

    #[test]
    fn degenerate_canvas_maps_nowhere(window in window_strategy(), w in 0.0f64..10.0) {
        prop_assert!(transform::to_pixel(1.0, 1.0, &window, CanvasSize::new(w, 0.0)).is_none());
        prop_assert!(transform::to_domain(1.0, 1.0, &window, CanvasSize::new(0.0, w)).is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 2. Navigation never leaves the bounds
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn navigation_stays_in_bounds(
        duration in 0.5f64..600.0,
        nyquist in 1000.0f64..200_000.0,
        size in size_strategy(),
        locked in any::<bool>(),
        ops in prop::collection::vec(nav_strategy(), 1..20),
    ) {
        let bounds = Window::new(Interval::new(0.0, duration), Interval::new(0.0, nyquist));
        let initial = Window::new(Interval::new(0.0, duration.min(10.0)), bounds.freq);
        let mut vp = Viewport::new(bounds, initial);
        vp.set_canvas_size(size);
        if locked {
            vp.set_fixed_aspect_ratio(true);
        }
        for op in ops {
            let next = match op {
                Nav::Zoom(f, t, q) => vp.zoom_to(f, Some((t, q))),
                Nav::Pan(dt, df) => vp.pan(dt, df),
                Nav::Center(t) => vp.center_on(t),
                Nav::Drag(w) => vp.drag_to(w),
                Nav::Reset => vp.reset(),
            };
            prop_assert!(within(&next, &bounds), "{:?} escaped {:?}", next, bounds);
            prop_assert!(next.is_ordered());
            vp.commit(next);
            prop_assert!(within(&vp.window(), &bounds));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 3. Next-cycling is a rotation through the time-sorted annotations
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn select_next_cycles_in_time_order(starts in prop::collection::vec(0.0f64..9.0, 1..12)) {
        let annotations: Vec<SoundEventAnnotation> = starts
            .iter()
            .enumerate()
            .map(|(i, &t)| SoundEventAnnotation {
                id: AnnotationId(i as u64),
                geometry: if i % 2 == 0 {
                    Geometry::TimeInterval(TimeInterval { start: t, end: t + 0.5 })
                } else {
                    Geometry::BoundingBox(BoundingBox { time_min: t, freq_min: 100.0, time_max: t + 0.5, freq_max: 900.0 })
                },
                tags: vec![],
                features: vec![],
                created_by: None,
            })
            .collect();
        let config = EngineConfig::default();
        let scene = Scene {
            annotations: &annotations,
            window: Window::new(Interval::new(0.0, 10.0), Interval::new(0.0, 1000.0)),
            bounds: Window::new(Interval::new(0.0, 10.0), Interval::new(0.0, 1000.0)),
            spectrogram_size: CanvasSize::new(800.0, 400.0),
            waveform_size: CanvasSize::new(800.0, 100.0),
            config: &config,
        };

        let mut expected: Vec<&SoundEventAnnotation> = annotations.iter().collect();
        expected.sort_by(|a, b| {
            a.geometry.start_coordinate().total_cmp(&b.geometry.start_coordinate()).then(a.id.cmp(&b.id))
        });

        let mut state = EngineState::default();
        for round in 0..(expected.len() * 2) {
            state = transition(&state, Event::SelectNext, &scene).unwrap().state;
            prop_assert_eq!(state.selected, Some(expected[round % expected.len()].id));
        }
    }
}
