use leptos::prelude::*;
use sonomark_core::compose::{self, BaseLayer, Frame, LoadStatus};
use sonomark_core::{transform, CanvasId, Event, Mode, Scene};
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::audio::playback;
use crate::canvas::tile_loader;
use crate::canvas::web_surface::WebSurface;
use sonomark_core::surface::DrawingSurface;
use crate::interaction;
use crate::state::AppState;

fn cursor_for(mode: Mode, status: LoadStatus) -> &'static str {
    match (status, mode) {
        (LoadStatus::Failed, _) => "not-allowed",
        (LoadStatus::Loading, _) => "progress",
        (_, Mode::Idle) => "grab",
        (_, Mode::Draw | Mode::Measure) => "crosshair",
        (_, Mode::Delete | Mode::Select) => "pointer",
        (_, Mode::Edit) => "default",
    }
}

fn pointer_position(ev: &web_sys::MouseEvent) -> (f64, f64) {
    (ev.offset_x() as f64, ev.offset_y() as f64)
}

/// One of the two synchronized canvases: the tiled spectrogram or the
/// waveform underneath it.
#[component]
pub fn AnnotatorCanvas(canvas: CanvasId) -> impl IntoView {
    let state = expect_context::<AppState>();
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let size_signal = match canvas {
        CanvasId::Spectrogram => state.spectrogram_size,
        CanvasId::Waveform => state.waveform_size,
    };

    // Fetch the tiles of the visible window whenever it or the parameters change
    if canvas == CanvasId::Spectrogram {
        Effect::new(move || {
            let window = state.viewport.with(|vp| vp.window());
            let parameters = state.parameters.get();
            let prefetch = state.config.with(|c| c.prefetch_neighbours);
            state.recording.with(|rec| {
                if let Some(rec) = rec {
                    let limit = rec.bounds().time;
                    tile_loader::request_visible(state, &rec.id, window, limit, &parameters, prefetch);
                }
            });
        });
    }

    // Redraw on any change that shows up on screen
    Effect::new(move || {
        state.tile_ready_signal.track();
        let (window, bounds) = state.viewport.with(|vp| (vp.window(), vp.bounds()));
        let engine = state.engine.get();
        let playback = state.playback.get();
        let settings = state.settings.get();
        let parameters = state.parameters.get();

        let Some(canvas_el) = canvas_ref.get() else { return };
        let canvas_el: &HtmlCanvasElement = canvas_el.as_ref();
        let Some(mut surface) = WebSurface::attach(canvas_el) else { return };

        let size = surface.size();
        if size_signal.get_untracked() != size {
            size_signal.set(size);
            if canvas == CanvasId::Spectrogram {
                state.viewport.update(|vp| {
                    vp.set_canvas_size(size);
                    if settings.fixed_aspect_ratio() && !vp.fixed_aspect_ratio() {
                        let locked = vp.set_fixed_aspect_ratio(true);
                        vp.preview(locked);
                    }
                });
            }
        }
        let (spectrogram_size, waveform_size) = match canvas {
            CanvasId::Spectrogram => (size, state.waveform_size.get_untracked()),
            CanvasId::Waveform => (state.spectrogram_size.get_untracked(), size),
        };

        let status = state.recording.with(|rec| {
            let Some(rec) = rec else {
                surface.fill_rect(0.0, 0.0, size.width, size.height, "#000");
                return LoadStatus::Loading;
            };
            state.config.with(|config| {
                state.annotations.with(|annotations| {
                    let scene = Scene { annotations, window, bounds, spectrogram_size, waveform_size, config };
                    match canvas {
                        CanvasId::Spectrogram => {
                            let bounds = rec.bounds();
                            let requests = tile_loader::requests_for(&rec.id, &window, bounds.time, &parameters);
                            tile_loader::with_tiles(&requests, bounds.freq, |slots| {
                                let base = BaseLayer::Spectrogram(slots);
                                let status = base.status();
                                let frame = Frame {
                                    canvas,
                                    base,
                                    playback: &playback,
                                    state: &engine,
                                    scene: &scene,
                                    settings: &settings,
                                };
                                compose::compose(&mut surface, &frame);
                                status
                            })
                        }
                        CanvasId::Waveform => {
                            let frame = Frame {
                                canvas,
                                base: BaseLayer::Waveform { samples: &rec.samples, sample_rate: rec.sample_rate },
                                playback: &playback,
                                state: &engine,
                                scene: &scene,
                                settings: &settings,
                            };
                            compose::compose(&mut surface, &frame);
                            LoadStatus::Ready
                        }
                    }
                })
            })
        });

        let _ = web_sys::HtmlElement::style(&canvas_el).set_property("cursor", cursor_for(engine.mode, status));
    });

    let on_pointerdown = move |ev: web_sys::PointerEvent| {
        if ev.button() != 0 {
            return;
        }
        ev.prevent_default();
        if let Some(target) = ev.target().and_then(|t| t.dyn_into::<web_sys::Element>().ok()) {
            let _ = target.set_pointer_capture(ev.pointer_id());
        }
        let (x, y) = pointer_position(&ev);
        interaction::send(state, Event::PointerDown { canvas, x, y });
    };

    let on_pointermove = move |ev: web_sys::PointerEvent| {
        let (x, y) = pointer_position(&ev);
        interaction::send(state, Event::PointerMove { canvas, x, y });
    };

    let on_pointerup = move |ev: web_sys::PointerEvent| {
        let (x, y) = pointer_position(&ev);
        interaction::send(state, Event::PointerUp { canvas, x, y });
    };

    let on_pointerleave = move |_: web_sys::PointerEvent| {
        interaction::send(state, Event::PointerLeave { canvas });
    };

    // Wheel: ctrl/meta zooms around the pointer, shift pans frequency,
    // plain scrolling pans time.
    let on_wheel = move |ev: web_sys::WheelEvent| {
        ev.prevent_default();
        let (x, y) = pointer_position(&ev);
        if ev.ctrl_key() || ev.meta_key() {
            let step = state.config.with_untracked(|c| c.zoom_step);
            let factor = if ev.delta_y() < 0.0 { step } else { 1.0 / step };
            let window = state.window();
            let anchor = transform::to_domain(x, y, &window, size_signal.get_untracked()).map(|(t, f)| match canvas {
                CanvasId::Spectrogram => (t, f),
                CanvasId::Waveform => (t, window.freq.center()),
            });
            interaction::zoom(state, factor, anchor, true);
        } else if ev.shift_key() && canvas == CanvasId::Spectrogram {
            interaction::pan_pixels(state, 0.0, ev.delta_y());
        } else {
            interaction::pan_pixels(state, ev.delta_x() + ev.delta_y(), 0.0);
        }
    };

    // Double-click moves the playback marker
    let on_dblclick = move |ev: web_sys::MouseEvent| {
        let (x, y) = pointer_position(&ev);
        if let Some((time, _)) = transform::to_domain(x, y, &state.window(), size_signal.get_untracked()) {
            playback::seek(&state, time);
        }
    };

    let class = match canvas {
        CanvasId::Spectrogram => "spectrogram-container",
        CanvasId::Waveform => "waveform-container",
    };

    view! {
        <div class=class>
            <canvas
                node_ref=canvas_ref
                on:pointerdown=on_pointerdown
                on:pointermove=on_pointermove
                on:pointerup=on_pointerup
                on:pointerleave=on_pointerleave
                on:wheel=on_wheel
                on:dblclick=on_dblclick
            />
        </div>
    }
}

