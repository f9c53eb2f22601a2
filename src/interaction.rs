//! Runs engine transitions against the app state and executes their effects.

use leptos::prelude::*;
use sonomark_core::keys::Command;
use sonomark_core::mutation::dispatch;
use sonomark_core::{transition, Effect, Event, Scene, Transition};
use wasm_bindgen_futures::spawn_local;

use crate::audio::playback;
use crate::state::{annotation_store, AppState};

/// Feed one event through the engine.
pub fn send(state: AppState, event: Event) {
    let ends_gesture = matches!(event, Event::PointerUp { .. } | Event::PointerLeave { .. } | Event::Abort);
    let (window, bounds) = state.viewport.with_untracked(|vp| (vp.window(), vp.bounds()));
    let spectrogram_size = state.spectrogram_size.get_untracked();
    let waveform_size = state.waveform_size.get_untracked();

    let result = state.config.with_untracked(|config| {
        state.annotations.with_untracked(|annotations| {
            let scene = Scene { annotations, window, bounds, spectrogram_size, waveform_size, config };
            state.engine.with_untracked(|engine| transition(engine, event, &scene))
        })
    });

    match result {
        Ok(Transition { state: next, effects }) => {
            if state.engine.with_untracked(|current| *current != next) {
                state.engine.set(next);
            }
            for effect in effects {
                apply(state, effect);
            }
        }
        Err(e) => log::debug!("Input rejected: {e}"),
    }

    if ends_gesture {
        state.viewport.update(|vp| vp.settle());
    }
}

fn apply(state: AppState, effect: Effect) {
    match effect {
        Effect::CenterOn { time } => state.viewport.update(|vp| {
            let next = vp.center_on(time);
            vp.commit(next);
        }),
        Effect::SetWindow(window) => state.viewport.update(|vp| {
            vp.preview(window);
        }),
        Effect::Select(id) => log::debug!("Selected annotation {id}"),
        Effect::Deselect => log::debug!("Selection cleared"),
        mutation => {
            let store = annotation_store();
            spawn_local(async move {
                let Some(event) = dispatch(&*store, mutation).await else { return };
                record(state, &event);
                send(state, event);
            });
        }
    }
}

/// Mirror a collaborator answer into the annotation list the canvases draw.
fn record(state: AppState, event: &Event) {
    match event {
        Event::Created(annotation) => {
            state.annotations.update(|list| list.push(annotation.clone()));
            state.status.set(None);
        }
        Event::Updated(annotation) => {
            state.annotations.update(|list| {
                if let Some(slot) = list.iter_mut().find(|a| a.id == annotation.id) {
                    *slot = annotation.clone();
                }
            });
            state.status.set(None);
        }
        Event::Deleted(id) => {
            state.annotations.update(|list| list.retain(|a| a.id != *id));
            state.status.set(None);
        }
        Event::MutationFailed(message) => state.status.set(Some(message.clone())),
        _ => {}
    }
}

/// Zoom the spectrogram view; `anchor` is a `(time, freq)` point that stays
/// put. Wheel zoom previews, key zoom commits.
pub fn zoom(state: AppState, factor: f64, anchor: Option<(f64, f64)>, continuous: bool) {
    state.viewport.update(|vp| {
        let next = vp.zoom_to(factor, anchor);
        if continuous {
            vp.preview(next);
        } else {
            vp.commit(next);
        }
    });
}

/// Pan by canvas pixels (wheel scrolling).
pub fn pan_pixels(state: AppState, dx: f64, dy: f64) {
    state.viewport.update(|vp| {
        let next = vp.pan_pixels(dx, dy);
        vp.preview(next);
    });
}

pub fn run_command(state: AppState, command: Command) {
    let step = state.config.with_untracked(|c| c.zoom_step);
    state.viewport.update(|vp| vp.settle());
    let disabled = state.engine.with_untracked(|e| e.disabled);
    if let Some(event) = command.engine_event(disabled) {
        send(state, event);
        return;
    }
    match command {
        Command::Select | Command::Draw | Command::Edit | Command::Delete | Command::Measure => {
            log::debug!("Ignoring {command:?} while annotation is locked");
        }
        Command::Abort | Command::Next | Command::Previous | Command::DeleteSelected => {}
        Command::Back => state.viewport.update(|vp| {
            vp.back();
        }),
        Command::TogglePlay => playback::toggle(&state),
        Command::ZoomIn => zoom(state, step, None, false),
        Command::ZoomOut => zoom(state, 1.0 / step, None, false),
    }
}
