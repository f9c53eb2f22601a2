use std::cell::RefCell;

use leptos::prelude::*;
use web_sys::HtmlAudioElement;

use crate::state::AppState;

thread_local! {
    static AUDIO: RefCell<Option<HtmlAudioElement>> = const { RefCell::new(None) };
}

/// Point the shared audio element at a new clip.
pub fn attach(url: &str) {
    let element = match HtmlAudioElement::new_with_src(url) {
        Ok(el) => el,
        Err(e) => {
            log::error!("Failed to create audio element: {e:?}");
            return;
        }
    };
    element.set_preload("auto");
    AUDIO.with(|a| {
        if let Some(old) = a.borrow_mut().replace(element) {
            let _ = old.pause();
        }
    });
}

fn current_time() -> Option<f64> {
    AUDIO.with(|a| a.borrow().as_ref().map(|el| el.current_time()))
}

fn has_ended() -> bool {
    AUDIO.with(|a| a.borrow().as_ref().map(|el| el.ended()).unwrap_or(true))
}

/// Start playing from the marker position.
pub fn play(state: &AppState) {
    let from = state.playback.with_untracked(|p| p.time());
    let started = AUDIO.with(|a| {
        let audio = a.borrow();
        let Some(el) = audio.as_ref() else { return false };
        el.set_current_time(from);
        match el.play() {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to start playback: {e:?}");
                false
            }
        }
    });
    if started {
        state.playback.update(|p| p.play());
        let st = *state;
        request_animation_frame(move || tick(st));
    }
}

pub fn pause(state: &AppState) {
    AUDIO.with(|a| {
        if let Some(el) = a.borrow().as_ref() {
            let _ = el.pause();
        }
    });
    if let Some(t) = current_time() {
        state.playback.update(|p| p.set_time(t));
    }
    state.playback.update(|p| p.pause());
}

pub fn toggle(state: &AppState) {
    if state.playback.with_untracked(|p| p.is_playing()) {
        pause(state);
    } else {
        play(state);
    }
}

/// Move the marker while paused (click on the time axis).
pub fn seek(state: &AppState, time: f64) {
    state.playback.update(|p| p.set_time(time));
    AUDIO.with(|a| {
        if let Some(el) = a.borrow().as_ref() {
            el.set_current_time(time);
        }
    });
}

/// Per-frame update while playing: copy the clock into the marker and keep
/// it in view when auto-scroll is on.
fn tick(state: AppState) {
    if !state.playback.with_untracked(|p| p.is_playing()) {
        return;
    }
    if let Some(t) = current_time() {
        state.playback.update(|p| p.set_time(t));
    }
    if has_ended() {
        state.playback.update(|p| p.pause());
        return;
    }

    let auto_scroll = state.settings.with_untracked(|s| s.auto_scroll());
    let window = state.window();
    if let Some(time) = state.playback.with_untracked(|p| p.follow(&window, auto_scroll)) {
        state.viewport.update(|vp| {
            let next = vp.center_on(time);
            vp.follow(next);
        });
    }
    request_animation_frame(move || tick(state));
}
