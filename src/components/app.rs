use leptos::prelude::*;
use sonomark_core::CanvasId;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::audio::{loader, playback};
use crate::canvas::tile_loader;
use crate::components::annotator::AnnotatorCanvas;
use crate::components::toolbar::Toolbar;
use crate::interaction;
use crate::state::AppState;

/// `?recording=<id>&audio=<url>` from the page address.
fn recording_from_location() -> Option<(String, String)> {
    let search = web_sys::window()?.location().search().ok()?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
    let audio = params.get("audio")?;
    let id = params.get("recording").unwrap_or_else(|| audio.clone());
    Some((id, audio))
}

/// Keys typed into form fields belong to the field.
fn typing_in_field(ev: &web_sys::KeyboardEvent) -> bool {
    ev.target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .map(|el| matches!(el.tag_name().as_str(), "INPUT" | "SELECT" | "TEXTAREA"))
        .unwrap_or(false)
}

#[component]
pub fn App() -> impl IntoView {
    let state = AppState::new();
    provide_context(state);

    state.config.with_untracked(|c| tile_loader::configure(&c.tile_url, c.tile_cache_capacity));

    let keys = window_event_listener(leptos::ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if ev.ctrl_key() || ev.meta_key() || ev.alt_key() || typing_in_field(&ev) {
            return;
        }
        let Some(command) = state.config.with_untracked(|c| c.keys.command(&ev.key())) else {
            return;
        };
        ev.prevent_default();
        interaction::run_command(state, command);
    });
    on_cleanup(move || keys.remove());

    match recording_from_location() {
        Some((id, audio_url)) => {
            playback::attach(&audio_url);
            spawn_local(async move {
                match loader::load_recording(id, audio_url).await {
                    Ok(recording) => state.open_recording(recording),
                    Err(e) => {
                        log::error!("Failed to load recording: {e}");
                        state.load_error.set(Some(e));
                    }
                }
            });
        }
        None => state.load_error.set(Some("Open this page with ?audio=<url>&recording=<id>".into())),
    }

    view! {
        <div class="app">
            <MainArea />
        </div>
    }
}

#[component]
fn MainArea() -> impl IntoView {
    let state = expect_context::<AppState>();
    let has_recording = move || state.recording.with(|r| r.is_some());

    view! {
        <div class="main">
            <Toolbar />
            {move || {
                if has_recording() {
                    view! {
                        <AnnotatorCanvas canvas=CanvasId::Spectrogram />
                        <AnnotatorCanvas canvas=CanvasId::Waveform />
                        <StatusBar />
                    }.into_any()
                } else {
                    let message = state.load_error.get().unwrap_or_else(|| "Loading recording…".into());
                    view! {
                        <div class="empty-state">{message}</div>
                    }.into_any()
                }
            }}
        </div>
    }
}

#[component]
fn StatusBar() -> impl IntoView {
    let state = expect_context::<AppState>();

    let selection = move || {
        let selected = state.engine.with(|e| e.selected)?;
        state.annotations.with(|list| {
            let a = list.iter().find(|a| a.id == selected)?;
            let range = a.geometry.time_range();
            let tags: Vec<String> = a.tags.iter().map(|t| t.label()).collect();
            Some(format!(
                "{} {} {:.3}–{:.3}s {}",
                a.id,
                a.geometry.kind(),
                range.min,
                range.max,
                tags.join(", ")
            ))
        })
    };

    view! {
        <div class="analysis-panel">
            <span class="status-mode">{move || state.engine.with(|e| e.mode.to_string())}</span>
            <span>{move || selection().unwrap_or_else(|| "No selection".into())}</span>
            {move || state.status.get().map(|msg| view! { <span class="status-error">{msg}</span> })}
        </div>
    }
}
