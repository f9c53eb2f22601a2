use std::rc::Rc;
use std::sync::Arc;

use leptos::prelude::*;
use sonomark_core::mutation::MemoryStore;
use sonomark_core::playback::PlaybackSync;
use sonomark_core::types::SpectrogramParameters;
use sonomark_core::{
    CanvasSize, DisplaySettings, EngineConfig, EngineState, Interval, SoundEventAnnotation, Viewport, Window,
};

use crate::canvas::tile_loader;

/// localStorage key holding an optional JSON [`EngineConfig`].
pub const CONFIG_KEY: &str = "sonomark.config";

/// The clip being annotated. Samples are the first channel, decoded in the
/// browser for the waveform; the spectrogram comes from the tile service.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    pub id: String,
    pub audio_url: String,
    pub duration: f64,
    pub sample_rate: u32,
    pub samples: Arc<Vec<f32>>,
}

impl Recording {
    pub fn bounds(&self) -> Window {
        Window::for_clip(self.duration, self.sample_rate)
    }

    /// Window shown when the clip opens: the first ten seconds, full band.
    pub fn initial_window(&self) -> Window {
        let bounds = self.bounds();
        Window::new(Interval::new(0.0, self.duration.min(10.0)), bounds.freq)
    }
}

thread_local! {
    static STORE: Rc<MemoryStore> = Rc::new(MemoryStore::new(None));
}

/// The in-page annotation collaborator.
pub fn annotation_store() -> Rc<MemoryStore> {
    STORE.with(Rc::clone)
}

/// Read the config from localStorage, falling back to defaults.
pub fn load_config() -> EngineConfig {
    let stored = web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .and_then(|s| s.get_item(CONFIG_KEY).ok().flatten());
    let Some(json) = stored else {
        return EngineConfig::default();
    };
    match EngineConfig::from_json(&json) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring stored config {CONFIG_KEY}: {e}");
            EngineConfig::default()
        }
    }
}

pub fn save_config(config: &EngineConfig) {
    let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) else {
        return;
    };
    match config.to_json() {
        Ok(json) => {
            if let Err(e) = storage.set_item(CONFIG_KEY, &json) {
                log::error!("Failed to save config: {e:?}");
            }
        }
        Err(e) => log::error!("Failed to serialize config: {e}"),
    }
}

#[derive(Clone, Copy)]
pub struct AppState {
    pub config: RwSignal<EngineConfig>,
    pub settings: RwSignal<DisplaySettings>,
    pub parameters: RwSignal<SpectrogramParameters>,
    pub recording: RwSignal<Option<Recording>>,
    pub load_error: RwSignal<Option<String>>,
    pub engine: RwSignal<EngineState>,
    pub viewport: RwSignal<Viewport>,
    pub annotations: RwSignal<Vec<SoundEventAnnotation>>,
    pub playback: RwSignal<PlaybackSync>,
    pub spectrogram_size: RwSignal<CanvasSize>,
    pub waveform_size: RwSignal<CanvasSize>,
    /// Bumped whenever a tile resolves, so canvases redraw.
    pub tile_ready_signal: RwSignal<u32>,
    /// Last rejected mutation, shown in the status bar.
    pub status: RwSignal<Option<String>>,
}

impl AppState {
    pub fn new() -> Self {
        let config = load_config();
        let settings = DisplaySettings::from_config(&config);
        let parameters = config.parameters.clone();
        let placeholder = Window::for_clip(1.0, 48_000);
        Self {
            config: RwSignal::new(config),
            settings: RwSignal::new(settings),
            parameters: RwSignal::new(parameters),
            recording: RwSignal::new(None),
            load_error: RwSignal::new(None),
            engine: RwSignal::new(EngineState::default()),
            viewport: RwSignal::new(Viewport::new(placeholder, placeholder)),
            annotations: RwSignal::new(Vec::new()),
            playback: RwSignal::new(PlaybackSync::new()),
            spectrogram_size: RwSignal::new(CanvasSize::default()),
            waveform_size: RwSignal::new(CanvasSize::default()),
            tile_ready_signal: RwSignal::new(0),
            status: RwSignal::new(None),
        }
    }

    /// Install a freshly decoded clip and reset the view onto it.
    pub fn open_recording(&self, recording: Recording) {
        let (bounds, initial) = (recording.bounds(), recording.initial_window());
        let fixed = self.settings.with_untracked(|s| s.fixed_aspect_ratio());
        let previous = self.recording.with_untracked(|r| r.as_ref().map(|r| r.id.clone()));
        if let Some(previous) = previous.filter(|id| *id != recording.id) {
            tile_loader::forget_recording(&previous);
        }
        self.viewport.update(|vp| {
            vp.set_bounds(bounds, initial);
            let locked = vp.set_fixed_aspect_ratio(fixed);
            vp.set_bounds(bounds, locked);
        });
        self.annotations.set(annotation_store().annotations());
        self.playback.set(PlaybackSync::new());
        self.recording.set(Some(recording));
    }

    pub fn window(&self) -> Window {
        self.viewport.with_untracked(|vp| vp.window())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
