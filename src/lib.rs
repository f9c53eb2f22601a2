//! Browser host for the sonomark annotation engine.
//!
//! Mounts a Leptos (CSR) app with a spectrogram and a waveform canvas. The
//! pure engine lives in `sonomark-core`; this crate supplies the canvas
//! drawing surface, tile fetching, audio playback and input wiring.

pub mod audio;
pub mod canvas;
pub mod components;
pub mod interaction;
pub mod state;

use wasm_bindgen::prelude::*;

use crate::components::app::App;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    // a second init (hot reload) fails harmlessly
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("sonomark v{}", env!("CARGO_PKG_VERSION"));
    leptos::mount::mount_to_body(App);
}
