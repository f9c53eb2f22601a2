use std::sync::Arc;

use js_sys::ArrayBuffer;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioContext, Response};

use crate::state::Recording;

/// Fetch and decode a clip for the waveform. The browser does the decoding;
/// only the first channel is kept.
pub async fn load_recording(id: String, audio_url: String) -> Result<Recording, String> {
    let window = web_sys::window().ok_or("no window")?;
    let response: Response = JsFuture::from(window.fetch_with_str(&audio_url))
        .await
        .map_err(|e| format!("fetch {audio_url}: {e:?}"))?
        .dyn_into()
        .map_err(|_| "fetch did not return a Response".to_string())?;
    if !response.ok() {
        return Err(format!("HTTP {} for {audio_url}", response.status()));
    }
    let bytes: ArrayBuffer = JsFuture::from(response.array_buffer().map_err(|e| format!("{e:?}"))?)
        .await
        .map_err(|e| format!("read {audio_url}: {e:?}"))?
        .dyn_into()
        .map_err(|_| "body is not an ArrayBuffer".to_string())?;

    let ctx = AudioContext::new().map_err(|e| format!("Failed to create AudioContext: {e:?}"))?;
    let decoded = match ctx.decode_audio_data(&bytes) {
        Ok(promise) => JsFuture::from(promise).await,
        Err(e) => Err(e),
    };
    let _ = ctx.close();
    let buffer: AudioBuffer = decoded
        .map_err(|e| format!("decode {audio_url}: {e:?}"))?
        .dyn_into()
        .map_err(|_| "decoder did not return an AudioBuffer".to_string())?;

    let samples = match buffer.get_channel_data(0) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("No channel data in {audio_url}: {e:?}");
            Vec::new()
        }
    };
    log::info!(
        "Loaded {id}: {:.2}s at {} Hz, {} samples",
        buffer.duration(),
        buffer.sample_rate(),
        samples.len()
    );

    Ok(Recording {
        id,
        audio_url,
        duration: buffer.duration(),
        sample_rate: buffer.sample_rate() as u32,
        samples: Arc::new(samples),
    })
}
