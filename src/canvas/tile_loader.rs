use std::cell::RefCell;

use leptos::prelude::*;
use sonomark_core::compose::{TileSlot, TileState};
use sonomark_core::error::TileError;
use sonomark_core::tile_cache::{covering_segments, DesiredTiles, Lookup, TileCache, TileRequest};
use sonomark_core::types::SpectrogramParameters;
use sonomark_core::{Interval, Window};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Blob, ImageBitmap, Response};

use crate::state::AppState;

thread_local! {
    /// Decoded tiles of every recording opened in this page.
    static CACHE: RefCell<TileCache<ImageBitmap>> = RefCell::new(TileCache::with_capacity("", 0));
    /// Keys the spectrogram canvas currently wants painted.
    static DESIRED: RefCell<DesiredTiles> = RefCell::new(DesiredTiles::default());
}

/// Replace the cache, e.g. after the config changed the tile service.
pub fn configure(base_url: &str, capacity: usize) {
    CACHE.with(|c| *c.borrow_mut() = TileCache::with_capacity(base_url, capacity));
    DESIRED.with(|d| d.borrow_mut().want([]));
}

/// Tiles covering the time extent of `window`, clipped to the clip `limit`.
pub fn requests_for(
    recording_id: &str,
    window: &Window,
    limit: Interval,
    parameters: &SpectrogramParameters,
) -> Vec<TileRequest> {
    covering_segments(window.time, limit)
        .into_iter()
        .map(|segment| TileRequest::new(recording_id, segment, parameters.clone()))
        .collect()
}

/// Make the tiles of `window` the wanted set and fetch the missing ones.
/// With `prefetch`, the windows one span to either side are fetched too once
/// a visible tile arrives.
pub fn request_visible(
    state: AppState,
    recording_id: &str,
    window: Window,
    limit: Interval,
    parameters: &SpectrogramParameters,
    prefetch: bool,
) {
    let requests = requests_for(recording_id, &window, limit, parameters);
    DESIRED.with(|d| {
        let mut desired = d.borrow_mut();
        desired.want(requests.iter().map(TileRequest::key));
        CACHE.with(|c| c.borrow_mut().pin(desired.current()));
    });

    let neighbours = if prefetch {
        let span = window.time.span();
        [-span, span]
            .into_iter()
            .flat_map(|shift| {
                let shifted = Window::new(window.time.shifted(shift), window.freq);
                requests_for(recording_id, &shifted, limit, parameters)
            })
            .collect()
    } else {
        Vec::new()
    };

    for request in &requests {
        schedule_tile(state, request, neighbours.clone());
    }
}

/// Drop the tiles of a clip that is no longer open.
pub fn forget_recording(recording_id: &str) {
    CACHE.with(|c| c.borrow_mut().clear_recording(recording_id));
    log::debug!("Cleared tiles of {recording_id}");
}

fn schedule_tile(state: AppState, request: &TileRequest, then: Vec<TileRequest>) {
    let lookup = CACHE.with(|c| match c.borrow_mut().request(request) {
        Lookup::Fetch { key, url } => Some((key, url)),
        Lookup::Ready(_) | Lookup::Pending => None,
    });
    let Some((key, url)) = lookup else {
        return;
    };

    spawn_local(async move {
        let outcome = fetch_bitmap(&url).await;
        let loaded = CACHE.with(|c| c.borrow_mut().resolve(key.clone(), outcome)).is_ok();

        if !DESIRED.with(|d| d.borrow().accepts(&key)) {
            log::debug!("Discarding stale tile {}", key.query());
            return;
        }
        if loaded {
            log::info!("Tile ready: {}", key.query());
        }
        state.tile_ready_signal.update(|n| *n = n.wrapping_add(1));

        if loaded {
            for neighbour in &then {
                schedule_tile(state, neighbour, Vec::new());
            }
        }
    });
}

async fn fetch_bitmap(url: &str) -> Result<ImageBitmap, TileError> {
    let load = |e: wasm_bindgen::JsValue| TileError::ImageLoad(format!("{e:?}"));
    let decode = |e: wasm_bindgen::JsValue| TileError::ImageDecode(format!("{e:?}"));

    let window = web_sys::window().ok_or_else(|| TileError::ImageLoad("no window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url)).await.map_err(load)?.dyn_into().map_err(load)?;
    if !response.ok() {
        return Err(TileError::ImageLoad(format!("HTTP {} for {url}", response.status())));
    }
    let blob: Blob = JsFuture::from(response.blob().map_err(load)?).await.map_err(load)?.dyn_into().map_err(load)?;
    let bitmap = window.create_image_bitmap_with_blob(&blob).map_err(decode)?;
    JsFuture::from(bitmap).await.map_err(decode)?.dyn_into().map_err(decode)
}

/// Lend the tiles of `requests` to `paint` as base-layer slots. Tiles that
/// are neither cached nor failed count as loading.
pub fn with_tiles<R>(
    requests: &[TileRequest],
    freq: Interval,
    paint: impl FnOnce(Vec<TileSlot<'_, ImageBitmap>>) -> R,
) -> R {
    CACHE.with(|c| {
        let cache = c.borrow();
        let slots = requests
            .iter()
            .map(|request| {
                let key = request.key();
                let state = match (cache.get(&key), cache.error(&key)) {
                    (Some(image), _) => TileState::Ready(image),
                    (None, Some(e)) => TileState::Failed(e),
                    (None, None) => TileState::Loading,
                };
                TileSlot { segment: request.segment, freq, state }
            })
            .collect();
        paint(slots)
    })
}
