//! Cache of rendered spectrogram tiles.
//!
//! A tile is the image the rendering service returns for one recording
//! segment and one set of [`SpectrogramParameters`]. Tiles always cover the
//! full frequency band; the frequency part of the visible window is cropped
//! at draw time, so only the time extent takes part in the key.
//!
//! Acquisition is split in two so the cache stays free of I/O:
//! [`TileCache::request`] answers `Ready`, `Pending` (someone is already
//! fetching it) or `Fetch` (caller must fetch the URL), and
//! [`TileCache::resolve`] stores the outcome. Concurrent identical requests
//! therefore produce a single fetch. Failures are remembered only until the
//! next caller-initiated request; nothing retries on its own.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::TileError;
use crate::types::{Interval, SpectrogramParameters};

/// Nice 1-2-5 progression of segment spans in seconds.
const SEGMENT_SPANS: &[f64] = &[
    0.01, 0.02, 0.05,
    0.1, 0.2, 0.5,
    1.0, 2.0, 5.0,
    10.0, 20.0, 50.0,
    100.0, 200.0, 500.0,
    1000.0, 2000.0, 5000.0,
];

/// Identity of a tile: the deterministic query string plus the recording it
/// belongs to (kept separately for per-recording invalidation).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    recording_id: String,
    query: String,
}

impl CacheKey {
    pub fn recording_id(&self) -> &str {
        &self.recording_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Everything needed to fetch one tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRequest {
    pub recording_id: String,
    pub segment: Interval,
    pub parameters: SpectrogramParameters,
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

impl TileRequest {
    pub fn new(recording_id: impl Into<String>, segment: Interval, parameters: SpectrogramParameters) -> Self {
        Self { recording_id: recording_id.into(), segment, parameters }
    }

    /// Query string with every field in a fixed order. Identical field
    /// values always give byte-identical output.
    pub fn query_string(&self) -> String {
        let p = &self.parameters;
        let fields: [(&str, String); 15] = [
            ("recording_id", encode_component(&self.recording_id)),
            ("start_time", self.segment.min.to_string()),
            ("end_time", self.segment.max.to_string()),
            ("window_size", p.window_size.to_string()),
            ("overlap", p.overlap.to_string()),
            ("cmap", encode_component(&p.colormap)),
            ("gamma", p.gamma.to_string()),
            ("scale", p.scale.as_str().to_string()),
            ("min_dB", p.min_db.to_string()),
            ("max_dB", p.max_db.to_string()),
            ("resample", p.resample.to_string()),
            ("samplerate", p.samplerate.map(|s| s.to_string()).unwrap_or_default()),
            ("clamp", p.clamp.to_string()),
            ("normalize", p.normalize.to_string()),
            ("channel", p.channel.to_string()),
        ];
        fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn key(&self) -> CacheKey {
        CacheKey {
            recording_id: self.recording_id.clone(),
            query: self.query_string(),
        }
    }

    /// Full URL under the tile service `base` (e.g. `/api/v1/spectrograms/`).
    pub fn url(&self, base: &str) -> String {
        format!("{}?{}", base, self.query_string())
    }
}

/// Segment span used for a visible span: the smallest nice span that is at
/// least as wide, so at most two segments cover the view.
pub fn segment_span(visible_span: f64) -> f64 {
    SEGMENT_SPANS
        .iter()
        .copied()
        .find(|&s| s >= visible_span)
        .unwrap_or(SEGMENT_SPANS[SEGMENT_SPANS.len() - 1])
}

/// Aligned segments covering `visible`, clipped to `limit`.
pub fn covering_segments(visible: Interval, limit: Interval) -> Vec<Interval> {
    let span = segment_span(visible.span());
    if !(span > 0.0) || visible.max < limit.min || visible.min > limit.max {
        return Vec::new();
    }
    let first = ((visible.min.max(limit.min)) / span).floor() as i64;
    let last = ((visible.max.min(limit.max)) / span).ceil() as i64;
    (first..last.max(first + 1))
        .map(|i| {
            let start = (i as f64 * span).max(limit.min);
            let end = ((i + 1) as f64 * span).min(limit.max);
            Interval::new(start, end)
        })
        .filter(|s| s.span() > 0.0)
        .collect()
}

/// Strategy deciding which tiles leave the cache.
pub trait EvictionPolicy {
    /// A tile was read.
    fn touch(&mut self, key: &CacheKey);
    /// A tile was stored; returns the keys to evict. Keys in `pinned` are
    /// on screen and must stay.
    fn insert(&mut self, key: &CacheKey, pinned: &HashSet<CacheKey>) -> Vec<CacheKey>;
    fn remove(&mut self, key: &CacheKey);
    fn clear(&mut self);
}

/// Keeps every tile until explicitly cleared.
#[derive(Debug, Default)]
pub struct Unbounded;

impl EvictionPolicy for Unbounded {
    fn touch(&mut self, _key: &CacheKey) {}
    fn insert(&mut self, _key: &CacheKey, _pinned: &HashSet<CacheKey>) -> Vec<CacheKey> {
        Vec::new()
    }
    fn remove(&mut self, _key: &CacheKey) {}
    fn clear(&mut self) {}
}

/// Least-recently-used eviction capped at `capacity` tiles. Pinned tiles
/// may push the count past the cap until they are released.
#[derive(Debug)]
pub struct Lru {
    capacity: usize,
    /// front = oldest, back = most recently used
    order: VecDeque<CacheKey>,
}

impl Lru {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), order: VecDeque::new() }
    }
}

impl EvictionPolicy for Lru {
    fn touch(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }

    fn insert(&mut self, key: &CacheKey, pinned: &HashSet<CacheKey>) -> Vec<CacheKey> {
        self.touch(key);
        let mut evicted = Vec::new();
        while self.order.len() > self.capacity {
            let Some(oldest) = self.order.iter().position(|k| k != key && !pinned.contains(k)) else {
                break;
            };
            if let Some(k) = self.order.remove(oldest) {
                evicted.push(k);
            }
        }
        evicted
    }

    fn remove(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}

/// Answer to [`TileCache::request`].
#[derive(Debug, PartialEq)]
pub enum Lookup<'a, I> {
    Ready(&'a I),
    /// Already in flight; wait for the resolution notification.
    Pending,
    /// Caller must fetch `url` and hand the outcome to [`TileCache::resolve`].
    Fetch { key: CacheKey, url: String },
}

pub struct TileCache<I> {
    tiles: HashMap<CacheKey, I>,
    in_flight: HashSet<CacheKey>,
    failures: HashMap<CacheKey, TileError>,
    /// Tiles of the current view, exempt from eviction.
    pinned: HashSet<CacheKey>,
    policy: Box<dyn EvictionPolicy>,
    base_url: String,
}

impl<I> TileCache<I> {
    pub fn new(base_url: impl Into<String>, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            tiles: HashMap::new(),
            in_flight: HashSet::new(),
            failures: HashMap::new(),
            pinned: HashSet::new(),
            policy,
            base_url: base_url.into(),
        }
    }

    /// LRU cache of `capacity` tiles; `0` means unbounded.
    pub fn with_capacity(base_url: impl Into<String>, capacity: usize) -> Self {
        let policy: Box<dyn EvictionPolicy> = if capacity == 0 {
            Box::new(Unbounded)
        } else {
            Box::new(Lru::new(capacity))
        };
        Self::new(base_url, policy)
    }

    /// Synchronous lookup without side effects.
    pub fn get(&self, key: &CacheKey) -> Option<&I> {
        self.tiles.get(key)
    }

    pub fn set(&mut self, key: CacheKey, image: I) {
        for evicted in self.policy.insert(&key, &self.pinned) {
            self.tiles.remove(&evicted);
        }
        self.failures.remove(&key);
        self.tiles.insert(key, image);
    }

    /// Protect the tiles of the current view from eviction, releasing the
    /// previous set. Call with the [`DesiredTiles`] keys whenever they change.
    pub fn pin(&mut self, keys: &[CacheKey]) {
        self.pinned = keys.iter().cloned().collect();
    }

    pub fn request(&mut self, request: &TileRequest) -> Lookup<'_, I> {
        let key = request.key();
        if self.tiles.contains_key(&key) {
            self.policy.touch(&key);
            return match self.tiles.get(&key) {
                Some(image) => Lookup::Ready(image),
                None => Lookup::Pending,
            };
        }
        if self.in_flight.contains(&key) {
            return Lookup::Pending;
        }
        self.failures.remove(&key);
        self.in_flight.insert(key.clone());
        log::debug!("tile miss, fetching {}", key.query);
        Lookup::Fetch { key, url: request.url(&self.base_url) }
    }

    /// Store the outcome of a fetch started by [`TileCache::request`].
    /// Errors are handed back for the caller to surface; no entry is created.
    pub fn resolve(&mut self, key: CacheKey, outcome: Result<I, TileError>) -> Result<(), TileError> {
        self.in_flight.remove(&key);
        match outcome {
            Ok(image) => {
                self.set(key, image);
                Ok(())
            }
            Err(err) => {
                log::warn!("tile {} failed: {err}", key.query);
                self.failures.insert(key, err.clone());
                Err(err)
            }
        }
    }

    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.in_flight.contains(key)
    }

    pub fn error(&self, key: &CacheKey) -> Option<&TileError> {
        self.failures.get(key)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Drop every tile of one recording (e.g. after the clip changes).
    pub fn clear_recording(&mut self, recording_id: &str) {
        let keys: Vec<CacheKey> = self
            .tiles
            .keys()
            .filter(|k| k.recording_id == recording_id)
            .cloned()
            .collect();
        for key in keys {
            self.tiles.remove(&key);
            self.policy.remove(&key);
        }
        self.in_flight.retain(|k| k.recording_id != recording_id);
        self.failures.retain(|k, _| k.recording_id != recording_id);
        self.pinned.retain(|k| k.recording_id != recording_id);
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.in_flight.clear();
        self.failures.clear();
        self.pinned.clear();
        self.policy.clear();
    }
}

/// The keys the consumer currently wants painted. Resolutions for any other
/// key are stale and must not be drawn.
#[derive(Clone, Debug, Default)]
pub struct DesiredTiles {
    keys: Vec<CacheKey>,
}

impl DesiredTiles {
    /// Replace the wanted set, e.g. after the window or parameters changed.
    pub fn want(&mut self, keys: impl IntoIterator<Item = CacheKey>) {
        self.keys = keys.into_iter().collect();
    }

    pub fn current(&self) -> &[CacheKey] {
        &self.keys
    }

    pub fn accepts(&self, key: &CacheKey) -> bool {
        self.keys.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: f64) -> TileRequest {
        TileRequest::new("rec-1", Interval::new(start, start + 10.0), SpectrogramParameters::default())
    }

    #[test]
    fn test_query_string_is_deterministic() {
        let a = request(0.0).query_string();
        let b = request(0.0).query_string();
        assert_eq!(a, b);
        assert!(a.starts_with("recording_id=rec-1&start_time=0&end_time=10&window_size=1024"));
        assert_ne!(a, request(5.0).query_string());
    }

    #[test]
    fn test_parameter_change_changes_key() {
        let mut other = request(0.0);
        other.parameters.gamma = 2.0;
        assert_ne!(request(0.0).key(), other.key());
    }

    #[test]
    fn test_recording_id_is_escaped() {
        let r = TileRequest::new("a b&c", Interval::new(0.0, 1.0), SpectrogramParameters::default());
        assert!(r.query_string().starts_with("recording_id=a%20b%26c&"));
    }

    #[test]
    fn test_set_then_get_returns_same_image() {
        let mut cache: TileCache<Vec<u8>> = TileCache::with_capacity("/tiles", 4);
        let key = request(0.0).key();
        cache.set(key.clone(), vec![1, 2, 3]);
        assert_eq!(cache.get(&key), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_miss_then_hit() {
        let mut cache: TileCache<u32> = TileCache::with_capacity("/tiles", 4);
        let req = request(0.0);
        let key = match cache.request(&req) {
            Lookup::Fetch { key, url } => {
                assert!(url.starts_with("/tiles?recording_id=rec-1"));
                key
            }
            other => panic!("expected fetch, got {other:?}"),
        };
        assert!(cache.is_loading(&key));
        assert!(cache.resolve(key.clone(), Ok(7)).is_ok());
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_loading(&key));
        assert_eq!(cache.request(&req), Lookup::Ready(&7));
    }

    #[test]
    fn test_concurrent_requests_coalesce() {
        let mut cache: TileCache<u32> = TileCache::with_capacity("/tiles", 4);
        let req = request(0.0);
        let mut fetches = 0;
        for _ in 0..3 {
            if let Lookup::Fetch { .. } = cache.request(&req) {
                fetches += 1;
            }
        }
        assert_eq!(fetches, 1);
    }

    #[test]
    fn test_failure_creates_no_entry_and_next_request_retries() {
        let mut cache: TileCache<u32> = TileCache::with_capacity("/tiles", 4);
        let req = request(0.0);
        let Lookup::Fetch { key, .. } = cache.request(&req) else {
            panic!("expected fetch");
        };
        let err = cache.resolve(key.clone(), Err(TileError::ImageLoad("503".into())));
        assert_eq!(err, Err(TileError::ImageLoad("503".into())));
        assert!(cache.get(&key).is_none());
        assert!(cache.error(&key).is_some());
        assert!(matches!(cache.request(&req), Lookup::Fetch { .. }));
        assert!(cache.error(&key).is_none());
    }

    #[test]
    fn test_lru_evicts_oldest() {
        let mut cache: TileCache<u32> = TileCache::with_capacity("/tiles", 2);
        let (a, b, c) = (request(0.0).key(), request(10.0).key(), request(20.0).key());
        cache.set(a.clone(), 1);
        cache.set(b.clone(), 2);
        // reading `a` makes `b` the oldest
        let _ = cache.request(&request(0.0));
        cache.set(c.clone(), 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn test_visible_tiles_survive_neighbour_prefetch() {
        let mut cache: TileCache<u32> = TileCache::with_capacity("/tiles", 2);
        let clip = Interval::new(0.0, 60.0);
        let tiles = |visible: Interval| -> Vec<TileRequest> {
            covering_segments(visible, clip)
                .into_iter()
                .map(|s| TileRequest::new("rec-1", s, SpectrogramParameters::default()))
                .collect()
        };
        let visible = tiles(Interval::new(3.0, 7.0));
        let mut desired = DesiredTiles::default();
        desired.want(visible.iter().map(TileRequest::key));
        cache.pin(desired.current());

        let neighbours = [tiles(Interval::new(-1.0, 3.0)), tiles(Interval::new(7.0, 11.0))].concat();
        for (i, req) in visible.iter().chain(&neighbours).enumerate() {
            let fetch = match cache.request(req) {
                Lookup::Fetch { key, .. } => Some(key),
                Lookup::Ready(_) | Lookup::Pending => None,
            };
            if let Some(key) = fetch {
                assert!(cache.resolve(key, Ok(i as u32)).is_ok());
            }
        }
        for req in &visible {
            assert!(cache.get(&req.key()).is_some(), "visible tile {:?} was evicted", req.segment);
        }

        // once the view moves on, the old tiles are ordinary LRU entries again
        cache.pin(&[]);
        cache.set(request(100.0).key(), 99);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let mut cache: TileCache<u32> = TileCache::with_capacity("/tiles", 0);
        for i in 0..50 {
            cache.set(request(i as f64 * 10.0).key(), i);
        }
        assert_eq!(cache.len(), 50);
    }

    #[test]
    fn test_clear_recording() {
        let mut cache: TileCache<u32> = TileCache::with_capacity("/tiles", 8);
        cache.set(request(0.0).key(), 1);
        let other = TileRequest::new("rec-2", Interval::new(0.0, 10.0), SpectrogramParameters::default());
        cache.set(other.key(), 2);
        cache.clear_recording("rec-1");
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&other.key()).is_some());
    }

    #[test]
    fn test_desired_tile_rejects_stale_keys() {
        let mut desired = DesiredTiles::default();
        desired.want([request(0.0).key(), request(10.0).key()]);
        desired.want([request(10.0).key(), request(20.0).key()]);
        assert!(!desired.accepts(&request(0.0).key()));
        assert!(desired.accepts(&request(10.0).key()));
        assert_eq!(desired.current().len(), 2);
    }

    #[test]
    fn test_segments_cover_visible_window() {
        let segs = covering_segments(Interval::new(3.0, 7.0), Interval::new(0.0, 60.0));
        // visible span 4 s → 5 s segments
        assert_eq!(segs, vec![Interval::new(0.0, 5.0), Interval::new(5.0, 10.0)]);
        let segs = covering_segments(Interval::new(0.0, 5.0), Interval::new(0.0, 3.0));
        assert_eq!(segs, vec![Interval::new(0.0, 3.0)]);
    }
}
