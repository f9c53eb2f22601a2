use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// A closed range on one axis (seconds for time, Hz for frequency).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// True when `other` lies entirely inside this interval.
    pub fn encloses(&self, other: &Interval) -> bool {
        other.min >= self.min && other.max <= self.max
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        other.max >= self.min && other.min <= self.max
    }

    /// Interval of the given span centered on `center`.
    pub fn centered(center: f64, span: f64) -> Self {
        Self::new(center - span / 2.0, center + span / 2.0)
    }

    pub fn shifted(&self, delta: f64) -> Self {
        Self::new(self.min + delta, self.max + delta)
    }
}

/// The visible (or limiting) time/frequency rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub time: Interval,
    pub freq: Interval,
}

impl Window {
    pub const fn new(time: Interval, freq: Interval) -> Self {
        Self { time, freq }
    }

    /// Full extent of a clip: `[0, duration] × [0, samplerate / 2]`.
    pub fn for_clip(duration: f64, samplerate: u32) -> Self {
        Self::new(
            Interval::new(0.0, duration),
            Interval::new(0.0, samplerate as f64 / 2.0),
        )
    }

    /// Window used by the waveform canvas, whose vertical axis is amplitude.
    pub fn waveform(time: Interval) -> Self {
        Self::new(time, Interval::new(-1.0, 1.0))
    }

    pub fn is_ordered(&self) -> bool {
        self.time.min <= self.time.max && self.freq.min <= self.freq.max
    }

    /// Nearest point of this window to `(time, freq)`.
    pub fn clamp_point(&self, (time, freq): (f64, f64)) -> (f64, f64) {
        (self.time.clamp(time), self.freq.clamp(freq))
    }
}

/// Pixel dimensions of a drawing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// The two coupled canvases of the annotation view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanvasId {
    Spectrogram,
    Waveform,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn label(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub value: f64,
}

/// A persisted sound event annotation, owned by the annotation collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoundEventAnnotation {
    pub id: AnnotationId,
    pub geometry: Geometry,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl SoundEventAnnotation {
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Amplitude,
    Power,
    Db,
}

impl Scale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Amplitude => "amplitude",
            Scale::Power => "power",
            Scale::Db => "db",
        }
    }
}

/// STFT rendering configuration sent to the tile service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramParameters {
    /// FFT window length in samples.
    pub window_size: u32,
    /// Fraction of the window shared by consecutive frames (0.0–1.0).
    pub overlap: f64,
    pub colormap: String,
    pub gamma: f64,
    pub scale: Scale,
    pub resample: bool,
    /// Target samplerate when `resample` is set.
    pub samplerate: Option<u32>,
    pub clamp: bool,
    pub normalize: bool,
    pub min_db: f64,
    pub max_db: f64,
    pub channel: u32,
}

impl Default for SpectrogramParameters {
    fn default() -> Self {
        Self {
            window_size: 1024,
            overlap: 0.75,
            colormap: "gray".to_string(),
            gamma: 1.0,
            scale: Scale::Db,
            resample: false,
            samplerate: None,
            clamp: true,
            normalize: false,
            min_db: -80.0,
            max_db: 0.0,
            channel: 0,
        }
    }
}
