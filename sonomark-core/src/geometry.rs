//! Annotation shapes in time/frequency space.
//!
//! Every shape is a variant of [`Geometry`] carrying its own payload struct.
//! Coordinates are seconds (time) and Hz (frequency). The serialized form
//! mirrors GeoJSON: `{"type": "BoundingBox", "coordinates": {...}}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::types::{Interval, Window};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeStamp {
    pub time: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time: f64,
    pub freq: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub time_min: f64,
    pub freq_min: f64,
    pub time_max: f64,
    pub freq_max: f64,
}

impl BoundingBox {
    /// Box spanned by two opposite corners, in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            time_min: a.0.min(b.0),
            freq_min: a.1.min(b.1),
            time_max: a.0.max(b.0),
            freq_max: a.1.max(b.1),
        }
    }
}

/// Polyline of `(time, value)` points. Only used for ephemeral measurements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    pub points: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    TimeStamp(TimeStamp),
    TimeInterval(TimeInterval),
    Point(Point),
    BoundingBox(BoundingBox),
    LineString(LineString),
}

/// Discriminant of [`Geometry`], used to pick what the draw mode produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    TimeStamp,
    TimeInterval,
    Point,
    BoundingBox,
    LineString,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::TimeStamp => "TimeStamp",
            GeometryType::TimeInterval => "TimeInterval",
            GeometryType::Point => "Point",
            GeometryType::BoundingBox => "BoundingBox",
            GeometryType::LineString => "LineString",
        }
    }

    /// Whether annotations of this kind may be sent to the collaborator.
    pub fn is_persistable(&self) -> bool {
        !matches!(self, GeometryType::LineString)
    }

    /// Build the geometry produced by a drag from `start` to `end`
    /// (both `(time, freq)`). The result is not validated.
    pub fn from_drag(&self, start: (f64, f64), end: (f64, f64)) -> Result<Geometry, GeometryError> {
        match self {
            GeometryType::TimeStamp => Ok(Geometry::TimeStamp(TimeStamp { time: end.0 })),
            GeometryType::TimeInterval => Ok(Geometry::TimeInterval(TimeInterval {
                start: start.0.min(end.0),
                end: start.0.max(end.0),
            })),
            GeometryType::Point => Ok(Geometry::Point(Point { time: end.0, freq: end.1 })),
            GeometryType::BoundingBox => Ok(Geometry::BoundingBox(BoundingBox::from_corners(start, end))),
            GeometryType::LineString => Err(GeometryError::UnsupportedKind(self.as_str().to_string())),
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryType {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TimeStamp" => Ok(GeometryType::TimeStamp),
            "TimeInterval" => Ok(GeometryType::TimeInterval),
            "Point" => Ok(GeometryType::Point),
            "BoundingBox" => Ok(GeometryType::BoundingBox),
            "LineString" => Ok(GeometryType::LineString),
            other => Err(GeometryError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Grabbable part of a shape in edit mode. `Top` is the high-frequency side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    Body,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

fn legal_time(t: f64) -> bool {
    t.is_finite() && t >= 0.0
}

fn legal_freq(f: f64) -> bool {
    f.is_finite() && f >= 0.0
}

impl Geometry {
    pub fn kind(&self) -> GeometryType {
        match self {
            Geometry::TimeStamp(_) => GeometryType::TimeStamp,
            Geometry::TimeInterval(_) => GeometryType::TimeInterval,
            Geometry::Point(_) => GeometryType::Point,
            Geometry::BoundingBox(_) => GeometryType::BoundingBox,
            Geometry::LineString(_) => GeometryType::LineString,
        }
    }

    /// Non-zero extent on every defined axis and coordinates in legal range.
    pub fn is_valid(&self) -> bool {
        match self {
            Geometry::TimeStamp(g) => legal_time(g.time),
            Geometry::TimeInterval(g) => legal_time(g.start) && legal_time(g.end) && g.start < g.end,
            Geometry::Point(g) => legal_time(g.time) && legal_freq(g.freq),
            Geometry::BoundingBox(g) => {
                legal_time(g.time_min)
                    && legal_time(g.time_max)
                    && legal_freq(g.freq_min)
                    && legal_freq(g.freq_max)
                    && g.time_min < g.time_max
                    && g.freq_min < g.freq_max
            }
            Geometry::LineString(g) => {
                g.points.len() >= 2
                    && g.points.iter().all(|(t, v)| t.is_finite() && v.is_finite())
                    && g.points.first() != g.points.last()
            }
        }
    }

    pub fn validate(self) -> Result<Self, GeometryError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(GeometryError::Invalid { kind: self.kind() })
        }
    }

    /// Rejects shapes reaching past the recording's time or frequency range.
    pub fn within(self, bounds: &Window) -> Result<Self, GeometryError> {
        let time_ok = bounds.time.encloses(&self.time_range());
        let freq_ok = self.freq_range().is_none_or(|f| bounds.freq.encloses(&f));
        if time_ok && freq_ok {
            Ok(self)
        } else {
            Err(GeometryError::OutOfBounds { kind: self.kind() })
        }
    }

    /// Rejects kinds the annotation collaborator never stores.
    pub fn ensure_persistable(&self) -> Result<(), GeometryError> {
        let kind = self.kind();
        if kind.is_persistable() {
            Ok(())
        } else {
            Err(GeometryError::UnsupportedKind(kind.as_str().to_string()))
        }
    }

    /// Time ordering key used for sequencing annotations.
    pub fn start_coordinate(&self) -> f64 {
        self.time_range().min
    }

    pub fn end_coordinate(&self) -> f64 {
        self.time_range().max
    }

    pub fn time_range(&self) -> Interval {
        match self {
            Geometry::TimeStamp(g) => Interval::new(g.time, g.time),
            Geometry::TimeInterval(g) => Interval::new(g.start, g.end),
            Geometry::Point(g) => Interval::new(g.time, g.time),
            Geometry::BoundingBox(g) => Interval::new(g.time_min, g.time_max),
            Geometry::LineString(g) => {
                let min = g.points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
                let max = g.points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
                Interval::new(min, max)
            }
        }
    }

    /// Frequency extent, if the shape has one.
    pub fn freq_range(&self) -> Option<Interval> {
        match self {
            Geometry::TimeStamp(_) | Geometry::TimeInterval(_) => None,
            Geometry::Point(g) => Some(Interval::new(g.freq, g.freq)),
            Geometry::BoundingBox(g) => Some(Interval::new(g.freq_min, g.freq_max)),
            Geometry::LineString(g) => {
                let min = g.points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
                let max = g.points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
                Some(Interval::new(min, max))
            }
        }
    }

    pub fn translate(&self, dt: f64, df: f64) -> Geometry {
        match self {
            Geometry::TimeStamp(g) => Geometry::TimeStamp(TimeStamp { time: g.time + dt }),
            Geometry::TimeInterval(g) => Geometry::TimeInterval(TimeInterval {
                start: g.start + dt,
                end: g.end + dt,
            }),
            Geometry::Point(g) => Geometry::Point(Point { time: g.time + dt, freq: g.freq + df }),
            Geometry::BoundingBox(g) => Geometry::BoundingBox(BoundingBox {
                time_min: g.time_min + dt,
                freq_min: g.freq_min + df,
                time_max: g.time_max + dt,
                freq_max: g.freq_max + df,
            }),
            Geometry::LineString(g) => Geometry::LineString(LineString {
                points: g.points.iter().map(|(t, v)| (t + dt, v + df)).collect(),
            }),
        }
    }

    /// Handles exposed by this shape, with their anchor `(time, freq)`.
    /// Shapes without a frequency extent report `None` for the anchor's
    /// frequency; they are drawn at mid-height.
    pub fn handles(&self) -> Vec<(Handle, f64, Option<f64>)> {
        match self {
            Geometry::TimeStamp(g) => vec![(Handle::Body, g.time, None)],
            Geometry::TimeInterval(g) => vec![
                (Handle::Left, g.start, None),
                (Handle::Right, g.end, None),
            ],
            Geometry::Point(g) => vec![(Handle::Body, g.time, Some(g.freq))],
            Geometry::BoundingBox(b) => {
                let tm = (b.time_min + b.time_max) / 2.0;
                let fm = (b.freq_min + b.freq_max) / 2.0;
                vec![
                    (Handle::TopLeft, b.time_min, Some(b.freq_max)),
                    (Handle::TopRight, b.time_max, Some(b.freq_max)),
                    (Handle::BottomRight, b.time_max, Some(b.freq_min)),
                    (Handle::BottomLeft, b.time_min, Some(b.freq_min)),
                    (Handle::Top, tm, Some(b.freq_max)),
                    (Handle::Right, b.time_max, Some(fm)),
                    (Handle::Bottom, tm, Some(b.freq_min)),
                    (Handle::Left, b.time_min, Some(fm)),
                ]
            }
            Geometry::LineString(_) => Vec::new(),
        }
    }

    /// Move or resize the shape by a domain-space delta applied to `handle`.
    /// Resizing past the opposite edge flips the shape rather than inverting it.
    pub fn apply_drag(&self, handle: Handle, dt: f64, df: f64) -> Geometry {
        match (self, handle) {
            (_, Handle::Body) => self.translate(dt, df),
            (Geometry::TimeInterval(g), Handle::Left) => Geometry::TimeInterval(TimeInterval {
                start: (g.start + dt).min(g.end),
                end: (g.start + dt).max(g.end),
            }),
            (Geometry::TimeInterval(g), Handle::Right) => Geometry::TimeInterval(TimeInterval {
                start: (g.end + dt).min(g.start),
                end: (g.end + dt).max(g.start),
            }),
            (Geometry::BoundingBox(b), h) => {
                let mut t0 = b.time_min;
                let mut t1 = b.time_max;
                let mut f0 = b.freq_min;
                let mut f1 = b.freq_max;
                if matches!(h, Handle::Left | Handle::TopLeft | Handle::BottomLeft) {
                    t0 += dt;
                }
                if matches!(h, Handle::Right | Handle::TopRight | Handle::BottomRight) {
                    t1 += dt;
                }
                if matches!(h, Handle::Top | Handle::TopLeft | Handle::TopRight) {
                    f1 += df;
                }
                if matches!(h, Handle::Bottom | Handle::BottomLeft | Handle::BottomRight) {
                    f0 += df;
                }
                Geometry::BoundingBox(BoundingBox::from_corners((t0, f0), (t1, f1)))
            }
            _ => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(t0: f64, f0: f64, t1: f64, f1: f64) -> Geometry {
        Geometry::BoundingBox(BoundingBox { time_min: t0, freq_min: f0, time_max: t1, freq_max: f1 })
    }

    #[test]
    fn test_bbox_validity() {
        assert!(bbox(1.0, 100.0, 2.0, 200.0).is_valid());
        assert!(!bbox(2.0, 100.0, 2.0, 200.0).is_valid(), "zero time extent");
        assert!(!bbox(3.0, 100.0, 2.0, 200.0).is_valid(), "inverted time");
        assert!(!bbox(1.0, 200.0, 2.0, 200.0).is_valid(), "zero freq extent");
        assert!(!bbox(1.0, f64::NAN, 2.0, 200.0).is_valid());
        assert!(!bbox(-1.0, 100.0, 2.0, 200.0).is_valid(), "negative time");
    }

    #[test]
    fn test_interval_and_point_validity() {
        assert!(Geometry::TimeInterval(TimeInterval { start: 0.5, end: 0.6 }).is_valid());
        assert!(!Geometry::TimeInterval(TimeInterval { start: 0.6, end: 0.6 }).is_valid());
        assert!(Geometry::TimeStamp(TimeStamp { time: 0.0 }).is_valid());
        assert!(!Geometry::TimeStamp(TimeStamp { time: f64::INFINITY }).is_valid());
        assert!(Geometry::Point(Point { time: 1.0, freq: 4000.0 }).is_valid());
        assert!(!Geometry::Point(Point { time: 1.0, freq: -1.0 }).is_valid());
    }

    #[test]
    fn test_linestring_needs_two_distinct_points() {
        let one = Geometry::LineString(LineString { points: vec![(1.0, 1.0)] });
        let same = Geometry::LineString(LineString { points: vec![(1.0, 1.0), (1.0, 1.0)] });
        let ok = Geometry::LineString(LineString { points: vec![(1.0, 1.0), (2.0, 1.0)] });
        assert!(!one.is_valid());
        assert!(!same.is_valid());
        assert!(ok.is_valid());
    }

    #[test]
    fn test_shapes_must_stay_inside_the_recording() {
        let clip = Window::for_clip(30.0, 48_000);
        assert!(bbox(1.0, 100.0, 2.0, 200.0).within(&clip).is_ok());
        assert_eq!(
            bbox(1.0, 100.0, 2.0, 30_000.0).within(&clip),
            Err(GeometryError::OutOfBounds { kind: GeometryType::BoundingBox }),
            "above Nyquist"
        );
        assert!(bbox(29.0, 100.0, 31.0, 200.0).within(&clip).is_err(), "past the end");
        let interval = Geometry::TimeInterval(TimeInterval { start: 10.0, end: 20.0 });
        assert!(interval.within(&clip).is_ok(), "no frequency extent to check");
    }

    #[test]
    fn test_linestring_is_not_persistable() {
        let line = Geometry::LineString(LineString { points: vec![(0.0, 0.0), (1.0, 1.0)] });
        assert!(matches!(line.ensure_persistable(), Err(GeometryError::UnsupportedKind(_))));
        assert!(bbox(0.0, 0.0, 1.0, 1.0).ensure_persistable().is_ok());
        assert!(GeometryType::LineString.from_drag((0.0, 0.0), (1.0, 1.0)).is_err());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert_eq!(
            "MultiPolygon".parse::<GeometryType>(),
            Err(GeometryError::UnsupportedKind("MultiPolygon".to_string()))
        );
        assert_eq!("BoundingBox".parse::<GeometryType>(), Ok(GeometryType::BoundingBox));
    }

    #[test]
    fn test_start_end_coordinates() {
        let g = bbox(2.0, 10.0, 3.5, 20.0);
        assert_eq!(g.start_coordinate(), 2.0);
        assert_eq!(g.end_coordinate(), 3.5);
        let ts = Geometry::TimeStamp(TimeStamp { time: 7.0 });
        assert_eq!(ts.start_coordinate(), 7.0);
        assert_eq!(ts.end_coordinate(), 7.0);
    }

    #[test]
    fn test_from_drag_normalizes_corners() {
        let g = GeometryType::BoundingBox.from_drag((5.5, 100.0), (5.0, 300.0)).unwrap();
        assert_eq!(g, bbox(5.0, 100.0, 5.5, 300.0));
        let g = GeometryType::TimeInterval.from_drag((3.0, 0.0), (1.0, 0.0)).unwrap();
        assert_eq!(g, Geometry::TimeInterval(TimeInterval { start: 1.0, end: 3.0 }));
    }

    #[test]
    fn test_resize_flips_instead_of_inverting() {
        let g = bbox(1.0, 100.0, 2.0, 200.0);
        let moved = g.apply_drag(Handle::Left, 1.5, 0.0);
        assert_eq!(moved, bbox(2.0, 100.0, 2.5, 200.0));
        let taller = g.apply_drag(Handle::TopRight, 0.5, 50.0);
        assert_eq!(taller, bbox(1.0, 100.0, 2.5, 250.0));
    }

    #[test]
    fn test_body_drag_translates() {
        let g = Geometry::Point(Point { time: 1.0, freq: 100.0 });
        assert_eq!(
            g.apply_drag(Handle::Body, 0.25, -10.0),
            Geometry::Point(Point { time: 1.25, freq: 90.0 })
        );
    }

    #[test]
    fn test_serde_shape() {
        let g = Geometry::TimeInterval(TimeInterval { start: 1.0, end: 2.0 });
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"type":"TimeInterval","coordinates":{"start":1.0,"end":2.0}}"#);
    }
}
