//! Core of the sonomark spectrogram annotator: the window model, coordinate
//! transform, geometry, tile cache, interaction state machine, measurement
//! bus, playback marker and frame composition. Nothing here touches the
//! browser; the host crate supplies a [`surface::DrawingSurface`] and runs
//! the effects the engine returns.

pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod keys;
pub mod measure;
pub mod mutation;
pub mod playback;
pub mod surface;
pub mod tile_cache;
pub mod transform;
pub mod types;
pub mod viewport;

pub use config::{DisplaySettings, EngineConfig};
pub use engine::{transition, Effect, EngineState, Event, Mode, Scene, Transition};
pub use error::{ConfigError, EngineError, GeometryError, MutationError, TileError};
pub use geometry::{Geometry, GeometryType};
pub use types::{AnnotationId, CanvasId, CanvasSize, Interval, SoundEventAnnotation, Tag, Window};
pub use viewport::Viewport;
