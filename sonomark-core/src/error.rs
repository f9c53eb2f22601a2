use crate::engine::Mode;
use crate::geometry::GeometryType;
use crate::types::AnnotationId;

/// Failures while acquiring a spectrogram tile.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TileError {
    #[error("image load failed: {0}")]
    ImageLoad(String),

    #[error("image decode failed: {0}")]
    ImageDecode(String),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("invalid {kind} geometry")]
    Invalid { kind: GeometryType },

    #[error("unsupported geometry kind: {0}")]
    UnsupportedKind(String),

    #[error("{kind} geometry lies outside the recording")]
    OutOfBounds { kind: GeometryType },
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("transition from {from} to {to} is not allowed while the engine is disabled")]
    TransitionGuard { from: Mode, to: Mode },
}

/// Rejections reported by the annotation collaborator.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MutationError {
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),

    #[error("mutation rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
