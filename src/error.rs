//! Error types. `predict` never returns one of these; they surface at load,
//! construction and session-routing boundaries only.

use std::path::PathBuf;

/// Failures while loading or running a sequence model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("artifact file missing: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tensor `{name}`: {reason}")]
    Tensor { name: String, reason: String },

    /// Model and scaler come from different training runs.
    #[error("scaler does not belong to model: {0}")]
    ArtifactMismatch(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("model kind `{0}` not available in this build")]
    UnsupportedKind(String),

    #[error("inference runtime: {0}")]
    Runtime(String),
}

impl ModelError {
    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        ModelError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn tensor(name: &str, reason: impl Into<String>) -> Self {
        ModelError::Tensor {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid thresholds: need 0 < medium ({medium}) < high ({high}) < 100")]
    Thresholds { medium: f32, high: f32 },

    #[error("window length must be at least 1")]
    EmptyWindow,
}

/// Engine construction failures. Only reachable when a model is supplied.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("model incompatible with engine: {0}")]
    Incompatible(#[from] ModelError),
}

/// Session routing failures in [`crate::session::SessionHub`].
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("unknown session {0}")]
    UnknownSession(String),

    #[error("session {0} already open")]
    AlreadyOpen(String),

    #[error("session {0} task is gone")]
    SessionGone(String),

    #[error("no tokio runtime to host session {0}")]
    NoRuntime(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
