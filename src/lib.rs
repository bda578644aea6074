//! Stress engine: real-time temporal stress inference over per-frame facial
//! and physiological metrics.
//!
//! Modular structure:
//! - [`features`]: channel schema, normalization and the sliding sequence buffer
//! - [`stress`]: levels, thresholds, predictions and the rule-based scorer
//! - [`model`]: sequence models (native attention LSTM, optional ONNX) and artifacts
//! - [`engine`]: per-session inference engine with heuristic fallback
//! - [`session`]: tokio task per session behind a hub
//! - [`protocol`]: NDJSON request/reply bridge
//! - [`logging`]: structured logging

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod protocol;
pub mod session;
pub mod stress;

pub use config::EngineConfig;
pub use context::SessionContext;
pub use engine::InferenceEngine;
pub use features::{FeatureExtractor, FeatureSchema, FeatureVector, RawMetrics};
pub use logging::StructuredLogger;
pub use model::{load_optional, SequenceModel, SharedModel};
pub use protocol::{Bridge, Reply, Request};
pub use session::SessionHub;
pub use stress::{Prediction, StressLevel};
