//! Per-frame feature vectors: raw metric records → normalized, schema-tagged vectors,
//! plus the fixed-capacity window they accumulate in.

mod buffer;
mod channel;
mod extract;

pub use buffer::SequenceBuffer;
pub use channel::{Channel, FeatureSchema};
pub use extract::{FeatureExtractor, RawMetrics};

use std::sync::Arc;

/// Normalized snapshot of one time step. Immutable once built; cloning shares
/// the channel storage.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Arc<[f32]>,
}

impl FeatureVector {
    /// Build from already-normalized values. Returns `None` when the arity
    /// does not match the schema.
    pub fn from_normalized(schema: FeatureSchema, values: Vec<f32>) -> Option<Self> {
        if values.len() != schema.arity() {
            return None;
        }
        Some(Self {
            schema,
            values: values.into(),
        })
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Normalized value of `channel`, if this schema carries it.
    pub fn get(&self, channel: Channel) -> Option<f32> {
        self.schema
            .position(channel)
            .map(|i| self.values[i])
    }

    /// Value of `channel` in source units (e.g. blinks/min), falling back to
    /// the channel's neutral default when the schema does not carry it.
    pub fn raw(&self, channel: Channel) -> f32 {
        self.get(channel)
            .map(|v| v * channel.scale())
            .unwrap_or_else(|| channel.default_raw())
    }
}
