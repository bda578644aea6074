//! Raw metrics record → FeatureVector. This is the validation boundary: absent,
//! mistyped or out-of-range values are defaulted or clamped, never rejected.

use super::{FeatureSchema, FeatureVector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One flat key → number record from the feature source (e.g. `blinkRate`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMetrics(HashMap<String, Value>);

impl RawMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), Value::from(value));
    }

    /// Numeric value for `key`; `None` if absent or not a number.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for RawMetrics {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn extract(&self, raw: &RawMetrics) -> FeatureVector {
        let mut defaulted = 0usize;
        let values: Vec<f32> = self
            .schema
            .channels()
            .iter()
            .map(|c| match raw.number(c.key()) {
                Some(v) => c.normalize(v),
                None => {
                    defaulted += 1;
                    c.normalize(c.default_raw() as f64)
                }
            })
            .collect();
        if defaulted > 0 {
            tracing::trace!(defaulted, schema = ?self.schema, "defaulted missing channels");
        }
        FeatureVector {
            schema: self.schema,
            values: values.into(),
        }
    }
}
