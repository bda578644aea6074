//! Sequence models: a full window of feature vectors → distribution over
//! {Low, Medium, High}. Loaded once, immutable afterwards and shared by every
//! session through [`SharedModel`].

mod artifact;
mod lstm;
#[cfg(feature = "onnx")]
mod onnx;
mod scaler;
mod tensor;

pub use artifact::{load_model, load_optional, sha256_hex, verify_pairing, ArtifactPaths, Pairing};
pub use lstm::{AttentionLstm, LstmArtifact};
#[cfg(feature = "onnx")]
pub use onnx::OnnxSequenceModel;
pub use scaler::{Scaler, ScalerFile, ScalerKind};
pub use tensor::TensorData;

use crate::error::ModelError;
use crate::features::FeatureVector;
use crate::stress::ClassProbabilities;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const NUM_CLASSES: usize = 3;

/// Closed set of model implementations, chosen by configuration at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// LSTM encoder with softmax attention pooling over the window, evaluated natively
    AttentionLstm,
    /// Exported graph run by ONNX Runtime (cargo feature `onnx`)
    Onnx,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::AttentionLstm => "attention_lstm",
            ModelKind::Onnx => "onnx",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub kind: ModelKind,
    pub version: Option<String>,
    pub window_len: usize,
    pub feature_dim: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub probabilities: ClassProbabilities,
    /// Max class probability
    pub raw_confidence: f32,
    /// Softmax weights over the window, oldest first, when the model exposes them
    pub attention: Option<Vec<f32>>,
}

impl ModelOutput {
    pub fn from_probabilities(p: [f32; NUM_CLASSES], attention: Option<Vec<f32>>) -> Self {
        let raw_confidence = p.iter().copied().fold(0.0f32, f32::max);
        Self {
            probabilities: ClassProbabilities::from_array(p),
            raw_confidence,
            attention,
        }
    }

    /// Interpret a graph's class scores. Scores that already form a
    /// distribution are kept as is; anything else is treated as logits.
    /// Attention weights survive only when they cover the whole window.
    pub fn from_scores(
        scores: &[f32],
        attention: Option<Vec<f32>>,
        window_len: usize,
    ) -> Result<Self, ModelError> {
        if scores.len() != NUM_CLASSES {
            return Err(ModelError::shape(format!("{NUM_CLASSES} class scores"), scores.len()));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ModelError::Runtime("non-finite class scores".into()));
        }
        let is_distribution = scores.iter().all(|p| (0.0..=1.0).contains(p))
            && (scores.iter().sum::<f32>() - 1.0).abs() < 1e-3;
        let probs = if is_distribution {
            scores.to_vec()
        } else {
            softmax(scores)
        };
        let attention = attention
            .filter(|a| a.len() == window_len && a.iter().all(|w| w.is_finite()));
        let out = Self::from_probabilities([probs[0], probs[1], probs[2]], attention);
        out.ensure_finite()?;
        Ok(out)
    }

    /// Fails when any class probability or the confidence is not a number.
    pub fn ensure_finite(&self) -> Result<(), ModelError> {
        let probs = self.probabilities.as_array();
        if probs.iter().all(|p| p.is_finite()) && self.raw_confidence.is_finite() {
            Ok(())
        } else {
            Err(ModelError::Runtime("non-finite class probabilities".into()))
        }
    }

    /// Index of the most attended timestep.
    pub fn attention_peak(&self) -> Option<usize> {
        let weights = self.attention.as_ref()?;
        weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// Capability shared by every model kind. Implementations never fall back:
/// they answer or return a typed error.
pub trait SequenceModel: Send + Sync + std::fmt::Debug {
    fn descriptor(&self) -> &ModelDescriptor;

    fn infer(&self, window: &[FeatureVector]) -> Result<ModelOutput, ModelError>;
}

pub type SharedModel = Arc<dyn SequenceModel>;

/// Stack a window into `[window_len, feature_dim]` and apply the paired scaler
/// to every channel of every timestep.
pub(crate) fn scaled_window(
    descriptor: &ModelDescriptor,
    scaler: &Scaler,
    window: &[FeatureVector],
) -> Result<Array2<f32>, ModelError> {
    if window.len() != descriptor.window_len {
        return Err(ModelError::shape(
            format!("window of {}", descriptor.window_len),
            window.len(),
        ));
    }
    let dim = descriptor.feature_dim;
    let mut out = Array2::<f32>::zeros((window.len(), dim));
    for (mut row, fv) in out.rows_mut().into_iter().zip(window) {
        if fv.dim() != dim {
            return Err(ModelError::shape(format!("{dim} channels"), fv.dim()));
        }
        let slice = row
            .as_slice_mut()
            .ok_or_else(|| ModelError::Runtime("non-contiguous window row".into()))?;
        slice.copy_from_slice(fv.as_slice());
        scaler.transform_in_place(slice);
    }
    Ok(out)
}

/// Numerically stable softmax.
pub(crate) fn softmax(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
