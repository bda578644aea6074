//! ONNX Runtime backend. Input: [1, window_len, feature_dim] f32 (already
//! scaled); output 0: [1, 3] logits or probabilities; optional output 1: the
//! attention weights over the window.

use super::{scaled_window, ModelDescriptor, ModelKind, ModelOutput, Scaler, SequenceModel};
use crate::error::ModelError;
use crate::features::FeatureVector;
use ndarray::Array3;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

fn runtime(e: ort::Error) -> ModelError {
    ModelError::Runtime(e.to_string())
}

pub struct OnnxSequenceModel {
    session: Session,
    input_name: String,
    scaler: Scaler,
    descriptor: ModelDescriptor,
}

impl std::fmt::Debug for OnnxSequenceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSequenceModel")
            .field("input_name", &self.input_name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl OnnxSequenceModel {
    /// The graph does not carry the schema, so the channel count comes from the
    /// paired scaler and the window length from configuration. Static input
    /// dimensions in the graph are checked against both.
    pub fn load(
        path: &Path,
        scaler: Scaler,
        window_len: usize,
        version: Option<String>,
    ) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(runtime)?
            .commit_from_file(path)
            .map_err(runtime)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| ModelError::Runtime("graph has no inputs".into()))?;
        let input_name = input.name.clone();
        if let Some(dims) = input.input_type.tensor_dimensions() {
            let expected = [1, window_len as i64, scaler.dim() as i64];
            let fixed_mismatch = dims.len() != 3
                || dims
                    .iter()
                    .zip(expected)
                    .any(|(got, want)| *got > 0 && *got != want);
            if fixed_mismatch {
                return Err(ModelError::shape(format!("{expected:?}"), format!("{dims:?}")));
            }
        }

        let feature_dim = scaler.dim();
        Ok(Self {
            session,
            input_name,
            scaler,
            descriptor: ModelDescriptor {
                kind: ModelKind::Onnx,
                version,
                window_len,
                feature_dim,
            },
        })
    }
}

impl SequenceModel for OnnxSequenceModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn infer(&self, window: &[FeatureVector]) -> Result<ModelOutput, ModelError> {
        let x = scaled_window(&self.descriptor, &self.scaler, window)?;
        let (t, f) = x.dim();
        let batch: Array3<f32> = x
            .into_shape_with_order((1, t, f))
            .map_err(|e| ModelError::Runtime(e.to_string()))?;
        let input = Tensor::from_array(batch).map_err(runtime)?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input].map_err(runtime)?)
            .map_err(runtime)?;

        let scores = outputs[0].try_extract_tensor::<f32>().map_err(runtime)?;
        let scores: Vec<f32> = scores.iter().copied().collect();
        let attention = if outputs.len() > 1 {
            outputs[1]
                .try_extract_tensor::<f32>()
                .ok()
                .map(|v| v.iter().copied().collect::<Vec<f32>>())
        } else {
            None
        };

        ModelOutput::from_scores(&scores, attention, t)
    }
}
