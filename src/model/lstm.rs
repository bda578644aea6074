//! Native attention-pooled LSTM.
//!
//! input projection → stacked (optionally bidirectional) LSTM → per-timestep
//! relevance score → softmax over the window → weighted sum of hidden states →
//! Linear/ReLU/Linear → softmax over the three stress classes.
//!
//! Tensor names follow the PyTorch `state_dict` of the training module:
//! `input_proj.{weight,bias}`, `lstm.{weight_ih,weight_hh,bias_ih,bias_hh}_l{k}[_reverse]`,
//! `attention.{weight,bias}`, `fc.0.{weight,bias}`, `fc.3.{weight,bias}`.

use super::tensor::{TensorData, TensorStore};
use super::{
    scaled_window, softmax, ModelDescriptor, ModelKind, ModelOutput, Scaler, SequenceModel,
    NUM_CLASSES,
};
use crate::error::ModelError;
use crate::features::FeatureVector;
use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_layers() -> usize {
    1
}

fn default_classes() -> usize {
    NUM_CLASSES
}

/// `model.json` contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmArtifact {
    pub kind: ModelKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub window_len: usize,
    pub feature_dim: usize,
    pub hidden_dim: usize,
    #[serde(default = "default_layers")]
    pub num_layers: usize,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default = "default_classes")]
    pub num_classes: usize,
    pub tensors: HashMap<String, TensorData>,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// One direction of one layer. Gate order is i, f, g, o.
#[derive(Debug, Clone)]
struct LstmDirection {
    w_ih: Array2<f32>,
    w_hh: Array2<f32>,
    /// bias_ih + bias_hh
    bias: Array1<f32>,
}

impl LstmDirection {
    fn load(
        store: &TensorStore<'_>,
        layer: usize,
        suffix: &str,
        input_dim: usize,
        hidden: usize,
    ) -> Result<Self, ModelError> {
        let name = |p: &str| format!("lstm.{p}_l{layer}{suffix}");
        let w_ih = store.matrix(&name("weight_ih"), 4 * hidden, input_dim)?;
        let w_hh = store.matrix(&name("weight_hh"), 4 * hidden, hidden)?;
        let bias = store.vector(&name("bias_ih"), 4 * hidden)?
            + &store.vector(&name("bias_hh"), 4 * hidden)?;
        Ok(Self { w_ih, w_hh, bias })
    }

    /// Run over `input` ([T, in]) and return hidden states [T, H] indexed by
    /// input timestep regardless of direction.
    fn run(&self, input: &Array2<f32>, reverse: bool) -> Array2<f32> {
        let steps = input.nrows();
        let hidden = self.w_hh.ncols();
        let pre = input.dot(&self.w_ih.t()) + &self.bias;
        let mut h = Array1::<f32>::zeros(hidden);
        let mut c = Array1::<f32>::zeros(hidden);
        let mut out = Array2::<f32>::zeros((steps, hidden));

        for k in 0..steps {
            let t = if reverse { steps - 1 - k } else { k };
            let gates = &pre.row(t) + &self.w_hh.dot(&h);
            for j in 0..hidden {
                let i = sigmoid(gates[j]);
                let f = sigmoid(gates[hidden + j]);
                let g = gates[2 * hidden + j].tanh();
                let o = sigmoid(gates[3 * hidden + j]);
                c[j] = f * c[j] + i * g;
                h[j] = o * c[j].tanh();
            }
            out.row_mut(t).assign(&h);
        }
        out
    }
}

#[derive(Debug, Clone)]
struct Dense {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    fn load(store: &TensorStore<'_>, prefix: &str, out: usize, inp: usize) -> Result<Self, ModelError> {
        Ok(Self {
            weight: store.matrix(&format!("{prefix}.weight"), out, inp)?,
            bias: store.vector(&format!("{prefix}.bias"), out)?,
        })
    }

    fn apply(&self, x: &Array1<f32>) -> Array1<f32> {
        self.weight.dot(x) + &self.bias
    }
}

#[derive(Debug)]
pub struct AttentionLstm {
    descriptor: ModelDescriptor,
    scaler: Scaler,
    input_proj: Dense,
    /// layers × directions
    layers: Vec<Vec<LstmDirection>>,
    attention: Dense,
    fc_hidden: Dense,
    fc_out: Dense,
}

impl AttentionLstm {
    pub fn from_artifact(artifact: &LstmArtifact, scaler: Scaler) -> Result<Self, ModelError> {
        if artifact.kind != ModelKind::AttentionLstm {
            return Err(ModelError::UnsupportedKind(artifact.kind.as_str().to_string()));
        }
        if artifact.num_classes != NUM_CLASSES {
            return Err(ModelError::shape(
                format!("{NUM_CLASSES} classes"),
                artifact.num_classes,
            ));
        }
        if artifact.window_len == 0 || artifact.hidden_dim == 0 || artifact.num_layers == 0 {
            return Err(ModelError::shape(
                "non-zero window, hidden and layer sizes",
                format!(
                    "window {} hidden {} layers {}",
                    artifact.window_len, artifact.hidden_dim, artifact.num_layers
                ),
            ));
        }
        if scaler.dim() != artifact.feature_dim {
            return Err(ModelError::ArtifactMismatch(format!(
                "scaler fitted on {} channels, model expects {}",
                scaler.dim(),
                artifact.feature_dim
            )));
        }

        let store = TensorStore::new(&artifact.tensors);
        let hidden = artifact.hidden_dim;
        let dirs = if artifact.bidirectional { 2 } else { 1 };
        let out_dim = hidden * dirs;

        let input_proj = Dense::load(&store, "input_proj", hidden, artifact.feature_dim)?;
        let mut layers = Vec::with_capacity(artifact.num_layers);
        for layer in 0..artifact.num_layers {
            let input_dim = if layer == 0 { hidden } else { out_dim };
            let mut directions = vec![LstmDirection::load(&store, layer, "", input_dim, hidden)?];
            if artifact.bidirectional {
                directions.push(LstmDirection::load(&store, layer, "_reverse", input_dim, hidden)?);
            }
            layers.push(directions);
        }
        let attention = Dense::load(&store, "attention", 1, out_dim)?;
        let fc_hidden = Dense::load(&store, "fc.0", hidden, out_dim)?;
        let fc_out = Dense::load(&store, "fc.3", NUM_CLASSES, hidden)?;

        Ok(Self {
            descriptor: ModelDescriptor {
                kind: ModelKind::AttentionLstm,
                version: artifact.version.clone(),
                window_len: artifact.window_len,
                feature_dim: artifact.feature_dim,
            },
            scaler,
            input_proj,
            layers,
            attention,
            fc_hidden,
            fc_out,
        })
    }

    fn encode(&self, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let mut seq = x.dot(&self.input_proj.weight.t()) + &self.input_proj.bias;
        for directions in &self.layers {
            let mut outputs: Vec<Array2<f32>> = directions
                .iter()
                .enumerate()
                .map(|(d, dir)| dir.run(&seq, d == 1))
                .collect();
            seq = if outputs.len() == 1 {
                outputs.remove(0)
            } else {
                let views: Vec<_> = outputs.iter().map(|o| o.view()).collect();
                concatenate(Axis(1), &views).map_err(|e| ModelError::Runtime(e.to_string()))?
            };
        }
        Ok(seq)
    }
}

impl SequenceModel for AttentionLstm {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn infer(&self, window: &[FeatureVector]) -> Result<ModelOutput, ModelError> {
        let x = scaled_window(&self.descriptor, &self.scaler, window)?;
        let states = self.encode(&x)?;

        let scores: Vec<f32> = states
            .dot(&self.attention.weight.row(0))
            .iter()
            .map(|v| v + self.attention.bias[0])
            .collect();
        let weights = softmax(&scores);
        let context = states.t().dot(&Array1::from(weights.clone()));

        let hidden = self.fc_hidden.apply(&context).mapv(|v| v.max(0.0));
        let logits = self.fc_out.apply(&hidden);
        let probs = softmax(&logits.to_vec());
        let out = ModelOutput::from_probabilities([probs[0], probs[1], probs[2]], Some(weights));
        out.ensure_finite()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSchema;
    use crate::model::ScalerFile;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn zeros(shape: &[usize]) -> TensorData {
        TensorData::inline(shape.to_vec(), vec![0.0; shape.iter().product()])
    }

    fn random(rng: &mut StdRng, shape: &[usize]) -> TensorData {
        let n = shape.iter().product();
        let v: Vec<f32> = (0..n).map(|_| rng.gen_range(-0.5..0.5)).collect();
        TensorData::packed(shape.to_vec(), &v)
    }

    fn artifact(window: usize, feat: usize, hidden: usize, bi: bool, seed: Option<u64>) -> LstmArtifact {
        let mut rng = StdRng::seed_from_u64(seed.unwrap_or(0));
        let mut t = |shape: &[usize]| match seed {
            Some(_) => random(&mut rng, shape),
            None => zeros(shape),
        };
        let dirs = if bi { 2 } else { 1 };
        let out = hidden * dirs;
        let mut tensors = HashMap::new();
        tensors.insert("input_proj.weight".into(), t(&[hidden, feat]));
        tensors.insert("input_proj.bias".into(), t(&[hidden]));
        for sfx in if bi { vec!["", "_reverse"] } else { vec![""] } {
            tensors.insert(format!("lstm.weight_ih_l0{sfx}"), t(&[4 * hidden, hidden]));
            tensors.insert(format!("lstm.weight_hh_l0{sfx}"), t(&[4 * hidden, hidden]));
            tensors.insert(format!("lstm.bias_ih_l0{sfx}"), t(&[4 * hidden]));
            tensors.insert(format!("lstm.bias_hh_l0{sfx}"), t(&[4 * hidden]));
        }
        tensors.insert("attention.weight".into(), t(&[1, out]));
        tensors.insert("attention.bias".into(), t(&[1]));
        tensors.insert("fc.0.weight".into(), t(&[hidden, out]));
        tensors.insert("fc.0.bias".into(), t(&[hidden]));
        tensors.insert("fc.3.weight".into(), t(&[3, hidden]));
        tensors.insert("fc.3.bias".into(), t(&[3]));
        LstmArtifact {
            kind: ModelKind::AttentionLstm,
            version: Some("test".into()),
            window_len: window,
            feature_dim: feat,
            hidden_dim: hidden,
            num_layers: 1,
            bidirectional: bi,
            num_classes: 3,
            tensors,
        }
    }

    fn identity_scaler(dim: usize) -> Scaler {
        Scaler::from_file(&ScalerFile::standard(vec![0.0; dim], vec![1.0; dim])).unwrap()
    }

    fn window(len: usize, value: f32) -> Vec<FeatureVector> {
        (0..len)
            .map(|_| FeatureVector::from_normalized(FeatureSchema::Compact, vec![value; 6]).unwrap())
            .collect()
    }

    #[test]
    fn output_bias_drives_class_and_attention_is_uniform() {
        let mut a = artifact(4, 6, 3, false, None);
        a.tensors.insert("fc.3.bias".into(), TensorData::inline(vec![3], vec![0.0, 0.0, 5.0]));
        let m = AttentionLstm::from_artifact(&a, identity_scaler(6)).unwrap();
        let out = m.infer(&window(4, 0.5)).unwrap();
        let expected_high = 5f32.exp() / (2.0 + 5f32.exp());
        assert!((out.probabilities.high - expected_high).abs() < 1e-5);
        assert_eq!(out.raw_confidence, out.probabilities.high);
        let att = out.attention.unwrap();
        assert_eq!(att.len(), 4);
        assert!(att.iter().all(|w| (w - 0.25).abs() < 1e-6));
    }

    #[test]
    fn single_cell_matches_closed_form() {
        // hidden 1; only gate biases set, so c = σ(bi)·tanh(bg), h = σ(bo)·tanh(c) on step one
        let mut a = artifact(1, 6, 1, false, None);
        a.tensors.insert(
            "lstm.bias_ih_l0".into(),
            TensorData::inline(vec![4], vec![0.5, 0.0, 1.0, -0.5]),
        );
        a.tensors.insert("fc.0.weight".into(), TensorData::inline(vec![1, 1], vec![1.0]));
        a.tensors.insert("fc.3.weight".into(), TensorData::inline(vec![3, 1], vec![0.0, 0.0, 1.0]));
        let m = AttentionLstm::from_artifact(&a, identity_scaler(6)).unwrap();
        let out = m.infer(&window(1, 0.0)).unwrap();

        let c = sigmoid(0.5) * 1f32.tanh();
        let h = sigmoid(-0.5) * c.tanh();
        let expected = softmax(&[0.0, 0.0, h]);
        assert!((out.probabilities.high - expected[2]).abs() < 1e-6);
    }

    #[test]
    fn random_bidirectional_model_yields_distribution() {
        let a = artifact(5, 6, 4, true, Some(7));
        let m = AttentionLstm::from_artifact(&a, identity_scaler(6)).unwrap();
        let w: Vec<FeatureVector> = (0..5)
            .map(|i| {
                FeatureVector::from_normalized(FeatureSchema::Compact, vec![i as f32 * 0.2; 6]).unwrap()
            })
            .collect();
        let out = m.infer(&w).unwrap();
        let sum: f32 = out.probabilities.as_array().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let att_sum: f32 = out.attention.as_ref().unwrap().iter().sum();
        assert!((att_sum - 1.0).abs() < 1e-5);
        // pure function of immutable parameters
        assert_eq!(m.infer(&w).unwrap(), out);
    }

    #[test]
    fn wrong_window_length_is_typed_error() {
        let m = AttentionLstm::from_artifact(&artifact(4, 6, 2, false, None), identity_scaler(6)).unwrap();
        assert!(matches!(m.infer(&window(3, 0.0)), Err(ModelError::ShapeMismatch { .. })));
    }

    #[test]
    fn load_rejects_bad_tensors_and_scaler() {
        let mut a = artifact(4, 6, 2, false, None);
        a.tensors.remove("attention.weight");
        assert!(AttentionLstm::from_artifact(&a, identity_scaler(6)).is_err());

        let a = artifact(4, 6, 2, false, None);
        assert!(matches!(
            AttentionLstm::from_artifact(&a, identity_scaler(5)),
            Err(ModelError::ArtifactMismatch(_))
        ));

        let mut a = artifact(4, 6, 2, false, None);
        a.num_classes = 2;
        assert!(AttentionLstm::from_artifact(&a, identity_scaler(6)).is_err());
    }
}
