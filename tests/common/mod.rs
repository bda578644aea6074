//! Synthetic artifacts: seeded random attention-LSTM weights plus a paired
//! identity scaler, written the way a training export lays them out.
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::path::Path;
use stress_engine::features::FeatureSchema;
use stress_engine::model::{sha256_hex, LstmArtifact, ModelKind, ScalerFile, TensorData};

pub const VERSION: &str = "2026.10-synthetic";

pub fn lstm_artifact(schema: FeatureSchema, window: usize, hidden: usize, seed: u64) -> LstmArtifact {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut t = |shape: &[usize]| {
        let n: usize = shape.iter().product();
        let v: Vec<f32> = (0..n).map(|_| rng.gen_range(-0.4..0.4)).collect();
        TensorData::packed(shape.to_vec(), &v)
    };
    let feat = schema.arity();
    let mut tensors = HashMap::new();
    tensors.insert("input_proj.weight".to_string(), t(&[hidden, feat]));
    tensors.insert("input_proj.bias".to_string(), t(&[hidden]));
    tensors.insert("lstm.weight_ih_l0".to_string(), t(&[4 * hidden, hidden]));
    tensors.insert("lstm.weight_hh_l0".to_string(), t(&[4 * hidden, hidden]));
    tensors.insert("lstm.bias_ih_l0".to_string(), t(&[4 * hidden]));
    tensors.insert("lstm.bias_hh_l0".to_string(), t(&[4 * hidden]));
    tensors.insert("attention.weight".to_string(), t(&[1, hidden]));
    tensors.insert("attention.bias".to_string(), t(&[1]));
    tensors.insert("fc.0.weight".to_string(), t(&[hidden, hidden]));
    tensors.insert("fc.0.bias".to_string(), t(&[hidden]));
    tensors.insert("fc.3.weight".to_string(), t(&[3, hidden]));
    tensors.insert("fc.3.bias".to_string(), t(&[3]));
    LstmArtifact {
        kind: ModelKind::AttentionLstm,
        version: Some(VERSION.to_string()),
        window_len: window,
        feature_dim: feat,
        hidden_dim: hidden,
        num_layers: 1,
        bidirectional: false,
        num_classes: 3,
        tensors,
    }
}

pub fn identity_scaler(dim: usize) -> ScalerFile {
    ScalerFile::standard(vec![0.0; dim], vec![1.0; dim])
}

/// Write `model.json` and a scaler tied to it by version and checksum.
pub fn write_pair(dir: &Path, artifact: &LstmArtifact) {
    let weights = serde_json::to_vec(artifact).unwrap();
    let mut scaler = identity_scaler(artifact.feature_dim);
    scaler.version = artifact.version.clone();
    scaler.model_sha256 = Some(sha256_hex(&weights));
    std::fs::write(dir.join("model.json"), &weights).unwrap();
    std::fs::write(dir.join("scaler.json"), serde_json::to_vec(&scaler).unwrap()).unwrap();
}
