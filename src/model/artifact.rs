//! Artifact store: resolves the paired weights/scaler files, verifies they
//! belong together and builds the configured model kind.

use super::{AttentionLstm, LstmArtifact, ModelKind, Scaler, ScalerFile, SharedModel};
use crate::config::{FeaturesConfig, ModelConfig};
use crate::error::ModelError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const WEIGHTS_FILE: &str = "model.json";
pub const ONNX_FILE: &str = "model.onnx";
pub const SCALER_FILE: &str = "scaler.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub weights: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    pub fn resolve(dir: &Path, kind: ModelKind) -> Self {
        let weights = match kind {
            ModelKind::AttentionLstm => WEIGHTS_FILE,
            ModelKind::Onnx => ONNX_FILE,
        };
        Self {
            weights: dir.join(weights),
            scaler: dir.join(SCALER_FILE),
        }
    }

    /// Both halves must be present.
    pub fn ensure_present(&self) -> Result<(), ModelError> {
        for p in [&self.weights, &self.scaler] {
            if !p.exists() {
                return Err(ModelError::MissingArtifact(p.clone()));
            }
        }
        Ok(())
    }
}

/// How the scaler was tied to the weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    /// Scaler carries the SHA-256 of the weights file and it matches
    Checksum,
    /// Both files carry the same version tag
    Version,
    /// Nothing to compare
    Unverified,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Check the scaler against the weights it is supposed to accompany.
pub fn verify_pairing(
    weights: &[u8],
    model_version: Option<&str>,
    scaler: &ScalerFile,
) -> Result<Pairing, ModelError> {
    let mut pairing = Pairing::Unverified;
    if let (Some(m), Some(s)) = (model_version, scaler.version.as_deref()) {
        if m != s {
            return Err(ModelError::ArtifactMismatch(format!(
                "model version {m}, scaler version {s}"
            )));
        }
        pairing = Pairing::Version;
    }
    if let Some(expected) = scaler.model_sha256.as_deref() {
        let actual = sha256_hex(weights);
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(ModelError::ArtifactMismatch(format!(
                "scaler expects weights {expected}, found {actual}"
            )));
        }
        pairing = Pairing::Checksum;
    }
    Ok(pairing)
}

fn read(path: &Path) -> Result<Vec<u8>, ModelError> {
    std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ModelError> {
    serde_json::from_slice(bytes).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the configured artifact and check it fits the engine's window and
/// schema. Every failure is returned; nothing falls back here.
pub fn load_model(config: &ModelConfig, features: &FeaturesConfig) -> Result<SharedModel, ModelError> {
    let paths = ArtifactPaths::resolve(&config.artifact_dir, config.kind);
    paths.ensure_present()?;

    let weights = read(&paths.weights)?;
    let scaler_file: ScalerFile = parse(&paths.scaler, &read(&paths.scaler)?)?;
    let scaler = Scaler::from_file(&scaler_file)?;
    debug!(kind = ?scaler.kind(), channels = scaler.dim(), "scaler parsed");

    let (model, pairing): (SharedModel, Pairing) = match config.kind {
        ModelKind::AttentionLstm => {
            let artifact: LstmArtifact = parse(&paths.weights, &weights)?;
            let pairing = verify_pairing(&weights, artifact.version.as_deref(), &scaler_file)?;
            (Arc::new(AttentionLstm::from_artifact(&artifact, scaler)?), pairing)
        }
        #[cfg(feature = "onnx")]
        ModelKind::Onnx => {
            let pairing = verify_pairing(&weights, None, &scaler_file)?;
            let model = super::OnnxSequenceModel::load(
                &paths.weights,
                scaler,
                features.window_len,
                scaler_file.version.clone(),
            )?;
            (Arc::new(model), pairing)
        }
        #[cfg(not(feature = "onnx"))]
        ModelKind::Onnx => return Err(ModelError::UnsupportedKind(ModelKind::Onnx.as_str().into())),
    };

    let d = model.descriptor();
    let expected_dim = features.schema.arity();
    if d.window_len != features.window_len || d.feature_dim != expected_dim {
        return Err(ModelError::shape(
            format!("window {} × {} channels", features.window_len, expected_dim),
            format!("window {} × {} channels", d.window_len, d.feature_dim),
        ));
    }
    if pairing == Pairing::Unverified {
        warn!(
            dir = %config.artifact_dir.display(),
            "scaler carries no version or checksum; pairing with weights unverified"
        );
    }
    info!(
        kind = d.kind.as_str(),
        version = d.version.as_deref().unwrap_or("-"),
        window = d.window_len,
        channels = d.feature_dim,
        pairing = ?pairing,
        "sequence model loaded"
    );
    Ok(model)
}

/// Startup policy: `Ok(None)` means run heuristic-only. An unusable artifact is
/// a single warning unless the configuration marks the model as required.
pub fn load_optional(
    config: &ModelConfig,
    features: &FeaturesConfig,
) -> Result<Option<SharedModel>, ModelError> {
    if config.heuristic_only {
        info!("heuristic-only mode; model loading skipped");
        return Ok(None);
    }
    match load_model(config, features) {
        Ok(m) => Ok(Some(m)),
        Err(e) if config.required => Err(e),
        Err(e) => {
            warn!(error = %e, "sequence model unavailable; running heuristic-only");
            Ok(None)
        }
    }
}
