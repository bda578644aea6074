//! Per-channel scaler fitted alongside the model (`scaler.json`).

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    /// (x - mean) / scale
    Standard,
    /// (x - min) / (max - min)
    MinMax,
}

/// On-disk layout. `version` and `model_sha256` tie the scaler to the
/// training run that produced the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerFile {
    pub kind: ScalerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

impl ScalerFile {
    pub fn standard(mean: Vec<f32>, scale: Vec<f32>) -> Self {
        Self {
            kind: ScalerKind::Standard,
            version: None,
            model_sha256: None,
            mean: Some(mean),
            scale: Some(scale),
            min: None,
            max: None,
        }
    }

    pub fn min_max(min: Vec<f32>, max: Vec<f32>) -> Self {
        Self {
            kind: ScalerKind::MinMax,
            version: None,
            model_sha256: None,
            mean: None,
            scale: None,
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Fitted transform in offset/divisor form: `(x - offset[i]) / divisor[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    kind: ScalerKind,
    offset: Vec<f32>,
    divisor: Vec<f32>,
}

fn pair(
    a: &Option<Vec<f32>>,
    b: &Option<Vec<f32>>,
    names: (&str, &str),
) -> Result<(Vec<f32>, Vec<f32>), ModelError> {
    match (a, b) {
        (Some(a), Some(b)) if a.len() == b.len() => Ok((a.clone(), b.clone())),
        (Some(a), Some(b)) => Err(ModelError::shape(
            format!("{} of length {}", names.1, a.len()),
            b.len(),
        )),
        _ => Err(ModelError::tensor(
            "scaler",
            format!("`{}` and `{}` required", names.0, names.1),
        )),
    }
}

impl Scaler {
    pub fn from_file(file: &ScalerFile) -> Result<Self, ModelError> {
        let (offset, divisor) = match file.kind {
            ScalerKind::Standard => {
                let (mean, scale) = pair(&file.mean, &file.scale, ("mean", "scale"))?;
                (mean, scale)
            }
            ScalerKind::MinMax => {
                let (min, max) = pair(&file.min, &file.max, ("min", "max"))?;
                let range = min.iter().zip(&max).map(|(lo, hi)| hi - lo).collect();
                (min, range)
            }
        };
        if offset.iter().chain(&divisor).any(|v| !v.is_finite()) {
            return Err(ModelError::tensor("scaler", "non-finite parameter"));
        }
        // Constant channels were fitted with zero spread; leave them unscaled.
        let divisor = divisor
            .into_iter()
            .map(|d| if d.abs() < f32::EPSILON { 1.0 } else { d })
            .collect();
        Ok(Self {
            kind: file.kind,
            offset,
            divisor,
        })
    }

    pub fn kind(&self) -> ScalerKind {
        self.kind
    }

    pub fn dim(&self) -> usize {
        self.offset.len()
    }

    /// Scale one timestep in place. `row.len()` must equal [`Self::dim`].
    pub fn transform_in_place(&self, row: &mut [f32]) {
        debug_assert_eq!(row.len(), self.dim());
        for ((x, o), d) in row.iter_mut().zip(&self.offset).zip(&self.divisor) {
            *x = (*x - o) / d;
        }
    }
}
