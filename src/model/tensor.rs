//! Named weight tensors as stored in `model.json`: either an inline `data`
//! array or `b64`, little-endian f32 packed and base64 encoded.

use crate::error::ModelError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ndarray::{Array1, Array2, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorData {
    pub shape: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64: Option<String>,
}

impl TensorData {
    /// Pack values as base64 little-endian f32.
    pub fn packed(shape: Vec<usize>, values: &[f32]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self {
            shape,
            data: None,
            b64: Some(BASE64.encode(bytes)),
        }
    }

    pub fn inline(shape: Vec<usize>, values: Vec<f32>) -> Self {
        Self {
            shape,
            data: Some(values),
            b64: None,
        }
    }

    fn values(&self, name: &str) -> Result<Vec<f32>, ModelError> {
        match (&self.data, &self.b64) {
            (Some(v), None) => Ok(v.clone()),
            (None, Some(encoded)) => {
                let raw = BASE64
                    .decode(encoded)
                    .map_err(|e| ModelError::tensor(name, format!("base64: {e}")))?;
                if raw.len() % 4 != 0 {
                    return Err(ModelError::tensor(name, "packed length not a multiple of 4"));
                }
                Ok(raw
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect())
            }
            _ => Err(ModelError::tensor(name, "exactly one of `data` or `b64` required")),
        }
    }

    pub fn decode(&self, name: &str) -> Result<ArrayD<f32>, ModelError> {
        let values = self.values(name)?;
        let expected: usize = self.shape.iter().product();
        if values.len() != expected {
            return Err(ModelError::tensor(
                name,
                format!("{} values for shape {:?}", values.len(), self.shape),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::tensor(name, "non-finite weight"));
        }
        ArrayD::from_shape_vec(IxDyn(&self.shape), values)
            .map_err(|e| ModelError::tensor(name, e.to_string()))
    }
}

/// Lookup over a tensor map with shape checking.
pub struct TensorStore<'a> {
    tensors: &'a HashMap<String, TensorData>,
}

impl<'a> TensorStore<'a> {
    pub fn new(tensors: &'a HashMap<String, TensorData>) -> Self {
        Self { tensors }
    }

    fn get(&self, name: &str) -> Result<&TensorData, ModelError> {
        self.tensors
            .get(name)
            .ok_or_else(|| ModelError::tensor(name, "missing"))
    }

    pub fn matrix(&self, name: &str, rows: usize, cols: usize) -> Result<Array2<f32>, ModelError> {
        let t = self.get(name)?;
        if t.shape != [rows, cols] {
            return Err(ModelError::shape(
                format!("{name} [{rows}, {cols}]"),
                format!("{:?}", t.shape),
            ));
        }
        t.decode(name)?
            .into_dimensionality()
            .map_err(|e| ModelError::tensor(name, e.to_string()))
    }

    pub fn vector(&self, name: &str, len: usize) -> Result<Array1<f32>, ModelError> {
        let t = self.get(name)?;
        if t.shape != [len] {
            return Err(ModelError::shape(format!("{name} [{len}]"), format!("{:?}", t.shape)));
        }
        t.decode(name)?
            .into_dimensionality()
            .map_err(|e| ModelError::tensor(name, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_and_inline_decode_alike() {
        let values = vec![1.5, -2.0, 0.25, 8.0, 0.0, -0.125];
        let a = TensorData::packed(vec![2, 3], &values).decode("a").unwrap();
        let b = TensorData::inline(vec![2, 3], values).decode("b").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), &[2, 3]);
    }

    #[test]
    fn rejects_wrong_element_count() {
        let t = TensorData::inline(vec![2, 2], vec![1.0, 2.0, 3.0]);
        assert!(matches!(t.decode("w"), Err(ModelError::Tensor { .. })));
    }

    #[test]
    fn rejects_both_or_neither_source() {
        let mut t = TensorData::packed(vec![1], &[1.0]);
        t.data = Some(vec![1.0]);
        assert!(t.decode("w").is_err());
        let empty = TensorData {
            shape: vec![1],
            data: None,
            b64: None,
        };
        assert!(empty.decode("w").is_err());
    }

    #[test]
    fn store_checks_shapes() {
        let mut map = HashMap::new();
        map.insert("w".to_string(), TensorData::inline(vec![2, 3], vec![0.0; 6]));
        let store = TensorStore::new(&map);
        assert!(store.matrix("w", 2, 3).is_ok());
        assert!(matches!(store.matrix("w", 3, 2), Err(ModelError::ShapeMismatch { .. })));
        assert!(store.vector("missing", 3).is_err());
    }
}
