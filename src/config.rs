//! Engine configuration. Constructed once at startup and handed to every
//! session; nothing here is mutated afterwards.

use crate::error::ConfigError;
use crate::features::FeatureSchema;
use crate::model::ModelKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sequence model artifact location and load policy
    pub model: ModelConfig,
    /// Feature schema and window length
    pub features: FeaturesConfig,
    /// Score → level thresholds shared by every scoring path
    pub thresholds: ThresholdConfig,
    /// Per-call inference behaviour
    pub inference: InferenceConfig,
    /// Session hub sizing
    pub sessions: SessionConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the paired weights + scaler files
    pub artifact_dir: PathBuf,
    pub kind: ModelKind,
    /// Fail startup instead of degrading to heuristic-only when the artifact is unusable
    pub required: bool,
    /// Skip loading entirely
    pub heuristic_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub schema: FeatureSchema,
    /// Number of samples per model window
    pub window_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Scores at or above this are medium (0–100)
    pub medium: f32,
    /// Scores at or above this are high
    pub high: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Add current-frame brow/eye/jaw bumps on top of the model score
    pub micro_adjustment: bool,
    /// Predictions slower than this are logged
    pub latency_budget_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Command queue depth per session
    pub queue_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

/// `$XDG_DATA_HOME/stress-engine/models` or a local fallback.
pub fn default_artifact_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("stress-engine").join("models"))
        .unwrap_or_else(|| PathBuf::from(".stress-engine/models"))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            features: FeaturesConfig::default(),
            thresholds: ThresholdConfig::default(),
            inference: InferenceConfig::default(),
            sessions: SessionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            kind: ModelKind::AttentionLstm,
            required: false,
            heuristic_only: false,
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            schema: FeatureSchema::Enhanced,
            window_len: 30,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            medium: 33.0,
            high: 66.0,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            micro_adjustment: true,
            latency_budget_ms: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { queue_depth: 64 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = self.medium > 0.0 && self.medium < self.high && self.high < 100.0;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Thresholds {
                medium: self.medium,
                high: self.high,
            })
        }
    }
}

impl EngineConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "config unreadable; using defaults");
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        if self.features.window_len == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let c = EngineConfig::load(Path::new("definitely-not-here.json"));
        assert_eq!(c.features.window_len, 30);
        assert_eq!(c.thresholds, ThresholdConfig::default());
        assert!(!c.model.required);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"features":{"schema":"compact","window_len":10},"log":{"json":false}}"#,
        )
        .unwrap();
        let c = EngineConfig::try_load(&path).unwrap();
        assert_eq!(c.features.schema, FeatureSchema::Compact);
        assert_eq!(c.features.window_len, 10);
        assert!(!c.log.json);
        assert_eq!(c.log.level, "info");
        assert_eq!(c.thresholds.high, 66.0);
    }

    #[test]
    fn malformed_file_is_reported_by_try_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            EngineConfig::try_load(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(EngineConfig::load(&path).features.window_len, 30);
    }

    #[test]
    fn threshold_validation() {
        assert!(ThresholdConfig::default().validate().is_ok());
        let bad = ThresholdConfig {
            medium: 70.0,
            high: 60.0,
        };
        assert!(bad.validate().is_err());
        let mut c = EngineConfig::default();
        c.features.window_len = 0;
        assert!(matches!(c.validate(), Err(ConfigError::EmptyWindow)));
    }
}
