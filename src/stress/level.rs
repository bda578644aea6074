//! Score → level classification. One threshold pair serves every scoring path.

use crate::config::ThresholdConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub const ALL: [StressLevel; 3] = [StressLevel::Low, StressLevel::Medium, StressLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            StressLevel::Low => "LOW",
            StressLevel::Medium => "MEDIUM",
            StressLevel::High => "HIGH",
        }
    }
}

/// Validated, copyable threshold pair on the 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    medium: f32,
    high: f32,
}

impl Thresholds {
    pub fn from_config(config: &ThresholdConfig) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        Ok(Self {
            medium: config.medium,
            high: config.high,
        })
    }

    pub fn classify(&self, score: f32) -> StressLevel {
        if score >= self.high {
            StressLevel::High
        } else if score >= self.medium {
            StressLevel::Medium
        } else {
            StressLevel::Low
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        let c = ThresholdConfig::default();
        Self {
            medium: c.medium,
            high: c.high,
        }
    }
}
