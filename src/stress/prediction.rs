//! The engine's per-call output record.

use super::StressLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which scoring path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Heuristic,
    Model,
}

/// Buffer fill state at prediction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    Empty,
    Filling,
    Ready,
}

/// Named rule of the heuristic table (see [`super::HeuristicScorer`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    LowBlinkRate,
    ReducedBlinkRate,
    HighBlinkRate,
    EyeClosure,
    BrowTension,
    JawTension,
    HeadMovement,
    LongHours,
    ShortSleep,
    NightShift,
    HeavyScreenTime,
    SevereHistory,
    /// Model path: current-frame brow/eye/jaw bumps
    MicroAdjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub rule: Rule,
    /// Points added on the 0–100 scale
    pub points: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub low: f32,
    pub medium: f32,
    pub high: f32,
}

impl ClassProbabilities {
    pub fn from_array(p: [f32; 3]) -> Self {
        Self {
            low: p[0],
            medium: p[1],
            high: p[2],
        }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.low, self.medium, self.high]
    }

    /// Expected score with class anchors 0 / 50 / 100.
    pub fn expected_score(&self) -> f32 {
        self.medium * 50.0 + self.high * 100.0
    }

    pub fn argmax(&self) -> StressLevel {
        let p = self.as_array();
        let mut best = 0;
        for i in 1..3 {
            if p[i] > p[best] {
                best = i;
            }
        }
        StressLevel::ALL[best]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub level: StressLevel,
    /// 0–100
    pub score: f32,
    /// 0–1
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,
    /// Most probable class; can differ from `level`, which follows the score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_class: Option<StressLevel>,
    pub source: PredictionSource,
    pub state: EngineState,
    /// Fraction of the window filled, 0–1
    pub window_fill: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<Factor>,
    /// Window index the model attended to most
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attention_peak: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_score_uses_class_anchors() {
        let p = ClassProbabilities::from_array([0.2, 0.3, 0.5]);
        assert!((p.expected_score() - 65.0).abs() < 1e-4);
        assert_eq!(p.argmax(), StressLevel::High);
        assert_eq!(ClassProbabilities::from_array([1.0, 0.0, 0.0]).expected_score(), 0.0);
    }

    #[test]
    fn argmax_prefers_first_on_tie() {
        let p = ClassProbabilities::from_array([0.4, 0.4, 0.2]);
        assert_eq!(p.argmax(), StressLevel::Low);
    }
}
