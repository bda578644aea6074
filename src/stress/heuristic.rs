//! Rule-based stress scoring for a single sample. Used whenever the sequence
//! model cannot answer: window not yet full, no artifact, or a failed call.
//!
//! | rule                | condition                          | weight         |
//! |---------------------|------------------------------------|----------------|
//! | low blink rate      | blinkRate < 10 /min                | 0.30           |
//! | reduced blink rate  | 10 ≤ blinkRate < 12                | 0.15           |
//! | high blink rate     | blinkRate > 25                     | 0.20           |
//! | eye closure         | either eye openness < 0.2          | 0.25           |
//! | brow tension        | linear                             | 0.20 × tension |
//! | jaw tension         | linear                             | 0.15 × tension |
//! | head movement       | headStability > 10                 | 0.15           |
//! | long hours          | hoursWorked > 12 (> 10)            | 0.15 (0.10)    |
//! | short sleep         | sleepHours < 5 (< 6)               | 0.15 (0.10)    |
//! | night shift         | shiftType = night                  | 0.05           |
//! | heavy screen time   | screenTime > 8 h                   | 0.05           |
//! | severe history      | stressHistory = severe             | 0.05           |
//!
//! The weighted sum is clamped to [0, 1] and reported on the 0–100 scale.

use super::prediction::{EngineState, Factor, Prediction, PredictionSource, Rule};
use super::Thresholds;
use crate::context::{SessionContext, ShiftType, StressHistory};
use crate::features::{Channel, FeatureVector};
use chrono::Utc;

pub const LOW_BLINK_RATE: f32 = 10.0;
pub const REDUCED_BLINK_RATE: f32 = 12.0;
pub const HIGH_BLINK_RATE: f32 = 25.0;
pub const EYE_OPENNESS_FLOOR: f32 = 0.2;
pub const HEAD_STABILITY_LIMIT: f32 = 10.0;

pub const LOW_BLINK_WEIGHT: f32 = 0.30;
pub const REDUCED_BLINK_WEIGHT: f32 = 0.15;
pub const HIGH_BLINK_WEIGHT: f32 = 0.20;
pub const EYE_CLOSURE_WEIGHT: f32 = 0.25;
pub const BROW_WEIGHT: f32 = 0.20;
pub const JAW_WEIGHT: f32 = 0.15;
pub const HEAD_MOVEMENT_WEIGHT: f32 = 0.15;

pub const LONG_HOURS: f32 = 10.0;
pub const VERY_LONG_HOURS: f32 = 12.0;
pub const SHORT_SLEEP: f32 = 6.0;
pub const VERY_SHORT_SLEEP: f32 = 5.0;
pub const HEAVY_SCREEN_TIME: f32 = 8.0;

pub const LONG_HOURS_WEIGHT: f32 = 0.10;
pub const VERY_LONG_HOURS_WEIGHT: f32 = 0.15;
pub const SHORT_SLEEP_WEIGHT: f32 = 0.10;
pub const VERY_SHORT_SLEEP_WEIGHT: f32 = 0.15;
pub const NIGHT_SHIFT_WEIGHT: f32 = 0.05;
pub const SCREEN_TIME_WEIGHT: f32 = 0.05;
pub const SEVERE_HISTORY_WEIGHT: f32 = 0.05;

/// Confidence of a bare single-sample heuristic.
pub const BASE_CONFIDENCE: f32 = 0.55;
pub const CONTEXT_CONFIDENCE_BONUS: f32 = 0.07;
pub const FULL_WINDOW_CONFIDENCE_BONUS: f32 = 0.08;
/// Highest confidence any heuristic output can carry.
pub const MAX_HEURISTIC_CONFIDENCE: f32 =
    BASE_CONFIDENCE + CONTEXT_CONFIDENCE_BONUS + FULL_WINDOW_CONFIDENCE_BONUS;

/// Confidence grows with the information behind the score.
pub fn heuristic_confidence(with_context: bool, window_full: bool) -> f32 {
    let mut c = BASE_CONFIDENCE;
    if with_context {
        c += CONTEXT_CONFIDENCE_BONUS;
    }
    if window_full {
        c += FULL_WINDOW_CONFIDENCE_BONUS;
    }
    c
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer {
    thresholds: Thresholds,
}

impl HeuristicScorer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Score a sample with no buffer information.
    pub fn score(&self, features: &FeatureVector, context: Option<&SessionContext>) -> Prediction {
        self.score_in_window(features, context, EngineState::Empty, 0.0)
    }

    /// Score a sample, recording the caller's buffer state. A full window raises
    /// confidence one tier.
    pub fn score_in_window(
        &self,
        features: &FeatureVector,
        context: Option<&SessionContext>,
        state: EngineState,
        window_fill: f32,
    ) -> Prediction {
        let context = context.filter(|c| !c.is_empty());
        let mut factors = facial_factors(features);
        if let Some(ctx) = context {
            factors.extend(context_factors(ctx));
        }
        let total: f32 = factors.iter().map(|f| f.points).sum();
        let score = total.clamp(0.0, 100.0);

        Prediction {
            level: self.thresholds.classify(score),
            score,
            confidence: heuristic_confidence(context.is_some(), state == EngineState::Ready),
            probabilities: None,
            top_class: None,
            source: PredictionSource::Heuristic,
            state,
            window_fill,
            factors,
            attention_peak: None,
            model_version: None,
            timestamp: Utc::now(),
        }
    }
}

fn factor(rule: Rule, weight: f32) -> Factor {
    Factor {
        rule,
        points: weight * 100.0,
    }
}

fn facial_factors(fv: &FeatureVector) -> Vec<Factor> {
    let mut out = Vec::new();

    let blink = fv.raw(Channel::BlinkRate);
    if blink < LOW_BLINK_RATE {
        out.push(factor(Rule::LowBlinkRate, LOW_BLINK_WEIGHT));
    } else if blink < REDUCED_BLINK_RATE {
        out.push(factor(Rule::ReducedBlinkRate, REDUCED_BLINK_WEIGHT));
    } else if blink > HIGH_BLINK_RATE {
        out.push(factor(Rule::HighBlinkRate, HIGH_BLINK_WEIGHT));
    }

    let left = fv.raw(Channel::LeftEyeOpenness);
    let right = fv.raw(Channel::RightEyeOpenness);
    if left < EYE_OPENNESS_FLOOR || right < EYE_OPENNESS_FLOOR {
        out.push(factor(Rule::EyeClosure, EYE_CLOSURE_WEIGHT));
    }

    let brow = fv.raw(Channel::BrowTension);
    if brow > 0.0 {
        out.push(factor(Rule::BrowTension, BROW_WEIGHT * brow));
    }
    let jaw = fv.raw(Channel::JawTension);
    if jaw > 0.0 {
        out.push(factor(Rule::JawTension, JAW_WEIGHT * jaw));
    }

    if fv.raw(Channel::HeadStability) > HEAD_STABILITY_LIMIT {
        out.push(factor(Rule::HeadMovement, HEAD_MOVEMENT_WEIGHT));
    }
    out
}

fn context_factors(ctx: &SessionContext) -> Vec<Factor> {
    let mut out = Vec::new();

    match ctx.hours_worked {
        Some(h) if h > VERY_LONG_HOURS => out.push(factor(Rule::LongHours, VERY_LONG_HOURS_WEIGHT)),
        Some(h) if h > LONG_HOURS => out.push(factor(Rule::LongHours, LONG_HOURS_WEIGHT)),
        _ => {}
    }
    match ctx.sleep_hours {
        Some(h) if h < VERY_SHORT_SLEEP => {
            out.push(factor(Rule::ShortSleep, VERY_SHORT_SLEEP_WEIGHT))
        }
        Some(h) if h < SHORT_SLEEP => out.push(factor(Rule::ShortSleep, SHORT_SLEEP_WEIGHT)),
        _ => {}
    }
    if ctx.shift_type == Some(ShiftType::Night) {
        out.push(factor(Rule::NightShift, NIGHT_SHIFT_WEIGHT));
    }
    if ctx.screen_time.is_some_and(|h| h > HEAVY_SCREEN_TIME) {
        out.push(factor(Rule::HeavyScreenTime, SCREEN_TIME_WEIGHT));
    }
    if ctx.stress_history == Some(StressHistory::Severe) {
        out.push(factor(Rule::SevereHistory, SEVERE_HISTORY_WEIGHT));
    }
    out
}
