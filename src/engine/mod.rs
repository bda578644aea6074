//! Per-session inference engine: feature extraction → window → model or
//! heuristic → [`Prediction`].
//!
//! State follows the buffer: `EMPTY` → `FILLING` → `READY`, back to `EMPTY`
//! only through [`InferenceEngine::reset`]. The model is consulted only in
//! `READY`; every other case, and any model error, is answered by the
//! heuristic scorer. `predict` has no error path.

use crate::config::EngineConfig;
use crate::context::SessionContext;
use crate::error::{EngineError, ModelError};
use crate::features::{Channel, FeatureExtractor, FeatureVector, RawMetrics, SequenceBuffer};
use crate::model::{SequenceModel, SharedModel};
use crate::stress::heuristic::MAX_HEURISTIC_CONFIDENCE;
use crate::stress::{
    EngineState, Factor, HeuristicScorer, Prediction, PredictionSource, Rule, Thresholds,
};
use chrono::Utc;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Points added on top of the model score from the current frame:
/// 10·brow + 5·(2 − left eye − right eye) + 5·jaw.
pub fn micro_adjustment(fv: &FeatureVector) -> f32 {
    let brow = fv.raw(Channel::BrowTension);
    let eye_strain = 2.0 - (fv.raw(Channel::LeftEyeOpenness) + fv.raw(Channel::RightEyeOpenness));
    let jaw = fv.raw(Channel::JawTension);
    brow * 10.0 + eye_strain * 5.0 + jaw * 5.0
}

/// Counters since construction (not cleared by reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub predictions: u64,
    pub model_predictions: u64,
    pub model_failures: u64,
    pub resets: u64,
}

#[derive(Debug)]
pub struct InferenceEngine {
    extractor: FeatureExtractor,
    scorer: HeuristicScorer,
    thresholds: Thresholds,
    buffer: SequenceBuffer,
    model: Option<SharedModel>,
    context: Option<SessionContext>,
    micro_adjustment: bool,
    latency_budget: Duration,
    stats: EngineStats,
}

impl InferenceEngine {
    /// Build an engine for one session. A supplied model must match the
    /// configured window length and schema arity exactly.
    pub fn new(config: &EngineConfig, model: Option<SharedModel>) -> Result<Self, EngineError> {
        config.validate()?;
        let thresholds = Thresholds::from_config(&config.thresholds)?;
        let schema = config.features.schema;

        if let Some(m) = &model {
            let d = m.descriptor();
            if d.window_len != config.features.window_len || d.feature_dim != schema.arity() {
                return Err(EngineError::Incompatible(ModelError::shape(
                    format!("window {} × {} channels", config.features.window_len, schema.arity()),
                    format!("window {} × {} channels", d.window_len, d.feature_dim),
                )));
            }
        }

        Ok(Self {
            extractor: FeatureExtractor::new(schema),
            scorer: HeuristicScorer::new(thresholds),
            thresholds,
            buffer: SequenceBuffer::new(config.features.window_len),
            model,
            context: None,
            micro_adjustment: config.inference.micro_adjustment,
            latency_budget: Duration::from_millis(config.inference.latency_budget_ms),
            stats: EngineStats::default(),
        })
    }

    pub fn state(&self) -> EngineState {
        if self.buffer.is_empty() {
            EngineState::Empty
        } else if self.buffer.is_full() {
            EngineState::Ready
        } else {
            EngineState::Filling
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn window_len(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Session-scoped context used when `predict` is called without one.
    pub fn set_context(&mut self, context: Option<SessionContext>) {
        self.context = context;
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Ingest one raw metrics record and classify.
    pub fn predict(&mut self, metrics: &RawMetrics, context: Option<&SessionContext>) -> Prediction {
        let started = Instant::now();
        let fv = self.extractor.extract(metrics);
        self.buffer.push(fv.clone());

        let state = self.state();
        let fill = self.buffer.len() as f32 / self.buffer.capacity() as f32;

        let attempt = match (&self.model, state) {
            (Some(model), EngineState::Ready) => Some(self.model_prediction(model.as_ref(), &fv, fill)),
            _ => None,
        };

        let prediction = match attempt {
            Some(Ok(p)) => {
                self.stats.model_predictions += 1;
                p
            }
            Some(Err(e)) => {
                self.stats.model_failures += 1;
                warn!(error = %e, "model inference failed; heuristic fallback for this sample");
                self.scorer
                    .score_in_window(&fv, context.or(self.context.as_ref()), state, fill)
            }
            None => self
                .scorer
                .score_in_window(&fv, context.or(self.context.as_ref()), state, fill),
        };
        self.stats.predictions += 1;

        let elapsed = started.elapsed();
        if elapsed > self.latency_budget {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.latency_budget.as_millis() as u64,
                "prediction over latency budget"
            );
        }
        debug!(
            level = prediction.level.as_str(),
            score = prediction.score,
            confidence = prediction.confidence,
            source = ?prediction.source,
            state = ?state,
            "prediction"
        );
        prediction
    }

    fn model_prediction(
        &self,
        model: &dyn SequenceModel,
        current: &FeatureVector,
        fill: f32,
    ) -> Result<Prediction, ModelError> {
        debug_assert!(self.buffer.is_full(), "model consulted before window filled");
        let window = self.buffer.snapshot();
        let out = model.infer(&window)?;
        out.ensure_finite()?;

        let mut score = out.probabilities.expected_score();
        let mut factors = Vec::new();
        if self.micro_adjustment {
            let bump = micro_adjustment(current);
            if bump != 0.0 {
                factors.push(Factor {
                    rule: Rule::MicroAdjustment,
                    points: bump,
                });
                score += bump;
            }
        }
        let score = score.clamp(0.0, 100.0);

        Ok(Prediction {
            level: self.thresholds.classify(score),
            score,
            confidence: out.raw_confidence.max(MAX_HEURISTIC_CONFIDENCE).min(1.0),
            attention_peak: out.attention_peak(),
            top_class: Some(out.probabilities.argmax()),
            probabilities: Some(out.probabilities),
            source: PredictionSource::Model,
            state: EngineState::Ready,
            window_fill: fill,
            factors,
            model_version: model.descriptor().version.clone(),
            timestamp: Utc::now(),
        })
    }

    /// Clear the window and the session context. Idempotent.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.context = None;
        self.stats.resets += 1;
        debug!("engine reset");
    }
}

impl Default for InferenceEngine {
    /// Heuristic-only engine with default configuration.
    fn default() -> Self {
        let config = EngineConfig::default();
        let thresholds = Thresholds::default();
        Self {
            extractor: FeatureExtractor::new(config.features.schema),
            scorer: HeuristicScorer::new(thresholds),
            thresholds,
            buffer: SequenceBuffer::new(config.features.window_len),
            model: None,
            context: None,
            micro_adjustment: config.inference.micro_adjustment,
            latency_budget: Duration::from_millis(config.inference.latency_budget_ms),
            stats: EngineStats::default(),
        }
    }
}
