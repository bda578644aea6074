//! Stress levels, the shared threshold table, the heuristic scorer and the
//! prediction record every path returns.

pub mod heuristic;
mod level;
mod prediction;

pub use heuristic::HeuristicScorer;
pub use level::{StressLevel, Thresholds};
pub use prediction::{
    ClassProbabilities, EngineState, Factor, Prediction, PredictionSource, Rule,
};
