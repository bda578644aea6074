//! Pipeline benchmark: raw metrics → extract → buffer → prediction, on the
//! heuristic path and with a loaded model.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use stress_engine::config::EngineConfig;
use stress_engine::context::SessionContext;
use stress_engine::features::{FeatureExtractor, FeatureSchema, RawMetrics};
use stress_engine::model::{AttentionLstm, Scaler, SharedModel};
use stress_engine::InferenceEngine;

#[path = "../tests/common/mod.rs"]
mod common;

fn metrics() -> RawMetrics {
    RawMetrics::new()
        .with("blinkRate", 11.0)
        .with("leftEyeOpenness", 0.35)
        .with("rightEyeOpenness", 0.3)
        .with("browTension", 0.4)
        .with("jawTension", 0.2)
        .with("headStability", 4.0)
        .with("gameReaction", 420.0)
}

fn bench_extract(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(FeatureSchema::Enhanced);
    let raw = metrics();
    c.bench_function("extract_enhanced", |b| b.iter(|| extractor.extract(black_box(&raw))));
}

fn bench_heuristic_predict(c: &mut Criterion) {
    let mut engine = InferenceEngine::default();
    let raw = metrics();
    let ctx = SessionContext::new().with_hours_worked(11.0).with_sleep_hours(5.5);
    c.bench_function("predict_heuristic", |b| {
        b.iter(|| engine.predict(black_box(&raw), Some(&ctx)))
    });
}

fn bench_model_predict(c: &mut Criterion) {
    let config = EngineConfig::default();
    let window = config.features.window_len;
    let artifact = common::lstm_artifact(FeatureSchema::Enhanced, window, 64, 7);
    let scaler = Scaler::from_file(&common::identity_scaler(24)).unwrap();
    let model: SharedModel = Arc::new(AttentionLstm::from_artifact(&artifact, scaler).unwrap());
    let mut engine = InferenceEngine::new(&config, Some(model)).unwrap();
    let raw = metrics();
    for _ in 0..window {
        engine.predict(&raw, None);
    }
    c.bench_function("predict_model_ready", |b| b.iter(|| engine.predict(black_box(&raw), None)));
}

criterion_group!(benches, bench_extract, bench_heuristic_predict, bench_model_predict);
criterion_main!(benches);
