//! Inference benchmark: full window → attention LSTM class distribution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stress_engine::features::{FeatureSchema, FeatureVector};
use stress_engine::SequenceModel;

#[path = "../tests/common/mod.rs"]
mod common;

fn window(schema: FeatureSchema, len: usize) -> Vec<FeatureVector> {
    (0..len)
        .map(|i| {
            let v = (0..schema.arity()).map(|j| ((i + j) % 10) as f32 / 10.0).collect();
            FeatureVector::from_normalized(schema, v).unwrap()
        })
        .collect()
}

fn model(schema: FeatureSchema, len: usize, hidden: usize) -> stress_engine::model::AttentionLstm {
    let artifact = common::lstm_artifact(schema, len, hidden, 42);
    let scaler = stress_engine::model::Scaler::from_file(&common::identity_scaler(schema.arity())).unwrap();
    stress_engine::model::AttentionLstm::from_artifact(&artifact, scaler).unwrap()
}

fn bench_attention_lstm(c: &mut Criterion) {
    let m = model(FeatureSchema::Enhanced, 30, 64);
    let w = window(FeatureSchema::Enhanced, 30);
    c.bench_function("attention_lstm_30x24_h64", |b| b.iter(|| m.infer(black_box(&w)).unwrap()));
}

fn bench_hidden_size(c: &mut Criterion) {
    let w = window(FeatureSchema::Enhanced, 30);
    let mut g = c.benchmark_group("attention_lstm_by_hidden");
    for hidden in [16, 32, 64, 128] {
        let m = model(FeatureSchema::Enhanced, 30, hidden);
        g.bench_function(format!("hidden_{hidden}").as_str(), |b| {
            b.iter(|| m.infer(black_box(&w)).unwrap())
        });
    }
    g.finish();
}

criterion_group!(benches, bench_attention_lstm, bench_hidden_size);
criterion_main!(benches);
