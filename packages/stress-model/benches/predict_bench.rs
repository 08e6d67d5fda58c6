//! Benchmark suite for stress-model inference
//!
//! Run with: cargo bench -p stress-model

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use stress_model::train::{train_forest, Dataset, ForestParams};
use stress_model::{MockClassifier, StressClassifier, StressPredictor};

const SAMPLE: [f64; 5] = [88.0, 0.45, 0.52, 0.48, 0.5];

fn bench_mock_predict(c: &mut Criterion) {
    let mock = MockClassifier::new();
    c.bench_function("mock_predict_proba", |b| {
        b.iter(|| mock.predict_proba(black_box(&SAMPLE)))
    });
}

fn bench_forest_predict(c: &mut Criterion) {
    let data = Dataset::synthetic(600, 42);
    let mut group = c.benchmark_group("forest_predict_proba");

    for trees in [10, 50, 100] {
        let params = ForestParams {
            n_estimators: trees,
            ..ForestParams::default()
        };
        let forest = train_forest(&data, &params).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(trees), &trees, |b, _| {
            b.iter(|| forest.predict_proba(black_box(&SAMPLE)))
        });
    }
    group.finish();
}

fn bench_batch_predict(c: &mut Criterion) {
    let predictor = StressPredictor::mock();
    let items: Vec<_> = (0..100)
        .map(|i| {
            json!({
                "heart_rate": 60 + i,
                "ecg": 0.3,
                "emg": 0.4,
                "gsr": 0.5,
                "resp": 0.6
            })
        })
        .collect();

    c.bench_function("batch_predict_100_mock", |b| {
        b.iter(|| predictor.batch_predict(black_box(&items)))
    });
}

fn bench_training(c: &mut Criterion) {
    let data = Dataset::synthetic(300, 7);
    let params = ForestParams {
        n_estimators: 20,
        ..ForestParams::default()
    };

    c.bench_function("train_forest_300x20", |b| {
        b.iter(|| train_forest(black_box(&data), &params))
    });
}

criterion_group!(
    benches,
    bench_mock_predict,
    bench_forest_predict,
    bench_batch_predict,
    bench_training
);
criterion_main!(benches);
