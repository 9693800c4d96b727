// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — CDI Guardrail Scoring Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the Level 1 hot path (full vs fast
//! pressure) and the Level 2 audit path.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cdi_core::{compute_cdi, Activation, CdiGuard, DetailedOptions, Mlp, Tensor};
use cdi_types::{GuardConfig, PressureMode};

fn guard(mode: PressureMode) -> CdiGuard<Mlp> {
    let model = Mlp::random(&[64, 128, 128, 10], Activation::Relu, 42).unwrap();
    let config = GuardConfig {
        activation_layers: vec!["act1".into(), "act2".into()],
        pressure_mode: mode,
        ..GuardConfig::default()
    };
    CdiGuard::new(Arc::new(model), config).unwrap()
}

fn input() -> Tensor {
    let row: Vec<f64> = (0..64).map(|i| ((i as f64) * 0.37).sin()).collect();
    Tensor::from_rows(&[row]).unwrap()
}

// ── compute_cdi ─────────────────────────────────────────────────────

fn bench_compute_cdi(c: &mut Criterion) {
    c.bench_function("compute_cdi", |b| {
        b.iter(|| compute_cdi(black_box(0.42), black_box(0.07)))
    });
}

// ── CdiGuard.forward_with_cdi() ─────────────────────────────────────

fn bench_forward_with_cdi_full(c: &mut Criterion) {
    let guard = guard(PressureMode::Full);
    let x = input();
    c.bench_function("forward_with_cdi_full", |b| {
        b.iter(|| guard.forward_with_cdi(black_box(&x), black_box(&[3])))
    });
}

fn bench_forward_with_cdi_fast(c: &mut Criterion) {
    let guard = guard(PressureMode::Fast);
    let x = input();
    c.bench_function("forward_with_cdi_fast", |b| {
        b.iter(|| guard.forward_with_cdi(black_box(&x), black_box(&[3])))
    });
}

// ── CdiGuard.forward_detailed() ─────────────────────────────────────

fn bench_forward_detailed(c: &mut Criterion) {
    let guard = guard(PressureMode::Fast);
    let x = input();
    let opts = DetailedOptions {
        stability_samples: 4,
        ..DetailedOptions::default().with_seed(7)
    };
    c.bench_function("forward_detailed_4samples", |b| {
        b.iter(|| guard.forward_detailed(black_box(&x), black_box(&[3]), &opts))
    });
}

criterion_group!(
    benches,
    bench_compute_cdi,
    bench_forward_with_cdi_full,
    bench_forward_with_cdi_fast,
    bench_forward_detailed,
);
criterion_main!(benches);
