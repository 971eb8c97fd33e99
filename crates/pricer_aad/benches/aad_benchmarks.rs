//! Criterion benchmarks for recording and reverse sweeps.
//!
//! Measures the cost of recording a Monte Carlo call payoff on the tape and
//! of the reverse sweep, across path counts, with both adjoint stores.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_aad::prelude::*;

/// Deterministic pseudo-normal draws, enough for timing purposes.
fn draws(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let u = (i as f64 + 0.5) / n as f64;
            (2.0 * std::f64::consts::PI * u).sin() * 1.5
        })
        .collect()
}

/// Records a discounted European call on terminal GBM prices.
fn record_call(tape: &Tape, z: &VectorNumeric) -> (DifferentiableValue, [DifferentiableValue; 3]) {
    let spot = tape.variable(100.0);
    let vol = tape.variable(0.2);
    let rate = tape.variable(0.03);
    let maturity = tape.constant(1.0);
    let normals = tape.constant(z.clone());

    let drift = rate
        .sub(&vol.squared().mult_scalar(0.5))
        .mult(&maturity);
    let diffusion = vol.mult(&maturity.sqrt()).mult(&normals);
    let terminal = spot.mult(&drift.add(&diffusion).exp());
    let payoff = terminal.sub_scalar(100.0).floor_scalar(0.0);
    let price = payoff
        .mult(&rate.mult(&maturity).mult_scalar(-1.0).exp())
        .average();
    (price, [spot, vol, rate])
}

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_call");
    for n_paths in [1_000, 10_000, 100_000] {
        let z = VectorNumeric::from_paths(draws(n_paths)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n_paths), &z, |b, z| {
            b.iter(|| {
                let tape = Tape::new();
                black_box(record_call(&tape, z).0.value_as_scalar())
            });
        });
    }
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_sweep");
    for evict in [false, true] {
        for n_paths in [1_000, 10_000, 100_000] {
            let config = AadConfig::builder()
                .evict_propagated(evict)
                .build()
                .unwrap();
            let tape = Tape::with_config(config);
            let z = VectorNumeric::from_paths(draws(n_paths)).unwrap();
            let (price, _) = record_call(&tape, &z);

            let label = if evict { "frontier" } else { "dense" };
            group.bench_with_input(BenchmarkId::new(label, n_paths), &price, |b, price| {
                b.iter(|| black_box(price.gradient().len()));
            });
        }
    }
    group.finish();
}

/// Long scalar chains stress per-node overhead rather than path arithmetic.
fn bench_deep_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_chain");
    for depth in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let tape = Tape::new();
                let x = tape.variable(0.5);
                let mut acc = x.clone();
                for _ in 0..depth {
                    acc = acc.sin().add(&x);
                }
                black_box(acc.gradient().expectation(&x))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_record, bench_sweep, bench_deep_chain);
criterion_main!(benches);
