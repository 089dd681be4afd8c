//! Criterion micro-benchmarks for the diffusion solver's hot paths.

use std::sync::Arc;

use conduction_bench::{prepared_solver, reference_profile, stress_profile};
use conduction_comm::SerialComm;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Benchmark: explicit right-hand side on the 10K-node plate.
fn bench_construct_rhs_10k(c: &mut Criterion) {
    let mut solver = prepared_solver(reference_profile(), Arc::new(SerialComm)).unwrap();
    solver.temperature_mut().write(1.0).unwrap();

    c.bench_function("construct_rhs_10k", |b| {
        b.iter(|| {
            let rhs = solver.construct_rhs(black_box(1e-5)).unwrap();
            black_box(rhs.global()[0]);
        });
    });
}

/// Benchmark: operator assembly, scaling and boundary overwrite on the
/// 10K-node plate.
fn bench_construct_matrix_10k(c: &mut Criterion) {
    let mut solver = prepared_solver(reference_profile(), Arc::new(SerialComm)).unwrap();

    c.bench_function("construct_matrix_10k", |b| {
        b.iter(|| {
            let m = solver.construct_matrix(false, black_box(1e-5)).unwrap();
            black_box(m.nnz());
        });
    });
}

/// Benchmark: one Crank–Nicolson step (matrix build, rhs, BiCGSTAB) on the
/// 10K-node plate.
fn bench_timestep_10k(c: &mut Criterion) {
    let mut solver = prepared_solver(reference_profile(), Arc::new(SerialComm)).unwrap();
    let dt = solver.calculate_dt().unwrap();

    c.bench_function("timestep_10k", |b| {
        b.iter(|| {
            let t = solver.timestep(1, Some(dt)).unwrap();
            black_box(t.global()[0]);
        });
    });
}

/// Benchmark: right-hand side on the ~100K-node plate.
fn bench_construct_rhs_100k(c: &mut Criterion) {
    let mut solver = prepared_solver(stress_profile(), Arc::new(SerialComm)).unwrap();

    c.bench_function("construct_rhs_100k", |b| {
        b.iter(|| {
            let rhs = solver.construct_rhs(black_box(1e-6)).unwrap();
            black_box(rhs.global()[0]);
        });
    });
}

criterion_group!(
    benches,
    bench_construct_rhs_10k,
    bench_construct_matrix_10k,
    bench_timestep_10k,
    bench_construct_rhs_100k
);
criterion_main!(benches);
