// Benchmarks for the pump search, kernel computation and canonicalization.
//
// The step sets are prefixes of the default 11-odd-limit, 5-limit vocabulary
// and the target is the syntonic comma, matching the explorer's start state.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use comma_pump::canonical::PumpCanonicalizer;
use comma_pump::kernel::{nullspace, step_matrix};
use comma_pump::monzo::{Monzo, Step};
use comma_pump::solver::{SolverConfig, solve};
use comma_pump::vocabulary::generate_vocabulary;

const PRIMES: [u64; 3] = [2, 3, 5];
const SYNTONIC: [i64; 3] = [-4, 4, -1];

fn vocabulary(count: usize) -> Vec<Step> {
    generate_vocabulary(&PRIMES, 11, count)
}

fn config(coeff_bound: u32) -> SolverConfig {
    SolverConfig {
        coeff_bound,
        max_solutions: 200,
        time_budget_ms: None,
        chunk_ms: 0,
        l1_cap: None,
        iterative_deepen: true,
    }
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("mitm_solve");
    group.sample_size(20);

    for count in [4, 6, 8] {
        let steps = vocabulary(count);
        group.bench_with_input(BenchmarkId::new("syntonic_b4", count), &count, |b, _| {
            b.iter(|| black_box(solve(&SYNTONIC, &steps, config(4))))
        });
    }

    group.finish();
}

fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("nullspace");

    for count in [5, 10, 20] {
        let columns: Vec<Monzo> = vocabulary(count).into_iter().map(|s| s.monzo).collect();
        let matrix = step_matrix(&columns);
        group.bench_with_input(BenchmarkId::new("vocab", count), &count, |b, _| {
            b.iter(|| black_box(nullspace(&matrix)))
        });
    }

    group.finish();
}

fn bench_canonicalize(c: &mut Criterion) {
    let steps = vocabulary(6);
    let Ok(outcome) = solve(&SYNTONIC, &steps, config(4)) else {
        return;
    };
    c.bench_function("canonicalize_syntonic_6", |b| {
        b.iter(|| {
            let mut canon = PumpCanonicalizer::new();
            black_box(canon.canonicalize(&outcome.solutions, &steps))
        })
    });
}

criterion_group!(benches, bench_solver, bench_kernel, bench_canonicalize);
criterion_main!(benches);
