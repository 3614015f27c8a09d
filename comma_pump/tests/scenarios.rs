// End-to-end scenarios through the public API.
//
// Covers the explorer's main flows: sweeping the 5-limit lattice for the
// syntonic comma, canonicalizing pump sets with trivial and nontrivial
// kernels, the reach pre-check rejecting a target before any search, and
// cancellation of a running search. The last test chains sweep, vocabulary,
// session and walk the way the `pumps` binary does.

use comma_pump::canonical::PumpCanonicalizer;
use comma_pump::comma::enumerate;
use comma_pump::monzo::{Step, cents};
use comma_pump::schedule::{Incremental, StopReason};
use comma_pump::session::PumpSession;
use comma_pump::solver::{PumpSolver, SolverConfig, SolverEvent, SolverPhase};
use comma_pump::vector::apply_columns;
use comma_pump::vocabulary::generate_vocabulary;
use comma_pump::walk::{WalkOptions, build_pump_walk};

const PRIMES: [u64; 3] = [2, 3, 5];

fn steps(monzos: &[&[i64]]) -> Vec<Step> {
    monzos.iter().map(|m| Step::from_monzo(m.to_vec())).collect()
}

fn deterministic(coeff_bound: u32) -> SolverConfig {
    SolverConfig {
        coeff_bound,
        max_solutions: 200,
        time_budget_ms: None,
        chunk_ms: 0,
        l1_cap: None,
        iterative_deepen: true,
    }
}

#[test]
fn syntonic_comma_in_five_limit_sweep() {
    let commas = enumerate(&PRIMES, 5, 30.0).unwrap();
    let syntonic = commas
        .iter()
        .find(|c| c.monzo == vec![-4, 4, -1])
        .expect("81/80 missing from sweep");
    assert!((syntonic.cents - 21.506).abs() < 1e-3);
    assert!(commas.iter().all(|c| c.cents <= 30.0));
}

#[test]
fn trivial_kernel_keeps_every_pump() {
    let s = steps(&[&[1, 0], &[0, 1]]);
    let mut canon = PumpCanonicalizer::new();
    let mut out = canon
        .canonicalize(&[vec![1, 0], vec![0, 1], vec![2, -1]], &s)
        .unwrap();
    out.sort();
    assert_eq!(out, vec![vec![0, 1], vec![1, 0], vec![2, -1]]);
}

#[test]
fn kernel_collapses_redundant_pumps() {
    let s = steps(&[&[1, 0], &[0, 1], &[1, 1]]);
    let mut canon = PumpCanonicalizer::new();
    let pumps = vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1], vec![1, 1, -1]];
    let out = canon.canonicalize(&pumps, &s).unwrap();
    assert!(out.len() < 4);
}

#[test]
fn unreachable_target_rejected_before_search() {
    let s = steps(&[&[1, 0], &[0, 1]]);
    let (mut solver, _) = PumpSolver::new(&[7, 0], &s, deterministic(3)).unwrap();
    let events = solver.run_to_end();

    assert_eq!(solver.phase(), SolverPhase::Rejected);
    assert_eq!(solver.leaves_visited(), 0);
    assert!(!events.iter().any(|e| matches!(
        e,
        SolverEvent::Progress(p) if matches!(p.phase, SolverPhase::Search { .. })
    )));
    let Some(SolverEvent::Done(outcome)) = events.last() else {
        panic!("expected Done, got {events:?}");
    };
    assert_eq!(outcome.reason, StopReason::UnreachableBounds);
    assert!(outcome.solutions.is_empty());
}

#[test]
fn cancel_mid_search_finishes_exactly_once() {
    let vocab = generate_vocabulary(&PRIMES, 11, 10);
    let (mut solver, cancel) = PumpSolver::new(&[-4, 4, -1], &vocab, deterministic(6)).unwrap();

    let first = solver.step();
    assert!(!first.iter().any(|e| matches!(e, SolverEvent::Done(_))));
    assert!(matches!(solver.phase(), SolverPhase::Search { .. }));

    cancel.cancel();
    let rest = solver.run_to_end();
    assert_eq!(rest.len(), 1);
    let SolverEvent::Done(outcome) = &rest[0] else {
        panic!("expected Done, got {rest:?}");
    };
    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert!(outcome.partial);

    cancel.cancel();
    assert!(solver.step().is_empty());
    assert_eq!(solver.phase(), SolverPhase::Cancelled);
}

#[test]
fn syntonic_pumps_over_default_vocabulary() {
    let commas = enumerate(&PRIMES, 5, 30.0).unwrap();
    let target = commas
        .iter()
        .find(|c| c.monzo == vec![-4, 4, -1])
        .map(|c| c.monzo.clone())
        .unwrap();
    let chosen: Vec<Step> = generate_vocabulary(&PRIMES, 11, 60).into_iter().take(5).collect();

    let mut canon = PumpCanonicalizer::new();
    let (session, _) = PumpSession::start(&target, &chosen, deterministic(6), &mut canon).unwrap();
    let report = session.run(|_| {}).unwrap();
    assert!(!report.canonical.is_empty());
    assert!(report.canonical.len() <= report.raw.solutions.len());

    let columns: Vec<Vec<i64>> = chosen.iter().map(|s| s.monzo.clone()).collect();
    let expected_cents = cents(&target, &PRIMES);
    for pump in &report.canonical {
        assert_eq!(apply_columns(&columns, pump, PRIMES.len()), target);
        let walk = build_pump_walk(pump, &chosen, &PRIMES, &WalkOptions::default()).unwrap();
        assert!((walk.summary.net_cents - expected_cents).abs() < 1e-6);
    }
}
