// Property-based tests for the lattice invariants: sweep filtering, solver
// exactness and completeness, kernel soundness, and canonical-form
// idempotence and image uniqueness.
//
// See also: `solver.rs`, `kernel.rs`, `canonical.rs` for the unit tests that
// pin specific cases.

use proptest::prelude::*;
use rustc_hash::FxHashSet;

use crate::canonical::PumpCanonicalizer;
use crate::comma::enumerate;
use crate::kernel::nullspace;
use crate::monzo::{Monzo, Step, cents, normalize_primitive};
use crate::schedule::StopReason;
use crate::solver::{SolverConfig, is_feasible_by_row_gcd, solve};
use crate::vector::{apply_columns, cmp_l1_lex, is_zero};

const BOUND: i64 = 2;

fn exhaustive() -> SolverConfig {
    SolverConfig {
        coeff_bound: BOUND as u32,
        max_solutions: 100_000,
        time_budget_ms: None,
        chunk_ms: 0,
        l1_cap: None,
        iterative_deepen: true,
    }
}

/// 1 to 4 step monzos of a shared dimension 1 to 3, entries in [-2, 2].
fn step_set() -> impl Strategy<Value = Vec<Monzo>> {
    (1usize..=3).prop_flat_map(|dim| {
        prop::collection::vec(prop::collection::vec(-2i64..=2, dim), 1..=4)
    })
}

/// A step set together with a coefficient vector for it.
fn steps_and_coeffs() -> impl Strategy<Value = (Vec<Monzo>, Vec<i64>)> {
    step_set().prop_flat_map(|cols| {
        let k = cols.len();
        (Just(cols), prop::collection::vec(-2i64..=2, k))
    })
}

fn as_steps(cols: &[Monzo]) -> Vec<Step> {
    cols.iter().cloned().map(Step::from_monzo).collect()
}

fn brute_force(target: &[i64], cols: &[Monzo], bound: i64) -> Vec<Vec<i64>> {
    let k = cols.len();
    let mut out = Vec::new();
    let mut x = vec![-bound; k];
    loop {
        if apply_columns(cols, &x, target.len()) == target {
            out.push(x.clone());
        }
        let mut i = 0;
        loop {
            if i == k {
                out.sort_by(|a, b| cmp_l1_lex(a, b));
                return out;
            }
            if x[i] < bound {
                x[i] += 1;
                break;
            }
            x[i] = -bound;
            i += 1;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sweep_respects_threshold_and_primitive_uniqueness(
        exp_bound in 1u32..=2,
        max_cents in 0.0f64..150.0,
    ) {
        let primes = [2, 3, 5];
        let commas = enumerate(&primes, exp_bound, max_cents).unwrap();
        let mut forms = FxHashSet::default();
        for c in &commas {
            prop_assert!(cents(&c.monzo, &primes).abs() <= max_cents);
            prop_assert!(forms.insert(normalize_primitive(&c.monzo)));
        }
    }

    #[test]
    fn solver_finds_exactly_the_bounded_solutions((cols, x) in steps_and_coeffs()) {
        let dim = cols[0].len();
        let target = apply_columns(&cols, &x, dim);
        prop_assume!(!is_zero(&target));

        let outcome = solve(&target, &as_steps(&cols), exhaustive()).unwrap();
        prop_assert_eq!(outcome.reason, StopReason::Complete);
        for s in &outcome.solutions {
            prop_assert_eq!(&apply_columns(&cols, s, dim), &target);
            prop_assert!(s.iter().all(|c| c.abs() <= BOUND));
        }
        prop_assert_eq!(outcome.solutions, brute_force(&target, &cols, BOUND));
    }

    #[test]
    fn kernel_vectors_map_to_zero(
        matrix in (1usize..=3, 1usize..=5).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(prop::collection::vec(-3i64..=3, cols), rows)
        })
    ) {
        let basis = nullspace(&matrix).unwrap();
        let cols = matrix[0].len();
        prop_assert!(basis.len() >= cols.saturating_sub(matrix.len()));
        for k in &basis {
            prop_assert!(!is_zero(k));
            for row in &matrix {
                let s: i64 = row.iter().zip(k).map(|(a, b)| a * b).sum();
                prop_assert_eq!(s, 0);
            }
        }
    }

    #[test]
    fn row_gcd_rejection_is_sound((cols, target) in step_set().prop_flat_map(|cols| {
        let dim = cols[0].len();
        (Just(cols), prop::collection::vec(-4i64..=4, dim))
    })) {
        if !is_feasible_by_row_gcd(&target, &cols) {
            prop_assert!(brute_force(&target, &cols, BOUND).is_empty());
        }
    }

    #[test]
    fn canonical_form_is_idempotent_with_unique_images(
        (cols, pumps) in step_set().prop_flat_map(|cols| {
            let k = cols.len();
            (Just(cols), prop::collection::vec(prop::collection::vec(-3i64..=3, k), 0..8))
        })
    ) {
        let steps = as_steps(&cols);
        let dim = cols[0].len();
        let mut canon = PumpCanonicalizer::new();
        let once = canon.canonicalize(&pumps, &steps).unwrap();
        let twice = canon.canonicalize(&once, &steps).unwrap();
        prop_assert_eq!(&once, &twice);

        let mut images = FxHashSet::default();
        for p in &once {
            prop_assert!(images.insert(apply_columns(&cols, p, dim)));
        }
        // Every nonzero input image survives.
        for p in &pumps {
            let image = apply_columns(&cols, p, dim);
            if !is_zero(&image) {
                prop_assert!(images.contains(&image));
            }
        }
    }
}
