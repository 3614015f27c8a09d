// Canonical pumps: one representative per net interval.
//
// Two pumps that differ by a kernel vector of the step matrix `S` produce the
// same net interval (the difference is a sub-loop that goes nowhere). The
// canonicalizer reduces every pump modulo the kernel lattice toward a small
// L1 norm, then keeps one representative per image `S·x`.
//
// Reduction is greedy coordinate descent over the kernel basis: for each
// basis vector κ it picks the integer multiplier t minimizing ‖x + t·κ‖₁.
// That function is convex and piecewise linear in t with breakpoints at
// `-xᵢ/κᵢ`, each carrying slope weight `|κᵢ|`, so its minimum sits at the
// weighted median breakpoint. t starts from that point rounded, a small
// window around it is checked, and the best t keeps stepping outward while
// the order still improves. Passes over the basis repeat until nothing
// improves (or `MAX_PASSES` is reached).
//
// With more than one kernel vector the descent can stop in a local optimum,
// so the representative is not guaranteed to be the globally most economical
// phrasing. Image uniqueness is guaranteed regardless: the final grouping is
// by `S·x`, not by the reduced vector.
//
// The kernel basis comes from a `KernelCache` owned by the canonicalizer, so
// re-canonicalizing batches for the same step set costs one RREF in total.
//
// `step_equivalences` lists the step pairs that become one interval once the
// target comma is tempered out, e.g. 9/8 and 10/9 under 81/80.

use crate::error::{PumpError, Result};
use crate::kernel::KernelCache;
use crate::monzo::{Monzo, Step};
use crate::vector::{add_scaled, apply_columns, cmp_l1_lex, is_zero};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cmp::Ordering;

/// Upper bound on full passes over the kernel basis per pump.
pub const MAX_PASSES: usize = 64;

/// Half-width of the integer window checked around the weighted median.
const PROBE_RADIUS: i64 = 2;

/// Breakpoint of `t ↦ ‖x + t·κ‖₁` where the accumulated slope weight first
/// reaches half the total. None when κ is zero.
fn weighted_median_breakpoint(x: &[i64], kappa: &[i64]) -> Option<f64> {
    let mut breakpoints: Vec<(f64, i64)> = x
        .iter()
        .zip(kappa)
        .filter(|(_, k)| **k != 0)
        .map(|(&xi, &ki)| (-(xi as f64) / ki as f64, ki.abs()))
        .collect();
    breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: i64 = breakpoints.iter().map(|(_, w)| w).sum();
    let mut acc = 0;
    for &(b, w) in &breakpoints {
        acc += w;
        if 2 * acc >= total {
            return Some(b);
        }
    }
    None
}

/// Multiplier `t` for which `x + t·κ` is smallest in L1-then-lex order.
/// Returns 0 unless some `t` is strictly better than leaving `x` alone.
fn best_multiplier(x: &[i64], kappa: &[i64]) -> i64 {
    let Some(median) = weighted_median_breakpoint(x, kappa) else {
        return 0;
    };
    let center = median.round() as i64;

    let mut best_t = 0;
    let mut best = x.to_vec();
    for t in (center - PROBE_RADIUS)..=(center + PROBE_RADIUS) {
        if t == 0 {
            continue;
        }
        let candidate = add_scaled(x, kappa, t);
        if cmp_l1_lex(&candidate, &best) == Ordering::Less {
            best = candidate;
            best_t = t;
        }
    }
    // Convex in t, so walking from the best point only ever needs one
    // direction; try both and stop at the first non-improvement.
    for dir in [-1, 1] {
        loop {
            let candidate = add_scaled(x, kappa, best_t + dir);
            if cmp_l1_lex(&candidate, &best) != Ordering::Less {
                break;
            }
            best = candidate;
            best_t += dir;
        }
    }
    best_t
}

/// Greedy reduction of `x` modulo the lattice spanned by `kernel`.
pub fn reduce_modulo_kernel(x: &[i64], kernel: &[Vec<i64>]) -> Vec<i64> {
    let mut x = x.to_vec();
    for _ in 0..MAX_PASSES {
        let mut improved = false;
        for kappa in kernel {
            let t = best_multiplier(&x, kappa);
            if t != 0 {
                x = add_scaled(&x, kappa, t);
                improved = true;
            }
        }
        if !improved {
            break;
        }
    }
    x
}

/// Keep the smallest representative per image, drop zero vectors, sort.
fn dedupe_by_image(pumps: impl IntoIterator<Item = Vec<i64>>, columns: &[Monzo], dim: usize) -> Vec<Vec<i64>> {
    let mut by_image: FxHashMap<Vec<i64>, Vec<i64>> = FxHashMap::default();
    for x in pumps {
        if is_zero(&x) {
            continue;
        }
        let image = apply_columns(columns, &x, dim);
        match by_image.get_mut(&image) {
            Some(kept) if cmp_l1_lex(&x, kept) == Ordering::Less => *kept = x,
            Some(_) => {}
            None => {
                by_image.insert(image, x);
            }
        }
    }
    let mut out: Vec<Vec<i64>> = by_image.into_values().collect();
    out.sort_by(|a, b| cmp_l1_lex(a, b));
    out
}

/// Two steps that coincide once the comma is tempered out:
/// `steps[upper] - steps[lower] == comma`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StepEquivalence {
    pub upper: usize,
    pub lower: usize,
}

/// Every pair of steps whose monzos differ by exactly `comma`, in step order
/// of the earlier index. Steps with identical monzos resolve to the last one.
pub fn step_equivalences(steps: &[Step], comma: &[i64]) -> Result<Vec<StepEquivalence>> {
    for step in steps {
        if step.monzo.len() != comma.len() {
            return Err(PumpError::DimensionMismatch {
                what: format!("step {}", step.name),
                expected: comma.len(),
                found: step.monzo.len(),
            });
        }
    }
    let index: FxHashMap<&[i64], usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.monzo.as_slice(), i))
        .collect();

    let mut out = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        let below = add_scaled(&step.monzo, comma, -1);
        if let Some(&j) = index.get(below.as_slice()).filter(|&&j| j > i) {
            out.push(StepEquivalence { upper: i, lower: j });
        }
        let above = add_scaled(&step.monzo, comma, 1);
        if let Some(&j) = index.get(above.as_slice()).filter(|&&j| j > i) {
            out.push(StepEquivalence { upper: j, lower: i });
        }
    }
    Ok(out)
}

/// Reduces pump sets modulo the kernel of their step matrix. Owns the kernel
/// memo table, so one instance should live as long as the step sets it
/// serves are in use.
#[derive(Debug, Default)]
pub struct PumpCanonicalizer {
    cache: KernelCache,
}

impl PumpCanonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: KernelCache) -> Self {
        PumpCanonicalizer { cache }
    }

    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }

    /// Canonical representatives of `pumps` over `steps`, sorted by L1 norm
    /// then lexicographically. No two results share an image `S·x`.
    pub fn canonicalize(&mut self, pumps: &[Vec<i64>], steps: &[Step]) -> Result<Vec<Vec<i64>>> {
        if steps.is_empty() {
            return Err(PumpError::EmptyStepVocabulary);
        }
        let dim = steps[0].monzo.len();
        for step in steps {
            if step.monzo.len() != dim {
                return Err(PumpError::DimensionMismatch {
                    what: format!("step {}", step.name),
                    expected: dim,
                    found: step.monzo.len(),
                });
            }
        }
        for pump in pumps {
            if pump.len() != steps.len() {
                return Err(PumpError::DimensionMismatch {
                    what: "pump".to_string(),
                    expected: steps.len(),
                    found: pump.len(),
                });
            }
        }

        let columns: Vec<Monzo> = steps.iter().map(|s| s.monzo.clone()).collect();
        let kernel = self.cache.basis(&columns)?;
        if kernel.is_empty() {
            return Ok(dedupe_by_image(pumps.iter().cloned(), &columns, dim));
        }
        let reduced: Vec<Vec<i64>> = pumps
            .iter()
            .map(|x| reduce_modulo_kernel(x, kernel))
            .collect();
        Ok(dedupe_by_image(reduced, &columns, dim))
    }
}
