// Meet-in-the-middle comma pump solver.
//
// Finds integer coefficient vectors `x` with `|xᵢ| <= coeff_bound` such that
// `Σ xᵢ · stepᵢ = target` exactly, where the steps and target are monzos.
//
// ## State machine
//
//   Init -> FeasibilityCheck -> Rejected
//                            -> Search(B) -> Search(B+1) -> ... -> Done | Capped
//   (any non-terminal state)  -> Cancelled | TimedOut
//
// Each `step()` call runs at most one chunk of wall-clock work (checked every
// `CHECK_INTERVAL` search units) and returns the events it produced:
// one `Progress`, a `Batch` with the full current best-set if it changed,
// and `Done` exactly once when a terminal state is reached. A cancellation
// noticed at the start of a tick produces only the `Done` event.
//
// ## Search
//
// 1. Steps are reordered by how well they align with the target,
//    `|dot(step, target)| / (‖step‖₁ + ε)`, descending. The permutation is
//    kept and every emitted solution is mapped back to the caller's order.
// 2. Two analytic pre-checks run before any search: the row-gcd test (each
//    target entry must be a multiple of the gcd of that row of `S`) and the
//    reach test (`Σ|stepⱼ[i]| · B_max >= |target[i]|`). Failing either ends
//    the run with an empty result.
// 3. The reordered steps are split into a left and a right half. Each half is
//    a resumable depth-first producer (`HalfSearch`) over coefficients in
//    zero-centered order `0, 1, -1, 2, -2, ...`, with its continuation in an
//    explicit stack. The coordinator alternates the two producers one leaf at
//    a time. Each new leaf is stored in its own half's append-only table,
//    keyed by partial-sum monzo, and immediately probed against the other
//    table for `target - sum`. Every pair is therefore found exactly once,
//    by whichever of the two leaves arrives second.
// 4. Each match is re-verified against all steps before acceptance, then
//    deduplicated and inserted into a best-set ordered by L1 norm (ties:
//    lexicographic by signed magnitude, see `cmp_l1_lex`). Solutions over `l1_cap` are dropped. When the
//    best-set would exceed `max_solutions` the worst entry is evicted and
//    the run stops as `Capped`.
// 5. With iterative deepening the bound starts at `min(2, B_max)`; when both
//    halves are exhausted the bound grows by one and both producers restart
//    from scratch with empty tables, since every partial-sum key changes.
//
// See also: `canonical.rs`, which reduces the raw solutions modulo the
// step-matrix kernel, and `session.rs`, which wires the two together.

use crate::error::{PumpError, Result};
use crate::monzo::{Monzo, Step};
use crate::schedule::{
    CHECK_INTERVAL, CancelToken, ChunkClock, Incremental, StopReason, final_outcome,
};
use crate::vector::{apply_columns, cmp_l1_lex, dot, gcd, is_zero, l1};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Partial-sum monzo used as a leaf-table key.
type LatticeKey = SmallVec<[i64; 8]>;

/// Leaf table for one half: partial sum -> coefficient vectors producing it.
type LeafTable = FxHashMap<LatticeKey, Vec<Vec<i64>>>;

const ALIGNMENT_EPSILON: f64 = 1e-9;

/// Search parameters for one solver invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Largest coefficient magnitude, `B_max`.
    pub coeff_bound: u32,
    /// Size of the retained best-set.
    pub max_solutions: usize,
    /// Overall wall-clock budget; `None` for unlimited.
    pub time_budget_ms: Option<u64>,
    /// Wall-clock work per `step()` before yielding.
    pub chunk_ms: u64,
    /// Reject solutions whose L1 norm exceeds this.
    pub l1_cap: Option<u64>,
    /// Grow the bound from `min(2, B_max)` instead of searching `B_max` directly.
    pub iterative_deepen: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            coeff_bound: 6,
            max_solutions: 200,
            time_budget_ms: Some(10_000),
            chunk_ms: 16,
            l1_cap: None,
            iterative_deepen: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "phase")]
pub enum SolverPhase {
    Init,
    FeasibilityCheck,
    Rejected,
    Search { bound: u32 },
    Done,
    Capped,
    Cancelled,
    TimedOut,
}

impl SolverPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SolverPhase::Rejected
                | SolverPhase::Done
                | SolverPhase::Capped
                | SolverPhase::Cancelled
                | SolverPhase::TimedOut
        )
    }

    fn terminal_for(reason: StopReason) -> Self {
        match reason {
            StopReason::Complete => SolverPhase::Done,
            StopReason::Capped => SolverPhase::Capped,
            StopReason::TimeBudget => SolverPhase::TimedOut,
            StopReason::Cancelled => SolverPhase::Cancelled,
            StopReason::InfeasibleGcd | StopReason::UnreachableBounds => SolverPhase::Rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolverProgress {
    pub bound: u32,
    pub phase: SolverPhase,
    pub found: usize,
    pub elapsed_ms: u64,
    pub leaves: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolverOutcome {
    /// Best-set in caller step order, sorted by L1 then lexicographically.
    pub solutions: Vec<Vec<i64>>,
    pub reason: StopReason,
    pub partial: bool,
    /// Whether any solution was evicted to respect `max_solutions`.
    pub capped: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolverEvent {
    Progress(SolverProgress),
    /// The complete current best-set, sorted. Sent only on ticks that changed it.
    Batch(Vec<Vec<i64>>),
    /// Terminal result. Always the last event of a run.
    Done(SolverOutcome),
}

// ---------------------------------------------------------------------------
// Pre-checks and ordering
// ---------------------------------------------------------------------------

/// Row-gcd feasibility: for each prime, the target exponent must be a
/// multiple of the gcd of that prime's exponents across all steps (and zero
/// if every step has exponent zero there). Necessary for any integer
/// solution, regardless of bound.
pub fn is_feasible_by_row_gcd(target: &[i64], steps: &[Monzo]) -> bool {
    target.iter().enumerate().all(|(i, &t)| {
        let g = steps
            .iter()
            .fold(0, |g, s| gcd(g, s.get(i).copied().unwrap_or(0)));
        if g == 0 { t == 0 } else { t % g == 0 }
    })
}

/// Reach test: with every `|xⱼ| <= bound`, each target exponent must be
/// within `Σ|stepⱼ[i]| · bound`.
pub fn is_reachable(target: &[i64], steps: &[Monzo], bound: u32) -> bool {
    target.iter().enumerate().all(|(i, &t)| {
        let reach: i128 = steps
            .iter()
            .map(|s| s.get(i).map_or(0, |e| e.unsigned_abs() as i128))
            .sum::<i128>()
            * bound as i128;
        reach >= t.unsigned_abs() as i128
    })
}

/// Step indices sorted by descending alignment with the target. Ties keep
/// the caller's order.
pub fn alignment_order(target: &[i64], steps: &[Monzo]) -> Vec<usize> {
    let score = |s: &Monzo| dot(s, target).unsigned_abs() as f64 / (l1(s) as f64 + ALIGNMENT_EPSILON);
    let mut order: Vec<usize> = (0..steps.len()).collect();
    order.sort_by(|&a, &b| score(&steps[b]).total_cmp(&score(&steps[a])));
    order
}

/// Coefficients `0, 1, -1, 2, -2, ..., bound, -bound`.
pub fn zero_centered_ladder(bound: u32) -> Vec<i64> {
    let mut ladder = vec![0];
    for c in 1..=bound as i64 {
        ladder.push(c);
        ladder.push(-c);
    }
    ladder
}

// ---------------------------------------------------------------------------
// Half-search producer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Leaf {
    sum: LatticeKey,
    coeffs: Vec<i64>,
}

/// Resumable depth-first enumeration of one half's coefficient vectors.
#[derive(Debug)]
struct HalfSearch {
    monzos: Vec<Monzo>,
    ladder: Vec<i64>,
    /// Per open depth: index into `ladder` of the next choice to try.
    stack: Vec<usize>,
    chosen: Vec<i64>,
    /// `sums[i]` is the partial sum of the first `i` chosen terms.
    sums: Vec<LatticeKey>,
    finished: bool,
}

impl HalfSearch {
    fn new(monzos: Vec<Monzo>, dim: usize, bound: u32) -> Self {
        let depth = monzos.len();
        HalfSearch {
            monzos,
            ladder: zero_centered_ladder(bound),
            stack: vec![0],
            chosen: vec![0; depth],
            sums: vec![SmallVec::from_elem(0, dim); depth + 1],
            finished: false,
        }
    }

    fn next_leaf(&mut self) -> Option<Leaf> {
        if self.finished {
            return None;
        }
        if self.monzos.is_empty() {
            self.finished = true;
            return Some(Leaf {
                sum: self.sums[0].clone(),
                coeffs: Vec::new(),
            });
        }
        while let Some(&next) = self.stack.last() {
            let depth = self.stack.len() - 1;
            if next == self.ladder.len() {
                self.stack.pop();
                continue;
            }
            self.stack[depth] = next + 1;

            let c = self.ladder[next];
            self.chosen[depth] = c;
            let (head, tail) = self.sums.split_at_mut(depth + 1);
            for ((out, &base), &m) in tail[0].iter_mut().zip(&head[depth]).zip(&self.monzos[depth]) {
                *out = base + c * m;
            }

            if depth + 1 == self.monzos.len() {
                return Some(Leaf {
                    sum: self.sums[depth + 1].clone(),
                    coeffs: self.chosen.clone(),
                });
            }
            self.stack.push(0);
        }
        self.finished = true;
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

enum Unit {
    Continue,
    BoundExhausted,
    Capped,
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Incremental pump solver. Create with `PumpSolver::new`, then call `step()`
/// until it reports `Done`.
#[derive(Debug)]
pub struct PumpSolver {
    target: Monzo,
    /// Step monzos in caller order.
    steps: Vec<Monzo>,
    config: SolverConfig,
    clock: ChunkClock,
    cancel: CancelToken,
    phase: SolverPhase,

    /// Step monzos in search order, and `order[i]` = caller index of `columns[i]`.
    columns: Vec<Monzo>,
    order: Vec<usize>,
    split: usize,

    bound: u32,
    left: HalfSearch,
    right: HalfSearch,
    left_leaves: LeafTable,
    right_leaves: LeafTable,

    best: Vec<Vec<i64>>,
    seen: FxHashSet<Vec<i64>>,
    evicted: bool,
    changed: bool,
    leaves: u64,
    rejected_matches: u64,
}

impl PumpSolver {
    /// Validate inputs and set up a run. Input errors are reported here,
    /// before any work is scheduled.
    pub fn new(target: &[i64], steps: &[Step], config: SolverConfig) -> Result<(Self, CancelToken)> {
        if steps.is_empty() {
            return Err(PumpError::EmptyStepVocabulary);
        }
        if target.is_empty() {
            return Err(PumpError::EmptyPrimeBasis);
        }
        for step in steps {
            if step.monzo.len() != target.len() {
                return Err(PumpError::DimensionMismatch {
                    what: format!("step {}", step.name),
                    expected: target.len(),
                    found: step.monzo.len(),
                });
            }
        }
        if is_zero(target) {
            return Err(PumpError::ZeroTarget);
        }

        let dim = target.len();
        let cancel = CancelToken::new();
        let solver = PumpSolver {
            target: target.to_vec(),
            steps: steps.iter().map(|s| s.monzo.clone()).collect(),
            clock: ChunkClock::new(config.chunk_ms, config.time_budget_ms),
            config,
            cancel: cancel.clone(),
            phase: SolverPhase::Init,
            columns: Vec::new(),
            order: Vec::new(),
            split: 0,
            bound: 0,
            left: HalfSearch::new(Vec::new(), dim, 0),
            right: HalfSearch::new(Vec::new(), dim, 0),
            left_leaves: LeafTable::default(),
            right_leaves: LeafTable::default(),
            best: Vec::new(),
            seen: FxHashSet::default(),
            evicted: false,
            changed: false,
            leaves: 0,
            rejected_matches: 0,
        };
        Ok((solver, cancel))
    }

    pub fn phase(&self) -> SolverPhase {
        self.phase
    }

    /// Current coefficient bound of the search.
    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// Leaves produced by both halves so far, across all bounds.
    pub fn leaves_visited(&self) -> u64 {
        self.leaves
    }

    /// Current best-set, sorted, in caller step order.
    pub fn solutions(&self) -> &[Vec<i64>] {
        &self.best
    }

    /// Search order of the steps: entry `i` is the caller index searched `i`-th.
    pub fn search_order(&self) -> &[usize] {
        &self.order
    }

    /// Table matches that failed re-verification. Always zero unless the
    /// partial-sum index is broken.
    pub fn rejected_matches(&self) -> u64 {
        self.rejected_matches
    }

    /// Reorder the steps and run both pre-checks. Returns the rejection
    /// reason, if any.
    fn check_feasibility(&mut self) -> Option<StopReason> {
        self.order = alignment_order(&self.target, &self.steps);
        self.columns = self.order.iter().map(|&j| self.steps[j].clone()).collect();
        self.split = self.columns.len() / 2;

        self.phase = SolverPhase::FeasibilityCheck;
        if !is_feasible_by_row_gcd(&self.target, &self.columns) {
            return Some(StopReason::InfeasibleGcd);
        }
        if !is_reachable(&self.target, &self.columns, self.config.coeff_bound) {
            return Some(StopReason::UnreachableBounds);
        }
        None
    }

    /// (Re)start both half-searches at `bound` with empty tables.
    fn begin_bound(&mut self, bound: u32) {
        let dim = self.target.len();
        self.bound = bound;
        self.left = HalfSearch::new(self.columns[..self.split].to_vec(), dim, bound);
        self.right = HalfSearch::new(self.columns[self.split..].to_vec(), dim, bound);
        self.left_leaves.clear();
        self.right_leaves.clear();
        self.phase = SolverPhase::Search { bound };
    }

    /// Pull one leaf from each half (where available) and match it.
    fn search_unit(&mut self) -> Unit {
        let mut produced = false;
        if let Some(leaf) = self.left.next_leaf() {
            produced = true;
            self.absorb(Side::Left, leaf);
        }
        if let Some(leaf) = self.right.next_leaf() {
            produced = true;
            self.absorb(Side::Right, leaf);
        }
        if self.evicted {
            Unit::Capped
        } else if produced {
            Unit::Continue
        } else {
            Unit::BoundExhausted
        }
    }

    fn absorb(&mut self, side: Side, leaf: Leaf) {
        self.leaves += 1;
        let need: LatticeKey = self
            .target
            .iter()
            .zip(&leaf.sum)
            .map(|(t, s)| t - s)
            .collect();

        let (own, other) = match side {
            Side::Left => (&mut self.left_leaves, &self.right_leaves),
            Side::Right => (&mut self.right_leaves, &self.left_leaves),
        };
        let candidates: Vec<Vec<i64>> = other
            .get(&need)
            .map(|partners| {
                partners
                    .iter()
                    .map(|p| match side {
                        Side::Left => [leaf.coeffs.as_slice(), p.as_slice()].concat(),
                        Side::Right => [p.as_slice(), leaf.coeffs.as_slice()].concat(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        own.entry(leaf.sum).or_default().push(leaf.coeffs);

        for candidate in candidates {
            self.offer(candidate);
        }
    }

    /// Verify a search-order solution and merge it into the best-set.
    fn offer(&mut self, searched: Vec<i64>) {
        if apply_columns(&self.columns, &searched, self.target.len()) != self.target {
            self.rejected_matches += 1;
            return;
        }
        let mut solution = vec![0; searched.len()];
        for (&j, c) in self.order.iter().zip(searched) {
            solution[j] = c;
        }
        if self.config.l1_cap.is_some_and(|cap| l1(&solution) as u64 > cap) {
            return;
        }
        if !self.seen.insert(solution.clone()) {
            return;
        }
        let pos = self
            .best
            .binary_search_by(|probe| cmp_l1_lex(probe, &solution))
            .unwrap_or_else(|p| p);
        self.best.insert(pos, solution);
        if self.best.len() > self.config.max_solutions {
            self.best.pop();
            self.evicted = true;
        }
        if pos < self.config.max_solutions {
            self.changed = true;
        }
    }

    fn progress(&self) -> SolverEvent {
        SolverEvent::Progress(SolverProgress {
            bound: self.bound,
            phase: self.phase,
            found: self.best.len(),
            elapsed_ms: self.clock.elapsed_ms(),
            leaves: self.leaves,
        })
    }

    fn finish(&mut self, reason: StopReason, events: &mut Vec<SolverEvent>) {
        self.phase = SolverPhase::terminal_for(reason);
        events.push(SolverEvent::Done(SolverOutcome {
            solutions: std::mem::take(&mut self.best),
            reason,
            partial: reason.is_partial(),
            capped: self.evicted,
        }));
        self.left_leaves = LeafTable::default();
        self.right_leaves = LeafTable::default();
    }

    /// Run search units until the chunk, the budget, or the search ends.
    fn run_chunk(&mut self) -> Option<StopReason> {
        loop {
            for _ in 0..CHECK_INTERVAL {
                match self.search_unit() {
                    Unit::Continue => {}
                    Unit::Capped => return Some(StopReason::Capped),
                    Unit::BoundExhausted => {
                        if self.config.iterative_deepen && self.bound < self.config.coeff_bound {
                            self.begin_bound(self.bound + 1);
                        } else {
                            return Some(StopReason::Complete);
                        }
                    }
                }
            }
            if self.cancel.is_cancelled() {
                return Some(StopReason::Cancelled);
            }
            if self.clock.budget_spent() {
                return Some(StopReason::TimeBudget);
            }
            if self.config.chunk_ms == 0 || self.clock.chunk_spent() {
                return None;
            }
        }
    }
}

impl Incremental for PumpSolver {
    type Event = SolverEvent;

    fn step(&mut self) -> Vec<SolverEvent> {
        let mut events = Vec::new();
        if self.phase.is_terminal() {
            return events;
        }
        if self.cancel.is_cancelled() {
            self.finish(StopReason::Cancelled, &mut events);
            return events;
        }
        self.clock.begin_chunk();

        if self.phase == SolverPhase::Init {
            if let Some(reason) = self.check_feasibility() {
                self.phase = SolverPhase::Rejected;
                events.push(self.progress());
                self.finish(reason, &mut events);
                return events;
            }
            let start = if self.config.iterative_deepen {
                self.config.coeff_bound.min(2)
            } else {
                self.config.coeff_bound
            };
            self.begin_bound(start);
        }

        self.changed = false;
        let stop = self.run_chunk();

        if stop != Some(StopReason::Cancelled) {
            events.push(self.progress());
            if self.changed {
                events.push(SolverEvent::Batch(self.best.clone()));
            }
        }
        if let Some(reason) = stop {
            self.finish(reason, &mut events);
        }
        events
    }

    fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Run a solver to completion and return its outcome.
pub fn solve(target: &[i64], steps: &[Step], config: SolverConfig) -> Result<SolverOutcome> {
    let (mut solver, _cancel) = PumpSolver::new(target, steps, config)?;
    final_outcome(solver.run_to_end(), "pump search", |e| match e {
        SolverEvent::Done(outcome) => Some(outcome),
        _ => None,
    })
}
