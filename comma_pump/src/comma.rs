// Comma enumeration over a bounded prime-exponent lattice.
//
// Sweeps every exponent vector with entries in `[-exp_bound, exp_bound]`
// (excluding the all-zero vector), keeps those whose size is within
// `max_cents`, and deduplicates by primitive form so that e.g. 81/80 and
// (81/80)^2 count once. The result is sorted by cents, ties by L1 norm.
//
// Two entry points share one implementation:
// - `enumerate()`: blocking, runs the sweep to completion.
// - `CommaSweep`: the incremental state machine. The depth-first sweep keeps
//   its continuation in an explicit stack (one frame per prime dimension),
//   so it can stop after any leaf and resume on the next `step()`.
//
// Stored commas are primitive and oriented upward (positive cents), so the
// syntonic comma appears as [-4, 4, -1] = 81/80 rather than 80/81.
//
// See also: `schedule.rs` for the chunk/cancel plumbing, `edo.rs` for the
// tempering check usually run on the results.

use crate::error::{PumpError, Result};
use crate::monzo::{Monzo, cents, normalize_primitive};
use crate::schedule::{
    CHECK_INTERVAL, CancelToken, ChunkClock, Incremental, StopReason, final_outcome,
};
use crate::vector::l1;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A small interval found by the sweep, with its (positive) size in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comma {
    pub monzo: Monzo,
    pub cents: f64,
}

/// Pacing for the incremental sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Wall-clock work per `step()` before yielding.
    pub chunk_ms: u64,
    /// Overall budget; `None` sweeps the whole lattice.
    pub time_budget_ms: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            chunk_ms: 16,
            time_budget_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepProgress {
    pub processed: u64,
    pub total: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub commas: Vec<Comma>,
    pub partial: bool,
    pub reason: StopReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    Progress(SweepProgress),
    /// Commas accepted since the previous batch, in discovery order.
    Batch(Vec<Comma>),
    /// Final sorted list. Always the last event of a sweep.
    Done(SweepOutcome),
}

/// One depth of the explicit depth-first stack: the next exponent to try
/// for this prime.
#[derive(Debug, Clone, Copy)]
struct SweepFrame {
    next: i64,
}

/// Incremental comma sweep. Create with `CommaSweep::new`, then call `step()`
/// until it reports `Done`.
#[derive(Debug)]
pub struct CommaSweep {
    primes: Vec<u64>,
    bound: i64,
    max_cents: f64,
    chunk_ms: u64,
    clock: ChunkClock,
    cancel: CancelToken,

    stack: Vec<SweepFrame>,
    current: Monzo,

    seen: FxHashSet<Monzo>,
    accepted: Vec<Comma>,
    unreported: usize,
    processed: u64,
    total: u64,
    finished: bool,
}

impl CommaSweep {
    /// Validate inputs and set up the sweep. Returns the machine and the token
    /// that cancels it.
    pub fn new(
        primes: &[u64],
        exp_bound: u32,
        max_cents: f64,
        config: &SweepConfig,
    ) -> Result<(Self, CancelToken)> {
        if primes.is_empty() {
            return Err(PumpError::EmptyPrimeBasis);
        }
        if !max_cents.is_finite() || max_cents < 0.0 {
            return Err(PumpError::InvalidThreshold(max_cents));
        }
        let bound = exp_bound as i64;
        let side = 2 * exp_bound as u64 + 1;
        let total = u32::try_from(primes.len())
            .ok()
            .and_then(|d| side.checked_pow(d))
            .map_or(u64::MAX, |n| n - 1);

        let cancel = CancelToken::new();
        let sweep = CommaSweep {
            primes: primes.to_vec(),
            bound,
            max_cents,
            chunk_ms: config.chunk_ms,
            clock: ChunkClock::new(config.chunk_ms, config.time_budget_ms),
            cancel: cancel.clone(),
            stack: vec![SweepFrame { next: -bound }],
            current: vec![0; primes.len()],
            seen: FxHashSet::default(),
            accepted: Vec::new(),
            unreported: 0,
            processed: 0,
            total,
            finished: false,
        };
        Ok((sweep, cancel))
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Commas accepted so far, in discovery order.
    pub fn accepted(&self) -> &[Comma] {
        &self.accepted
    }

    /// Advance the depth-first stack to the next leaf and evaluate it.
    /// Returns false once the lattice is exhausted.
    fn advance(&mut self) -> bool {
        let dims = self.primes.len();
        while let Some(&frame) = self.stack.last() {
            let depth = self.stack.len() - 1;
            if frame.next > self.bound {
                self.stack.pop();
                continue;
            }
            self.stack[depth].next = frame.next + 1;
            self.current[depth] = frame.next;
            if depth + 1 < dims {
                self.stack.push(SweepFrame { next: -self.bound });
                continue;
            }
            if self.current.iter().all(|&e| e == 0) {
                continue;
            }
            self.processed += 1;
            self.visit_leaf();
            return true;
        }
        false
    }

    fn visit_leaf(&mut self) {
        let size = cents(&self.current, &self.primes);
        if size.abs() > self.max_cents {
            return;
        }
        let primitive = normalize_primitive(&self.current);
        if self.seen.contains(&primitive) {
            return;
        }
        let mut monzo = primitive.clone();
        let mut size = cents(&monzo, &self.primes);
        if size < 0.0 {
            for e in &mut monzo {
                *e = -*e;
            }
            size = -size;
        }
        self.seen.insert(primitive);
        self.accepted.push(Comma { monzo, cents: size });
        self.unreported += 1;
    }

    fn finish(&mut self, reason: StopReason, events: &mut Vec<SweepEvent>) {
        self.finished = true;
        let mut commas = std::mem::take(&mut self.accepted);
        sort_commas(&mut commas);
        events.push(SweepEvent::Done(SweepOutcome {
            commas,
            partial: reason.is_partial(),
            reason,
        }));
    }
}

impl Incremental for CommaSweep {
    type Event = SweepEvent;

    fn step(&mut self) -> Vec<SweepEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        if self.cancel.is_cancelled() {
            self.finish(StopReason::Cancelled, &mut events);
            return events;
        }

        self.clock.begin_chunk();
        let mut exhausted = false;
        let mut stop = None;
        'chunk: loop {
            for _ in 0..CHECK_INTERVAL {
                if !self.advance() {
                    exhausted = true;
                    break 'chunk;
                }
            }
            if self.cancel.is_cancelled() {
                stop = Some(StopReason::Cancelled);
                break;
            }
            if self.clock.budget_spent() {
                stop = Some(StopReason::TimeBudget);
                break;
            }
            if self.chunk_ms == 0 || self.clock.chunk_spent() {
                break;
            }
        }

        if stop != Some(StopReason::Cancelled) {
            events.push(SweepEvent::Progress(SweepProgress {
                processed: self.processed,
                total: self.total,
                elapsed_ms: self.clock.elapsed_ms(),
            }));
            if self.unreported > 0 {
                let start = self.accepted.len() - self.unreported;
                events.push(SweepEvent::Batch(self.accepted[start..].to_vec()));
                self.unreported = 0;
            }
        }

        if exhausted {
            self.finish(StopReason::Complete, &mut events);
        } else if let Some(reason) = stop {
            self.finish(reason, &mut events);
        }
        events
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Ascending cents, ties by L1 norm, then by monzo for a total order.
pub fn sort_commas(commas: &mut [Comma]) {
    commas.sort_by(|a, b| {
        a.cents
            .total_cmp(&b.cents)
            .then_with(|| l1(&a.monzo).cmp(&l1(&b.monzo)))
            .then_with(|| a.monzo.cmp(&b.monzo))
    });
}

/// Blocking enumeration: every comma within `max_cents` whose exponents all
/// lie in `[-exp_bound, exp_bound]`, sorted.
pub fn enumerate(primes: &[u64], exp_bound: u32, max_cents: f64) -> Result<Vec<Comma>> {
    let config = SweepConfig {
        chunk_ms: u64::MAX,
        time_budget_ms: None,
    };
    let (mut sweep, _cancel) = CommaSweep::new(primes, exp_bound, max_cents, &config)?;
    final_outcome(sweep.run_to_end(), "comma sweep", |e| match e {
        SweepEvent::Done(outcome) => Some(outcome.commas),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(events: &[SweepEvent]) -> Option<&SweepOutcome> {
        events.iter().find_map(|e| match e {
            SweepEvent::Done(o) => Some(o),
            _ => None,
        })
    }

    #[test]
    fn finds_syntonic_comma() {
        let commas = enumerate(&[2, 3, 5], 5, 30.0).unwrap();
        let syntonic = commas
            .iter()
            .find(|c| c.monzo == vec![-4, 4, -1])
            .expect("81/80 should be found");
        assert!((syntonic.cents - 21.506).abs() < 0.001);
    }

    #[test]
    fn results_sorted_and_within_threshold() {
        let commas = enumerate(&[2, 3, 5], 4, 50.0).unwrap();
        assert!(!commas.is_empty());
        for c in &commas {
            assert!(c.cents >= 0.0 && c.cents <= 50.0);
        }
        for pair in commas.windows(2) {
            assert!(pair[0].cents <= pair[1].cents);
        }
    }

    #[test]
    fn multiples_deduplicated() {
        // 3-limit: the Pythagorean comma [-19, 12] is out of range, but the
        // sweep still visits [2k, -k]-style multiples of small vectors.
        let commas = enumerate(&[2, 3], 6, 1200.0).unwrap();
        let mut seen = FxHashSet::default();
        for c in &commas {
            assert!(seen.insert(normalize_primitive(&c.monzo)));
        }
        assert!(commas.iter().any(|c| c.monzo == vec![-1, 1]));
        assert!(!commas.iter().any(|c| c.monzo == vec![-2, 2]));
    }

    #[test]
    fn empty_basis_rejected() {
        assert!(matches!(
            enumerate(&[], 3, 10.0),
            Err(PumpError::EmptyPrimeBasis)
        ));
    }

    #[test]
    fn bad_threshold_rejected() {
        assert!(matches!(
            enumerate(&[2, 3], 3, f64::NAN),
            Err(PumpError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn total_excludes_origin() {
        let (sweep, _) = CommaSweep::new(&[2, 3, 5], 2, 10.0, &SweepConfig::default()).unwrap();
        assert_eq!(sweep.total(), 124);
    }

    #[test]
    fn incremental_matches_blocking() {
        let config = SweepConfig {
            chunk_ms: 0,
            time_budget_ms: None,
        };
        let (mut sweep, _) = CommaSweep::new(&[2, 3, 5], 4, 40.0, &config).unwrap();
        let mut steps = 0;
        let mut batched = 0;
        let mut outcome = None;
        while !sweep.is_finished() {
            steps += 1;
            for event in sweep.step() {
                match event {
                    SweepEvent::Batch(b) => batched += b.len(),
                    SweepEvent::Done(o) => outcome = Some(o),
                    SweepEvent::Progress(p) => assert!(p.processed <= p.total),
                }
            }
        }
        // 9^3 - 1 = 728 leaves at 256 per step.
        assert_eq!(steps, 3);
        let outcome = outcome.unwrap();
        assert_eq!(outcome.reason, StopReason::Complete);
        assert!(!outcome.partial);
        assert_eq!(batched, outcome.commas.len());
        assert_eq!(outcome.commas, enumerate(&[2, 3, 5], 4, 40.0).unwrap());
    }

    #[test]
    fn one_step_processes_one_check_interval() {
        let config = SweepConfig {
            chunk_ms: 0,
            time_budget_ms: None,
        };
        let (mut sweep, _) = CommaSweep::new(&[2, 3, 5], 4, 40.0, &config).unwrap();
        sweep.step();
        assert_eq!(sweep.processed(), CHECK_INTERVAL as u64);
        assert!(!sweep.is_finished());
    }

    #[test]
    fn cancel_finalizes_once() {
        let config = SweepConfig {
            chunk_ms: 0,
            time_budget_ms: None,
        };
        let (mut sweep, cancel) = CommaSweep::new(&[2, 3, 5, 7], 5, 30.0, &config).unwrap();
        sweep.step();
        cancel.cancel();
        let events = sweep.step();
        assert_eq!(events.len(), 1);
        let outcome = done(&events).unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert!(outcome.partial);
        assert!(sweep.step().is_empty());
        cancel.cancel();
        assert!(sweep.step().is_empty());
    }

    #[test]
    fn zero_budget_times_out() {
        let config = SweepConfig {
            chunk_ms: u64::MAX,
            time_budget_ms: Some(0),
        };
        let (mut sweep, _) = CommaSweep::new(&[2, 3, 5, 7], 5, 30.0, &config).unwrap();
        let events = sweep.step();
        let outcome = done(&events).unwrap();
        assert_eq!(outcome.reason, StopReason::TimeBudget);
        assert!(outcome.partial);
        assert!(sweep.is_finished());
    }
}
