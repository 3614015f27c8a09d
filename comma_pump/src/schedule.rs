// Cooperative scheduling primitives for the incremental machines.
//
// `CommaSweep` and `PumpSolver` are explicit state machines: each `step()`
// call does at most one chunk of work and returns the events produced during
// it. The caller decides when to call `step()` again (a timer, a task queue,
// a plain loop). Nothing here blocks or spawns threads.
//
// Shared pieces:
// - `CancelToken`: one-shot, idempotent cancellation flag handed out when a
//   machine is created. Takes effect at the machine's next check point.
// - `ChunkClock`: wall-clock bookkeeping for the per-step chunk and the
//   overall time budget. Time is only sampled every `CHECK_INTERVAL` work
//   units, so a chunk is a whole number of check intervals.
// - `StopReason`: why a machine reached its terminal state.
// - `Incremental`: the `step()` contract, plus `run_to_end()` for callers that
//   just want the final events. `final_outcome` pulls the terminal payload
//   out of those events.
//
// A `chunk_ms` of zero makes every `step()` perform exactly one check interval
// of work, which keeps tests deterministic.

use crate::error::{PumpError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Work units (leaves) processed between clock and cancellation checks.
pub const CHECK_INTERVAL: usize = 256;

/// Cancellation flag shared between a machine and whoever started it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call any number of times, including
    /// after the machine has finished (then it does nothing).
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Why an incremental machine stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// The whole search space was covered.
    Complete,
    /// More solutions exist than `max_solutions`; the best ones were kept.
    Capped,
    /// The overall time budget ran out.
    TimeBudget,
    /// The caller cancelled.
    Cancelled,
    /// Row-gcd test proved no integer solution exists.
    InfeasibleGcd,
    /// Even the maximal coefficients cannot reach the target.
    UnreachableBounds,
}

impl StopReason {
    /// Whether a result carrying this reason may be missing solutions.
    pub fn is_partial(self) -> bool {
        matches!(
            self,
            StopReason::Capped | StopReason::TimeBudget | StopReason::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Complete => "complete",
            StopReason::Capped => "capped",
            StopReason::TimeBudget => "time-budget",
            StopReason::Cancelled => "cancelled",
            StopReason::InfeasibleGcd => "infeasible-gcd",
            StopReason::UnreachableBounds => "unreachable-bounds",
        }
    }
}

/// Wall-clock bookkeeping for one machine invocation.
#[derive(Debug)]
pub struct ChunkClock {
    started: Instant,
    chunk: Duration,
    budget: Option<Duration>,
    chunk_started: Instant,
}

impl ChunkClock {
    pub fn new(chunk_ms: u64, time_budget_ms: Option<u64>) -> Self {
        let now = Instant::now();
        ChunkClock {
            started: now,
            chunk: Duration::from_millis(chunk_ms),
            budget: time_budget_ms.map(Duration::from_millis),
            chunk_started: now,
        }
    }

    /// Mark the start of a new chunk (called at the top of `step()`).
    pub fn begin_chunk(&mut self) {
        self.chunk_started = Instant::now();
    }

    pub fn chunk_spent(&self) -> bool {
        self.chunk_started.elapsed() >= self.chunk
    }

    pub fn budget_spent(&self) -> bool {
        self.budget.is_some_and(|b| self.started.elapsed() >= b)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// A resumable computation driven by repeated `step()` calls.
pub trait Incremental {
    type Event;

    /// Run one chunk of work and return the events it produced, in order.
    /// Once the machine is finished this returns an empty `Vec`.
    fn step(&mut self) -> Vec<Self::Event>;

    fn is_finished(&self) -> bool;

    /// Step until finished, collecting every event.
    fn run_to_end(&mut self) -> Vec<Self::Event> {
        let mut events = Vec::new();
        while !self.is_finished() {
            events.extend(self.step());
        }
        events
    }
}

/// First payload `done` extracts from `events`. A run that ended without one
/// is an error, never an empty success.
pub fn final_outcome<E, O>(
    events: Vec<E>,
    what: &'static str,
    done: impl FnMut(E) -> Option<O>,
) -> Result<O> {
    events
        .into_iter()
        .find_map(done)
        .ok_or(PumpError::MissingOutcome(what))
}
