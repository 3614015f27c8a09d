// A pump search with live canonicalization.
//
// `PumpSession` wraps a `PumpSolver` and a borrowed `PumpCanonicalizer`.
// Each `step()` advances the solver by one tick and translates its events:
// raw `Batch` sets are canonicalized immediately (so a UI can show the
// deduplicated list while the search runs), and the terminal `Done` set is
// canonicalized once more into the final `SessionReport`.
//
// The canonicalizer is borrowed rather than owned so its kernel cache
// survives across sessions over the same step set.

use crate::canonical::PumpCanonicalizer;
use crate::error::Result;
use crate::monzo::Step;
use crate::schedule::CancelToken;
use crate::schedule::Incremental;
use crate::solver::{PumpSolver, SolverConfig, SolverEvent, SolverOutcome, SolverProgress};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionReport {
    /// The solver's own terminal result (raw, uncanonicalized solutions).
    pub raw: SolverOutcome,
    /// Canonical pumps derived from `raw.solutions`.
    pub canonical: Vec<Vec<i64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    Progress(SolverProgress),
    /// Canonical form of the solver's latest best-set.
    Canonical(Vec<Vec<i64>>),
    Finished(SessionReport),
}

pub struct PumpSession<'c> {
    solver: PumpSolver,
    steps: Vec<Step>,
    canonicalizer: &'c mut PumpCanonicalizer,
    canonical: Vec<Vec<i64>>,
    finished: bool,
}

impl<'c> PumpSession<'c> {
    pub fn start(
        target: &[i64],
        steps: &[Step],
        config: SolverConfig,
        canonicalizer: &'c mut PumpCanonicalizer,
    ) -> Result<(Self, CancelToken)> {
        let (solver, cancel) = PumpSolver::new(target, steps, config)?;
        let session = PumpSession {
            solver,
            steps: steps.to_vec(),
            canonicalizer,
            canonical: Vec::new(),
            finished: false,
        };
        Ok((session, cancel))
    }

    pub fn solver(&self) -> &PumpSolver {
        &self.solver
    }

    /// Latest canonical set.
    pub fn canonical(&self) -> &[Vec<i64>] {
        &self.canonical
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance the solver by one tick. Kernel failures surface here as errors.
    pub fn step(&mut self) -> Result<Vec<SessionUpdate>> {
        let mut updates = Vec::new();
        for event in self.solver.step() {
            match event {
                SolverEvent::Progress(p) => updates.push(SessionUpdate::Progress(p)),
                SolverEvent::Batch(raw) => {
                    self.canonical = self.canonicalizer.canonicalize(&raw, &self.steps)?;
                    updates.push(SessionUpdate::Canonical(self.canonical.clone()));
                }
                SolverEvent::Done(outcome) => {
                    self.canonical = self.canonicalizer.canonicalize(&outcome.solutions, &self.steps)?;
                    self.finished = true;
                    updates.push(SessionUpdate::Finished(SessionReport {
                        raw: outcome,
                        canonical: self.canonical.clone(),
                    }));
                }
            }
        }
        Ok(updates)
    }

    /// Step to completion, forwarding every update to `on_update`.
    pub fn run(mut self, mut on_update: impl FnMut(&SessionUpdate)) -> Result<SessionReport> {
        loop {
            for update in self.step()? {
                on_update(&update);
                if let SessionUpdate::Finished(report) = update {
                    return Ok(report);
                }
            }
        }
    }
}
