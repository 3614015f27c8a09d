// Comma Pump Explorer
//
// Explores just-intonation commas (tiny intervals built from small primes)
// and comma pumps: integer combinations of chosen interval generators whose
// net motion is exactly a target comma, so the progression closes a loop.
//
// Architecture:
// - vector.rs: Integer gcd/lcm, L1 norm, dot products, pump ordering
// - monzo.rs: Prime-exponent vectors (monzos), cents, primitive form, `Step`
// - primes.rs: Prime-basis parsing (prime limit or explicit subgroup)
// - vocabulary.rs: Odd-limit step vocabulary generation
// - edo.rs: Which equal divisions of the octave temper out a comma
// - comma.rs: Bounded lattice sweep for commas, blocking and incremental
// - kernel.rs: Exact rational RREF and integer null-space basis, with cache
// - solver.rs: Meet-in-the-middle pump search as a resumable state machine
// - canonical.rs: Reduction of pumps modulo the step-matrix kernel
// - session.rs: Drives a solver to completion, canonicalizing every batch
// - walk.rs: Unit-move trajectory of a pump (JI and EDO-rounded cents)
// - schedule.rs: Cancel tokens, chunk clocks and stop reasons shared by the
//   incremental machines
// - config.rs: JSON-loadable explorer configuration
// - error.rs: Crate-wide error type
//
// Every correctness decision (solution validity, kernel membership,
// feasibility) is made in exact integer arithmetic. Cents are floating point
// and only ever used for filtering, sorting and display.
//
// Nothing here spawns threads. The incremental machines (`CommaSweep`,
// `PumpSolver`) do a bounded slice of work per `step()` call and return the
// events produced during that slice; the caller owns the scheduling.

pub mod canonical;
pub mod comma;
pub mod config;
pub mod edo;
pub mod error;
pub mod kernel;
pub mod monzo;
pub mod primes;
pub mod schedule;
pub mod session;
pub mod solver;
pub mod vector;
pub mod vocabulary;
pub mod walk;

#[cfg(test)]
mod proptests;

pub use error::{PumpError, Result};
pub use monzo::{Monzo, Step};
