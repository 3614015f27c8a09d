// Crate-wide error type.
//
// Only synchronous failures live here: bad inputs rejected before any
// incremental work is scheduled, kernel computations that fail their own
// verification, and config loading. Outcomes of a running sweep or search
// (infeasible, timed out, cancelled, capped) are not errors; they arrive as
// the terminal `Done` event with a `StopReason`. A machine that stops without
// that event is a bug, reported as `MissingOutcome`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("prime basis is empty")]
    EmptyPrimeBasis,

    #[error("step vocabulary is empty")]
    EmptyStepVocabulary,

    /// A vector's length does not match the session's prime basis.
    #[error("{what} has {found} entries, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("target comma is the zero monzo")]
    ZeroTarget,

    #[error("cents threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("matrix row {row} has {found} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Row reduction produced a basis vector that is not in the kernel.
    #[error("kernel computation failed verification: {0}")]
    KernelDegenerate(String),

    #[error("kernel basis entry does not fit in i64")]
    KernelOverflow,

    /// A machine reported finished without emitting its terminal `Done`.
    #[error("{0} finished without a final result")]
    MissingOutcome(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PumpError>;
