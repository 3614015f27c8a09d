// Monzos: integer exponent vectors over a fixed prime basis.
//
// A monzo `[e0, e1, ...]` over primes `[p0, p1, ...]` stands for the ratio
// `p0^e0 · p1^e1 · ...`. The session's prime basis fixes the dimension; every
// monzo, step and target in a session has exactly that many entries.
//
// This module provides:
// - `cents()`: logarithmic size of a monzo (1200 per octave)
// - `normalize_primitive()`: divide out the entry gcd and fix the sign, so
//   that positive multiples of one vector compare equal
// - `ratio_string()`: human-readable `num/den` rendering
// - `Step`: a named generator interval used to build pumps
//
// See also: `comma.rs` which deduplicates commas by primitive form, and
// `solver.rs` which consumes `Step` vocabularies.

use crate::vector::vec_gcd;
use serde::{Deserialize, Serialize};

/// Integer exponent vector over the session's prime basis.
pub type Monzo = Vec<i64>;

/// Size of a monzo in cents: `1200 · Σ eᵢ·log2(pᵢ)`.
pub fn cents(monzo: &[i64], primes: &[u64]) -> f64 {
    let octaves: f64 = monzo
        .iter()
        .zip(primes)
        .map(|(&e, &p)| e as f64 * (p as f64).log2())
        .sum();
    1200.0 * octaves
}

/// Primitive form: divide by the entrywise gcd, then negate the whole vector
/// if its first nonzero entry is negative. The zero vector is returned as is.
pub fn normalize_primitive(monzo: &[i64]) -> Monzo {
    let g = vec_gcd(monzo);
    if g == 0 {
        return monzo.to_vec();
    }
    let mut out: Monzo = monzo.iter().map(|&e| e / g).collect();
    if out.iter().find(|&&e| e != 0).is_some_and(|&e| e < 0) {
        for e in &mut out {
            *e = -*e;
        }
    }
    out
}

/// Render a monzo as `numerator/denominator`, e.g. `3^4/2^4·5` for 81/80.
pub fn ratio_string(monzo: &[i64], primes: &[u64]) -> String {
    let mut num = Vec::new();
    let mut den = Vec::new();
    for (&e, &p) in monzo.iter().zip(primes) {
        let side = if e > 0 { &mut num } else { &mut den };
        match e.abs() {
            0 => {}
            1 => side.push(p.to_string()),
            k => side.push(format!("{p}^{k}")),
        }
    }
    let join = |parts: Vec<String>| {
        if parts.is_empty() {
            "1".to_string()
        } else {
            parts.join("·")
        }
    };
    format!("{}/{}", join(num), join(den))
}

/// A named generator interval. The solver only reads `monzo`; `cents` and
/// `name` are carried for display and for pump walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub monzo: Monzo,
    pub cents: f64,
}

impl Step {
    /// Build a step, computing its cents from the prime basis.
    pub fn new(name: impl Into<String>, monzo: Monzo, primes: &[u64]) -> Self {
        let cents = cents(&monzo, primes);
        Step {
            name: name.into(),
            monzo,
            cents,
        }
    }

    /// A step with only a monzo, named after it. Cents are left at zero,
    /// which is enough for solving and canonicalizing.
    pub fn from_monzo(monzo: Monzo) -> Self {
        let name = format!(
            "<{}>",
            monzo.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(" ")
        );
        Step {
            name,
            monzo,
            cents: 0.0,
        }
    }
}
