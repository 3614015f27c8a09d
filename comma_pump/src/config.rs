// Explorer configuration.
//
// Every tunable of a CLI or embedding session lives in `ExplorerConfig`,
// loaded from JSON (`ExplorerConfig::load`) or built from `Default`. The
// defaults reproduce the interactive explorer's starting state: the 5-limit
// basis, exponents up to ±5, commas under 30 cents, an 11-odd-limit
// vocabulary of at most 60 steps, EDOs 5 through 72, and a solver bounded at
// ±6 with 200 retained solutions and a 10-second budget.
//
// Sub-configs (`SweepConfig`, `SolverConfig`) are defined next to the
// machines that read them. All structs reject unknown fields so a typo in a
// config file fails loudly instead of silently falling back to a default.
//
// See also: `comma.rs`, `solver.rs`, and `main.rs` where CLI flags override
// individual fields after loading.

use crate::comma::SweepConfig;
use crate::error::Result;
use crate::primes::parse_prime_input;
use crate::solver::SolverConfig;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorerConfig {
    /// Prime basis as typed by a user: a prime limit ("7") or an explicit
    /// subgroup ("2,3,7"). Parsed with `parse_prime_input`.
    pub primes: String,
    /// Per-prime exponent bound for the comma sweep.
    pub exp_bound: u32,
    /// Largest comma size, in cents.
    pub max_cents: f64,
    /// Odd limit of the generated step vocabulary.
    pub odd_limit: u64,
    /// Vocabulary size after sorting by cents.
    pub max_steps: usize,
    pub edo_min: u32,
    pub edo_max: u32,
    pub sweep: SweepConfig,
    pub solver: SolverConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            primes: "5".to_string(),
            exp_bound: 5,
            max_cents: 30.0,
            odd_limit: 11,
            max_steps: 60,
            edo_min: 5,
            edo_max: 72,
            sweep: SweepConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// The parsed prime basis.
    pub fn prime_basis(&self) -> Vec<u64> {
        parse_prime_input(&self.primes)
    }

    /// EDO range to test for tempering, normalized so `min <= max`.
    pub fn edo_range(&self) -> RangeInclusive<u32> {
        let lo = self.edo_min.max(1);
        let hi = self.edo_max.max(lo);
        lo..=hi
    }
}
