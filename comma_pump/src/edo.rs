// EDO tempering checks.
//
// An N-EDO maps each prime p to the nearest whole number of steps,
// `round(N · log2 p)` (its patent val). The EDO tempers out a comma when that
// mapping sends the comma's monzo to zero steps.

use crate::vector::dot;
use std::ops::RangeInclusive;

/// Patent val of `n`-EDO over the prime basis.
pub fn edo_val(n: u32, primes: &[u64]) -> Vec<i64> {
    primes
        .iter()
        .map(|&p| (n as f64 * (p as f64).log2()).round() as i64)
        .collect()
}

pub fn tempers(comma: &[i64], n: u32, primes: &[u64]) -> bool {
    dot(&edo_val(n, primes), comma) == 0
}

/// All EDOs in `range` whose patent val tempers out `comma`.
pub fn edos_tempering(comma: &[i64], primes: &[u64], range: RangeInclusive<u32>) -> Vec<u32> {
    range.filter(|&n| n > 0 && tempers(comma, n, primes)).collect()
}
