// Step vocabulary generation.
//
// Produces the candidate generator intervals offered to the pump solver: every
// reduced ratio `num/den` strictly inside the octave (1/2 < r < 2), within an
// odd limit, that factors completely over the prime basis. Both ascending and
// descending ratios appear (e.g. 3/2 and 4/3), since the solver takes signed
// coefficients anyway and the two differ by an octave.
//
// The list is sorted by size in cents (ties by monzo L1) and truncated, so the
// smallest, most "step-like" intervals come first.

use crate::monzo::{Monzo, Step, cents};
use crate::vector::{gcd, l1};
use rustc_hash::FxHashSet;

/// Factor `num/den` over `primes`. `None` if either side has a prime factor
/// outside the basis.
pub fn factor_to_monzo(num: u64, den: u64, primes: &[u64]) -> Option<Monzo> {
    let (mut n, mut d) = (num, den);
    let mut exps = vec![0i64; primes.len()];
    for (e, &p) in exps.iter_mut().zip(primes) {
        while n % p == 0 {
            n /= p;
            *e += 1;
        }
        while d % p == 0 {
            d /= p;
            *e -= 1;
        }
    }
    (n == 1 && d == 1).then_some(exps)
}

/// Strip factors of two.
pub fn odd_part(mut n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    while n % 2 == 0 {
        n /= 2;
    }
    n
}

/// Build the sorted, deduplicated vocabulary of intervals within `odd_limit`.
pub fn generate_vocabulary(primes: &[u64], odd_limit: u64, max_count: usize) -> Vec<Step> {
    let mut items: Vec<Step> = Vec::new();
    let mut seen: FxHashSet<Monzo> = FxHashSet::default();

    for num in 1..=odd_limit {
        for den in 1..=odd_limit {
            if num == den || gcd(num as i64, den as i64) != 1 {
                continue;
            }
            if odd_part(num).max(odd_part(den)) > odd_limit {
                continue;
            }
            let ratio = num as f64 / den as f64;
            if ratio <= 0.5 || ratio >= 2.0 {
                continue;
            }
            let Some(monzo) = factor_to_monzo(num, den, primes) else {
                continue;
            };
            if !seen.insert(monzo.clone()) {
                continue;
            }
            let size = cents(&monzo, primes).abs();
            items.push(Step {
                name: format!("{num}/{den}"),
                monzo,
                cents: size,
            });
        }
    }

    items.sort_by(|a, b| {
        a.cents
            .total_cmp(&b.cents)
            .then_with(|| l1(&a.monzo).cmp(&l1(&b.monzo)))
    });
    items.truncate(max_count);
    items
}
