// Prime-basis parsing.
//
// Users describe the basis either as a prime limit ("7" means 2,3,5,7) or as
// an explicit subgroup ("2,5,7"). Anything unusable falls back to the
// 5-limit basis [2, 3, 5] rather than failing, so a half-typed field never
// leaves the explorer without a basis. Prime limits above `MAX_PRIME_LIMIT`
// count as unusable too.

/// Basis used when the input names no usable primes.
pub const DEFAULT_BASIS: [u64; 3] = [2, 3, 5];

/// Largest accepted prime limit. Already far past any lattice the sweep or
/// solver can search.
pub const MAX_PRIME_LIMIT: u64 = 10_000;

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// All primes `<= min(n, MAX_PRIME_LIMIT)` by the sieve of Eratosthenes.
pub fn primes_up_to(n: u64) -> Vec<u64> {
    if n < 2 {
        return Vec::new();
    }
    let n = n.min(MAX_PRIME_LIMIT) as usize;
    let mut sieve = vec![true; n + 1];
    sieve[0] = false;
    sieve[1] = false;
    let mut p = 2;
    while p * p <= n {
        if sieve[p] {
            for m in (p * p..=n).step_by(p) {
                sieve[m] = false;
            }
        }
        p += 1;
    }
    sieve
        .iter()
        .enumerate()
        .filter(|(_, is_p)| **is_p)
        .map(|(i, _)| i as u64)
        .collect()
}

/// Parse a prime limit (`"11"`) or a comma-separated subgroup (`"2,5,7"`).
///
/// Subgroups keep only primes, deduplicated and sorted ascending.
pub fn parse_prime_input(text: &str) -> Vec<u64> {
    let t = text.trim();
    if t.is_empty() {
        return DEFAULT_BASIS.to_vec();
    }
    if t.contains(',') {
        let mut primes: Vec<u64> = t
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .filter(|&p| is_prime(p))
            .collect();
        primes.sort_unstable();
        primes.dedup();
        if primes.is_empty() {
            return DEFAULT_BASIS.to_vec();
        }
        return primes;
    }
    match t.parse::<u64>() {
        Ok(limit) if (2..=MAX_PRIME_LIMIT).contains(&limit) => primes_up_to(limit),
        _ => DEFAULT_BASIS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prime_limit_expands() {
        assert_eq!(parse_prime_input("5"), vec![2, 3, 5]);
        assert_eq!(parse_prime_input("11"), vec![2, 3, 5, 7, 11]);
    }

    #[test]
    fn subgroup_sorted_and_filtered() {
        assert_eq!(parse_prime_input("7, 2,5,9,5"), vec![2, 5, 7]);
    }

    #[test]
    fn garbage_falls_back_to_five_limit() {
        assert_eq!(parse_prime_input(""), vec![2, 3, 5]);
        assert_eq!(parse_prime_input("1"), vec![2, 3, 5]);
        assert_eq!(parse_prime_input("4,6"), vec![2, 3, 5]);
        assert_eq!(parse_prime_input("abc"), vec![2, 3, 5]);
    }

    #[test]
    fn huge_prime_limit_falls_back() {
        assert_eq!(parse_prime_input("100000000000"), vec![2, 3, 5]);
        assert_eq!(parse_prime_input(&(MAX_PRIME_LIMIT + 1).to_string()), vec![2, 3, 5]);
        assert_eq!(parse_prime_input("10000").last(), Some(&9973));
        assert_eq!(primes_up_to(u64::MAX).last(), Some(&9973));
    }

    #[test]
    fn primality() {
        assert!(is_prime(2));
        assert!(is_prime(97));
        assert!(!is_prime(1));
        assert!(!is_prime(91));
    }
}
