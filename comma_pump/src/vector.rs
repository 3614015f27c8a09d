// Integer vector helpers shared by every lattice computation.
//
// Monzos, pump coefficient vectors and kernel vectors are all plain `i64`
// slices. This module holds the handful of operations they need: gcd/lcm,
// L1 norm, dot products, the step-matrix image `S·x`, and the total order
// used to rank pumps (L1 first, then lexicographic by signed magnitude).

use std::cmp::Ordering;

/// Non-negative gcd. `gcd(0, 0) == 0`.
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a as i64
}

/// Non-negative lcm. Zero if either argument is zero.
pub fn lcm(a: i64, b: i64) -> i64 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b) * b).abs()
}

/// Gcd of all entries; zero for an all-zero (or empty) vector.
pub fn vec_gcd(v: &[i64]) -> i64 {
    v.iter().fold(0, |g, &x| gcd(g, x))
}

pub fn l1(v: &[i64]) -> i64 {
    v.iter().map(|x| x.abs()).sum()
}

pub fn dot(a: &[i64], b: &[i64]) -> i64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn is_zero(v: &[i64]) -> bool {
    v.iter().all(|&x| x == 0)
}

/// `a + t·b`, entrywise.
pub fn add_scaled(a: &[i64], b: &[i64], t: i64) -> Vec<i64> {
    a.iter().zip(b).map(|(x, y)| x + t * y).collect()
}

/// Image of a coefficient vector under the step matrix: `Σ_j coeffs[j] · columns[j]`.
///
/// `columns` are the step monzos (the columns of `S`), each of length `dim`.
pub fn apply_columns<C: AsRef<[i64]>>(columns: &[C], coeffs: &[i64], dim: usize) -> Vec<i64> {
    let mut out = vec![0; dim];
    for (col, &c) in columns.iter().zip(coeffs) {
        if c == 0 {
            continue;
        }
        for (o, &m) in out.iter_mut().zip(col.as_ref()) {
            *o += c * m;
        }
    }
    out
}

/// Ranking order for pumps: ascending L1 norm, ties broken lexicographically
/// by signed magnitude. Each coordinate compares `|aᵢ|` first and the signed
/// value second, so `[0, 1]` ranks before `[-1, 0]` and `-1` before `1`.
pub fn cmp_l1_lex(a: &[i64], b: &[i64]) -> Ordering {
    l1(a).cmp(&l1(b)).then_with(|| cmp_signed_magnitude(a, b))
}

fn cmp_signed_magnitude(a: &[i64], b: &[i64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.abs().cmp(&y.abs()).then(x.cmp(y));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
