// Exact integer null space of a step matrix.
//
// The step matrix `S` has one row per prime and one column per step. Its
// right kernel `{x : S·x = 0}` describes the redundancies among the steps:
// adding a kernel vector to a pump changes the phrasing but not the net
// interval. `canonical.rs` reduces pumps modulo this lattice.
//
// Algorithm: Gauss-Jordan elimination to reduced row-echelon form over exact
// rationals (`BigRational`, always in lowest terms), recording the pivot
// column of each pivot row. Each free column `f` yields one basis vector:
// 1 at `f`, and `-A[r][f]` at the pivot column of every pivot row `r`. That
// vector is scaled by the lcm of its denominators and divided by its gcd to
// give a primitive integer vector. No floating point is involved anywhere.
//
// Every returned vector is checked against the original integer matrix
// before it is handed out; a failure is an error, never a silently wrong
// basis.
//
// `KernelCache` memoizes bases per step set. It is keyed by the exact ordered
// list of step monzos, so two step sets share an entry only if they are
// structurally identical.

use crate::error::{PumpError, Result};
use crate::monzo::Monzo;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};
use rustc_hash::FxHashMap;

/// Row-major integer matrix whose columns are the given step monzos.
pub fn step_matrix(columns: &[Monzo]) -> Vec<Vec<i64>> {
    let dim = columns.first().map_or(0, Vec::len);
    (0..dim)
        .map(|i| columns.iter().map(|c| c.get(i).copied().unwrap_or(0)).collect())
        .collect()
}

/// Reduce `a` in place to reduced row-echelon form. Returns `(row, col)` for
/// every pivot, in row order.
fn rref(a: &mut [Vec<BigRational>]) -> Vec<(usize, usize)> {
    let rows = a.len();
    let cols = a.first().map_or(0, Vec::len);
    let mut pivots = Vec::new();
    let mut row = 0;

    for col in 0..cols {
        if row == rows {
            break;
        }
        let Some(pivot) = (row..rows).find(|&r| !a[r][col].is_zero()) else {
            continue;
        };
        a.swap(pivot, row);

        let inv = a[row][col].recip();
        for entry in &mut a[row][col..] {
            *entry = &*entry * &inv;
        }

        for r in 0..rows {
            if r == row || a[r][col].is_zero() {
                continue;
            }
            let factor = a[r][col].clone();
            for c in col..cols {
                let delta = &factor * &a[row][c];
                a[r][c] -= delta;
            }
        }

        pivots.push((row, col));
        row += 1;
    }
    pivots
}

/// Integer basis of `{x : matrix·x = 0}`, one primitive vector per free
/// column. Empty when the matrix has no columns or full column rank.
pub fn nullspace(matrix: &[Vec<i64>]) -> Result<Vec<Vec<i64>>> {
    let cols = matrix.first().map_or(0, Vec::len);
    if cols == 0 {
        return Ok(Vec::new());
    }
    for (row, r) in matrix.iter().enumerate() {
        if r.len() != cols {
            return Err(PumpError::RaggedMatrix {
                row,
                expected: cols,
                found: r.len(),
            });
        }
    }

    let mut a: Vec<Vec<BigRational>> = matrix
        .iter()
        .map(|r| r.iter().map(|&v| BigRational::from_integer(BigInt::from(v))).collect())
        .collect();
    let pivots = rref(&mut a);

    let mut is_pivot = vec![false; cols];
    for &(_, c) in &pivots {
        is_pivot[c] = true;
    }

    let mut basis = Vec::new();
    for free in (0..cols).filter(|&c| !is_pivot[c]) {
        let mut v = vec![BigRational::zero(); cols];
        v[free] = BigRational::one();
        for &(r, p) in &pivots {
            v[p] = -a[r][free].clone();
        }
        let ints = to_primitive_integers(&v)?;
        if ints.iter().all(|&x| x == 0) {
            return Err(PumpError::KernelDegenerate(format!(
                "free column {free} produced the zero vector"
            )));
        }
        verify_in_kernel(matrix, &ints)?;
        basis.push(ints);
    }
    Ok(basis)
}

/// Clear denominators, divide by the gcd, and narrow to `i64`.
fn to_primitive_integers(v: &[BigRational]) -> Result<Vec<i64>> {
    let scale = v
        .iter()
        .fold(BigInt::one(), |acc, q| acc.lcm(q.denom()));
    let scaled: Vec<BigInt> = v
        .iter()
        .map(|q| q.numer() * (&scale / q.denom()))
        .collect();
    let g = scaled
        .iter()
        .fold(BigInt::zero(), |acc, x| acc.gcd(x));
    scaled
        .iter()
        .map(|x| {
            let x = if g.is_zero() || g.is_one() { x.clone() } else { x / &g };
            x.to_i64().ok_or(PumpError::KernelOverflow)
        })
        .collect()
}

fn verify_in_kernel(matrix: &[Vec<i64>], v: &[i64]) -> Result<()> {
    for (i, row) in matrix.iter().enumerate() {
        let sum: i128 = row
            .iter()
            .zip(v)
            .map(|(&a, &b)| a as i128 * b as i128)
            .sum();
        if sum != 0 {
            return Err(PumpError::KernelDegenerate(format!(
                "row {i} of S·κ is {sum} for κ = {v:?}"
            )));
        }
    }
    Ok(())
}

/// Memo table of kernel bases, keyed by the ordered step monzos.
#[derive(Debug, Default)]
pub struct KernelCache {
    entries: FxHashMap<Vec<Monzo>, Vec<Vec<i64>>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel basis of the matrix whose columns are `columns`, computing and
    /// storing it on first use.
    pub fn basis(&mut self, columns: &[Monzo]) -> Result<&[Vec<i64>]> {
        if self.entries.contains_key(columns) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let basis = nullspace(&step_matrix(columns))?;
            self.entries.insert(columns.to_vec(), basis);
        }
        Ok(self.entries.get(columns).map_or(&[], Vec::as_slice))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
