//! Dense LU factorization of a basis matrix.
//!
//! `P*B = L*U` with `L` unit lower triangular and `U` upper triangular, both kept
//! in one row-major array. Rows are chosen by partial pivoting.
//!
//! The factors are stored densely: `invert` allocates `m * m` values and costs
//! `O(m^3)`, and each solve costs `O(m^2)`. This suits bases of a few hundred
//! rows. Larger problems need a sparse factorization with Markowitz pivoting.

use crate::sparse::SparseVec;

/// Why a basis matrix could not be factorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LuFailure {
    /// No acceptable pivot left in some column
    Singular,
    /// Elimination blew the element magnitudes past the growth limit
    IllConditioned,
}

#[derive(Debug, Clone)]
pub(crate) struct Factorization {
    m: usize,
    lu: Vec<f64>,
    /// Row `k` of `P*B` is row `perm[k]` of `B`
    perm: Vec<usize>,
}

impl Factorization {
    /// Factorize the `m x m` matrix whose column `j` is written into the buffer
    /// by `column(j, buf)` as row indices and values.
    ///
    /// A pivot is rejected when its magnitude is below `eps_tol` times the
    /// largest magnitude of the matrix.
    pub(crate) fn decompose(
        m: usize,
        mut column: impl FnMut(usize, &mut SparseVec),
        eps_tol: f64,
        max_gro: f64,
    ) -> Result<Self, LuFailure> {
        let mut lu = vec![0.0; m * m];
        let mut buf = SparseVec::with_capacity(m);
        for j in 0..m {
            buf.clear();
            column(j, &mut buf);
            for (i, v) in buf.iter() {
                lu[i * m + j] += v;
            }
        }
        let big = lu.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if big == 0.0 {
            return Err(LuFailure::Singular);
        }

        let mut perm: Vec<usize> = (0..m).collect();
        let mut max_u = big;
        for k in 0..m {
            let (p, piv) = (k..m)
                .map(|i| (i, lu[i * m + k].abs()))
                .fold((k, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
            if piv < eps_tol * big {
                return Err(LuFailure::Singular);
            }
            if p != k {
                for j in 0..m {
                    lu.swap(k * m + j, p * m + j);
                }
                perm.swap(k, p);
            }
            let pivot = lu[k * m + k];
            for i in k + 1..m {
                let l = lu[i * m + k] / pivot;
                if l == 0.0 {
                    continue;
                }
                lu[i * m + k] = l;
                for j in k + 1..m {
                    let u = lu[i * m + j] - l * lu[k * m + j];
                    lu[i * m + j] = u;
                    max_u = max_u.max(u.abs());
                }
            }
        }
        if max_u / big > max_gro {
            return Err(LuFailure::IllConditioned);
        }
        Ok(Self { m, lu, perm })
    }

    pub(crate) fn order(&self) -> usize {
        self.m
    }

    /// Solve `B*x = b`, overwriting `b` with `x`.
    pub(crate) fn ftran(&self, x: &mut [f64]) {
        let m = self.m;
        let mut y: Vec<f64> = self.perm.iter().map(|&p| x[p]).collect();
        for i in 0..m {
            let mut sum = y[i];
            for j in 0..i {
                sum -= self.lu[i * m + j] * y[j];
            }
            y[i] = sum;
        }
        for i in (0..m).rev() {
            let mut sum = y[i];
            for j in i + 1..m {
                sum -= self.lu[i * m + j] * y[j];
            }
            y[i] = sum / self.lu[i * m + i];
        }
        x.copy_from_slice(&y);
    }

    /// Solve `B'*x = b`, overwriting `b` with `x`.
    pub(crate) fn btran(&self, x: &mut [f64]) {
        let m = self.m;
        let mut z = x.to_vec();
        // U' z = b
        for i in 0..m {
            let mut sum = z[i];
            for j in 0..i {
                sum -= self.lu[j * m + i] * z[j];
            }
            z[i] = sum / self.lu[i * m + i];
        }
        // L' w = z
        for i in (0..m).rev() {
            let mut sum = z[i];
            for j in i + 1..m {
                sum -= self.lu[j * m + i] * z[j];
            }
            z[i] = sum;
        }
        for (k, &p) in self.perm.iter().enumerate() {
            x[p] = z[k];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn from_dense(a: &[Vec<f64>], eps_tol: f64, max_gro: f64) -> Result<Factorization, LuFailure> {
        Factorization::decompose(
            a.len(),
            |j, buf| {
                for (i, row) in a.iter().enumerate() {
                    if row[j] != 0.0 {
                        buf.push(i, row[j]);
                    }
                }
            },
            eps_tol,
            max_gro,
        )
    }

    #[test]
    fn test_ftran_and_btran_solve() {
        let a = vec![vec![0.0, 2.0, 1.0], vec![1.0, 1.0, 0.0], vec![4.0, 0.0, -1.0]];
        let lu = from_dense(&a, 1e-13, 1e10).unwrap();
        assert_eq!(lu.order(), 3);

        let x_true = [1.0, -2.0, 3.0];
        let mut b: Vec<f64> = a.iter().map(|row| row.iter().zip(&x_true).map(|(a, x)| a * x).sum()).collect();
        lu.ftran(&mut b);
        for k in 0..3 {
            assert_abs_diff_eq!(b[k], x_true[k], epsilon = 1e-12);
        }

        let mut c: Vec<f64> = (0..3).map(|j| (0..3).map(|i| a[i][j] * x_true[i]).sum()).collect();
        lu.btran(&mut c);
        for k in 0..3 {
            assert_abs_diff_eq!(c[k], x_true[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_singular_matrix() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(from_dense(&a, 1e-13, 1e10).unwrap_err(), LuFailure::Singular);
        let zero = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        assert_eq!(from_dense(&zero, 1e-13, 1e10).unwrap_err(), LuFailure::Singular);
    }

    #[test]
    fn test_growth_limit() {
        let a = vec![vec![1.0, 1.0], vec![-1.0, 1.0]];
        assert_eq!(from_dense(&a, 1e-13, 1.5).unwrap_err(), LuFailure::IllConditioned);
        assert!(from_dense(&a, 1e-13, 1e10).is_ok());
    }
}
