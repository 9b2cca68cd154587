use log::{debug, warn};

use crate::error::{LpError, LpResult, ensure};
use crate::lu::{Factorization, LuFailure};
use crate::problem::Problem;

/// Outcome of (re)factorizing the basis matrix
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvertStatus {
    Success,
    /// The basis matrix is numerically singular
    Singular,
    /// The basis matrix is too ill-conditioned to factorize
    IllConditioned,
    /// The statuses do not define a basis (wrong number of basic variables)
    StructuralError,
}

/// Whether a factorized basis is available
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisStatus {
    Undefined,
    Valid,
}

/// Basis header together with the factorization of the basis matrix.
///
/// The header and the factorization are replaced together; the basis is valid
/// exactly when a factorization is present.
#[derive(Debug, Clone, Default)]
pub(crate) struct Basis {
    /// Variable id at each basis position
    pub(crate) head: Vec<usize>,
    /// Basis position of each variable id
    pub(crate) pos: Vec<Option<usize>>,
    factor: Option<Factorization>,
}

impl Basis {
    pub(crate) fn clear(&mut self) {
        self.head.clear();
        self.pos.clear();
        self.factor = None;
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.factor.is_some()
    }
}

impl Problem {
    pub fn is_basis_valid(&self) -> bool {
        self.basis.is_valid()
    }

    pub fn basis_status(&self) -> BasisStatus {
        if self.basis.is_valid() { BasisStatus::Valid } else { BasisStatus::Undefined }
    }

    pub(crate) fn factor(&self, op: &'static str) -> LpResult<&Factorization> {
        self.basis.factor.as_ref().ok_or(LpError::BasisUnavailable { op })
    }

    /// Build the basis header from the current statuses and factorize the
    /// basis matrix. On failure the basis stays undefined.
    pub fn invert(&mut self) -> InvertStatus {
        let m = self.num_rows();
        let head: Vec<usize> = (0..m + self.num_cols()).filter(|&k| self.var(k).stat.is_basic()).collect();
        if m == 0 || head.len() != m {
            debug!("invert: {} basic variables for {} rows", head.len(), m);
            self.invalidate_basis();
            return InvertStatus::StructuralError;
        }
        self.factorize(head)
    }

    /// Install `head` as the basis header (position `i` holds variable
    /// `head[i]`) and factorize it. Every listed variable must be basic and
    /// the header must list `m` distinct variables.
    pub fn replace_basis(&mut self, head: &[usize]) -> LpResult<InvertStatus> {
        const OP: &str = "replace_basis";
        let m = self.num_rows();
        ensure!(head.len() == m, OP, "header has {} entries, expected {}", head.len(), m);
        let mut seen = vec![false; m + self.num_cols()];
        for (i, &k) in head.iter().enumerate() {
            self.check_var(OP, k)?;
            ensure!(self.var(k).stat.is_basic(), OP, "head[{}] = {}; invalid reference to non-basic variable", i, k);
            ensure!(!seen[k], OP, "head[{}] = {}; duplicate reference to basic variable", i, k);
            seen[k] = true;
        }
        if m == 0 {
            self.invalidate_basis();
            return Ok(InvertStatus::StructuralError);
        }
        Ok(self.factorize(head.to_vec()))
    }

    fn factorize(&mut self, head: Vec<usize>) -> InvertStatus {
        let m = self.num_rows();
        let result = Factorization::decompose(
            m,
            |j, buf| {
                let k = head[j];
                if k < m {
                    buf.push(k, 1.0);
                } else {
                    let c = k - m;
                    let sjj = self.cols[c].scale;
                    for (i, a) in self.matrix.col(c) {
                        buf.push(i, -self.rows[i].scale * a * sjj);
                    }
                }
            },
            self.params.eps_tol,
            self.params.max_gro,
        );
        self.invalidate_basis();
        match result {
            Ok(factor) => {
                let mut pos = vec![None; m + self.num_cols()];
                for (i, &k) in head.iter().enumerate() {
                    pos[k] = Some(i);
                }
                self.basis.head = head;
                self.basis.pos = pos;
                self.basis.factor = Some(factor);
                debug!("invert: basis of order {} factorized", m);
                InvertStatus::Success
            }
            Err(LuFailure::Singular) => {
                warn!("invert: basis matrix is singular");
                InvertStatus::Singular
            }
            Err(LuFailure::IllConditioned) => {
                warn!("invert: basis matrix is ill-conditioned");
                InvertStatus::IllConditioned
            }
        }
    }

    /// Variable at position `i` of the basis header.
    pub fn b_info(&self, i: usize) -> LpResult<usize> {
        const OP: &str = "b_info";
        self.factor(OP)?;
        ensure!(i < self.num_rows(), OP, "i = {}; index out of range", i);
        Ok(self.basis.head[i])
    }

    /// Basis position of row `i`, or `None` when it is nonbasic.
    pub fn row_b_ind(&self, i: usize) -> LpResult<Option<usize>> {
        const OP: &str = "row_b_ind";
        self.factor(OP)?;
        self.check_row(OP, i)?;
        Ok(self.basis.pos[i])
    }

    /// Basis position of column `j`, or `None` when it is nonbasic.
    pub fn col_b_ind(&self, j: usize) -> LpResult<Option<usize>> {
        const OP: &str = "col_b_ind";
        self.factor(OP)?;
        self.check_col(OP, j)?;
        Ok(self.basis.pos[self.num_rows() + j])
    }

    /// Solve `B*x = b` for the unscaled basis matrix, overwriting `x`.
    pub fn ftran(&self, x: &mut [f64]) -> LpResult<()> {
        const OP: &str = "ftran";
        let lu = self.factor(OP)?;
        let m = lu.order();
        ensure!(x.len() == m, OP, "vector has length {}, expected {}", x.len(), m);
        for (xi, row) in x.iter_mut().zip(&self.rows) {
            *xi *= row.scale;
        }
        lu.ftran(x);
        for (xi, &k) in x.iter_mut().zip(&self.basis.head) {
            if k < m {
                *xi /= self.rows[k].scale;
            } else {
                *xi *= self.cols[k - m].scale;
            }
        }
        Ok(())
    }

    /// Solve `B'*x = b` for the unscaled basis matrix, overwriting `x`.
    pub fn btran(&self, x: &mut [f64]) -> LpResult<()> {
        const OP: &str = "btran";
        let lu = self.factor(OP)?;
        let m = lu.order();
        ensure!(x.len() == m, OP, "vector has length {}, expected {}", x.len(), m);
        for (xi, &k) in x.iter_mut().zip(&self.basis.head) {
            if k < m {
                *xi /= self.rows[k].scale;
            } else {
                *xi *= self.cols[k - m].scale;
            }
        }
        lu.btran(x);
        for (xi, row) in x.iter_mut().zip(&self.rows) {
            *xi *= row.scale;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Bounds, VarStatus};
    use approx::assert_abs_diff_eq;

    /// x0 + 2 x1 and 3 x0 + x1 with both columns basic.
    fn two_by_two() -> Problem {
        let mut lp = Problem::new();
        lp.add_rows(2).unwrap();
        lp.add_cols(2).unwrap();
        lp.set_mat_row(0, &[0, 1], &[1.0, 2.0]).unwrap();
        lp.set_mat_row(1, &[0, 1], &[3.0, 1.0]).unwrap();
        for j in 0..2 {
            lp.set_col_bnds(j, Bounds::Lower(0.0)).unwrap();
            lp.set_col_stat(j, VarStatus::Basic).unwrap();
        }
        for i in 0..2 {
            lp.set_row_bnds(i, Bounds::Upper(10.0)).unwrap();
            lp.set_row_stat(i, VarStatus::NonbasicUpper).unwrap();
        }
        lp
    }

    #[test]
    fn test_invert_identity_basis() {
        let mut lp = Problem::new();
        lp.add_rows(2).unwrap();
        lp.add_cols(1).unwrap();
        assert_eq!(lp.invert(), InvertStatus::Success);
        assert_eq!(lp.basis_status(), BasisStatus::Valid);
        assert_eq!(lp.b_info(1).unwrap(), 1);
        assert_eq!(lp.row_b_ind(0).unwrap(), Some(0));
        assert_eq!(lp.col_b_ind(0).unwrap(), None);

        let mut x = vec![3.0, -4.0];
        lp.ftran(&mut x).unwrap();
        assert_eq!(x, vec![3.0, -4.0]);
    }

    #[test]
    fn test_invert_structural_error() {
        let mut lp = Problem::new();
        lp.add_rows(1).unwrap();
        lp.add_cols(1).unwrap();
        lp.set_col_stat(0, VarStatus::Basic).unwrap();
        assert_eq!(lp.invert(), InvertStatus::StructuralError);
        assert!(!lp.is_basis_valid());

        let mut empty = Problem::new();
        assert_eq!(empty.invert(), InvertStatus::StructuralError);
    }

    #[test]
    fn test_invert_singular() {
        let mut lp = two_by_two();
        lp.set_mat_row(1, &[0, 1], &[2.0, 4.0]).unwrap();
        assert_eq!(lp.invert(), InvertStatus::Singular);
        assert!(matches!(lp.b_info(0), Err(LpError::BasisUnavailable { .. })));
    }

    #[test]
    fn test_ftran_btran_with_scaling() {
        let mut lp = two_by_two();
        lp.set_rii(0, 0.5).unwrap();
        lp.set_sjj(1, 4.0).unwrap();
        assert_eq!(lp.invert(), InvertStatus::Success);

        // B = -A for this basis
        let b = [[-1.0, -2.0], [-3.0, -1.0]];
        let x_true = [2.0, -1.0];
        let mut rhs: Vec<f64> = (0..2).map(|i| b[i][0] * x_true[0] + b[i][1] * x_true[1]).collect();
        lp.ftran(&mut rhs).unwrap();
        assert_abs_diff_eq!(rhs[0], x_true[0], epsilon = 1e-12);
        assert_abs_diff_eq!(rhs[1], x_true[1], epsilon = 1e-12);

        let mut rhs: Vec<f64> = (0..2).map(|j| b[0][j] * x_true[0] + b[1][j] * x_true[1]).collect();
        lp.btran(&mut rhs).unwrap();
        assert_abs_diff_eq!(rhs[0], x_true[0], epsilon = 1e-12);
        assert_abs_diff_eq!(rhs[1], x_true[1], epsilon = 1e-12);
    }

    #[test]
    fn test_ftran_rejects_wrong_length() {
        let mut lp = two_by_two();
        assert_eq!(lp.invert(), InvertStatus::Success);
        assert!(lp.ftran(&mut [1.0]).is_err());
        assert!(lp.btran(&mut [1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_replace_basis_custom_order() {
        let mut lp = two_by_two();
        assert_eq!(lp.replace_basis(&[3, 2]).unwrap(), InvertStatus::Success);
        assert_eq!(lp.b_info(0).unwrap(), 3);
        assert_eq!(lp.col_b_ind(0).unwrap(), Some(1));
        assert!(lp.replace_basis(&[2, 2]).is_err());
        assert!(lp.replace_basis(&[0, 2]).is_err(), "row 0 is nonbasic");
    }

    #[test]
    fn test_mutation_drops_factorization() {
        let mut lp = two_by_two();
        assert_eq!(lp.invert(), InvertStatus::Success);
        lp.set_col_bnds(0, Bounds::Double(0.0, 5.0)).unwrap();
        assert!(!lp.is_basis_valid());
        assert!(matches!(lp.ftran(&mut [0.0, 0.0]), Err(LpError::BasisUnavailable { op: "ftran" })));
    }
}
