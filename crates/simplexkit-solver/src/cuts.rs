use thiserror::Error;

use crate::error::{LpError, LpResult, ensure};
use crate::problem::{ColKind, Problem, VarStatus};
use crate::sparse::SparseVec;

/// Why no Gomory cut was produced
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CutError {
    #[error("tableau row contains a free non-basic variable")]
    FreeNonbasic,
    #[error("basic variable is too close to an integer value")]
    NearIntegerRow,
    #[error(transparent)]
    Invalid(#[from] LpError),
}

impl CutError {
    /// True for contract violations, false for the two ordinary "no cut" outcomes.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CutError::Invalid(_))
    }
}

/// Cutting plane `sum coefs[j] * x[m+j] >= rhs` over structural variables
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GomoryCut {
    /// Coefficients keyed by column number
    pub coefs: SparseVec,
    /// Right-hand side
    pub rhs: f64,
}

/// Drop zero entries and entries with magnitude below `eps * max(1, max|v|)`.
/// Returns the number of remaining entries.
pub fn remove_tiny(v: &mut SparseVec, eps: f64) -> LpResult<usize> {
    v.check("remove_tiny")?;
    ensure!(eps >= 0.0, "remove_tiny", "eps = {}; invalid threshold", eps);
    let big = v.val.iter().fold(1.0_f64, |acc, x| acc.max(x.abs()));
    let kept: Vec<(usize, f64)> = v.iter().filter(|&(_, x)| x != 0.0 && x.abs() >= eps * big).collect();
    v.clear();
    for (k, x) in kept {
        v.push(k, x);
    }
    Ok(v.len())
}

/// f0 outside this band makes the cut numerically unreliable
const MIN_FRACTION: f64 = 0.00001;
const MAX_FRACTION: f64 = 0.99999;

impl Problem {
    /// Rewrite a linear form over all variables (ids `0..m+n`) as a form over
    /// structural variables only, substituting each auxiliary variable by its
    /// row. Duplicate ids are summed. The result is keyed by column number.
    pub fn reduce_form(&self, form: &SparseVec) -> LpResult<SparseVec> {
        const OP: &str = "reduce_form";
        form.check(OP)?;
        let (m, n) = (self.num_rows(), self.num_cols());
        let mut work = vec![0.0; m + n];
        for (t, (k, v)) in form.iter().enumerate() {
            ensure!(k < m + n, OP, "ind[{}] = {}; ordinal number out of range", t, k);
            work[k] += v;
        }
        for i in 0..m {
            if work[i] == 0.0 {
                continue;
            }
            for (j, a) in self.matrix.row(i) {
                work[m + j] += work[i] * a;
            }
        }
        Ok(SparseVec::from_pairs(
            (0..n).filter(|&j| work[m + j] != 0.0).map(|j| (j, work[m + j])),
        ))
    }

    /// Gomory mixed integer cut from the tableau row `row` of a basic variable
    /// (keyed by nonbasic variable id, as returned by `eval_tab_row`).
    ///
    /// The current value of that basic variable must be fractional. The cut
    /// is expressed through structural variables only.
    pub fn gomory_cut(&self, row: &SparseVec) -> Result<GomoryCut, CutError> {
        const OP: &str = "gomory_cut";
        let total = self.num_rows() + self.num_cols();
        let m = self.num_rows();
        row.check(OP)?;

        // y + sum alfa'[j] * xN'[j] = beta with every xN'[j] >= 0, where
        // xN[j] = bound + side * xN'[j]
        let mut shifted = Vec::with_capacity(row.len());
        let mut beta = 0.0;
        for (t, (k, alfa)) in row.iter().enumerate() {
            if k >= total {
                return Err(LpError::invalid(OP, format!("ind[{t}] = {k}; variable number out of range")).into());
            }
            let var = self.var(k);
            let (lb, ub) = (var.bounds.lb(), var.bounds.ub());
            match var.stat {
                VarStatus::Basic => {
                    return Err(LpError::invalid(OP, format!("ind[{t}] = {k}; variable must be non-basic")).into());
                }
                VarStatus::NonbasicFree => return Err(CutError::FreeNonbasic),
                VarStatus::NonbasicLower => {
                    beta += alfa * lb;
                    shifted.push((k, -alfa, 1.0, lb));
                }
                VarStatus::NonbasicUpper => {
                    beta += alfa * ub;
                    shifted.push((k, alfa, -1.0, ub));
                }
                VarStatus::NonbasicFixed => beta += alfa * lb,
            }
        }

        let f0 = beta - beta.floor();
        if !(MIN_FRACTION..=MAX_FRACTION).contains(&f0) {
            return Err(CutError::NearIntegerRow);
        }
        let ratio = f0 / (1.0 - f0);

        // sum a'[j] * xN'[j] >= f0, mapped back onto xN[j]
        let mut form = SparseVec::with_capacity(shifted.len());
        let mut b = f0;
        for (k, alfa, side, bound) in shifted {
            if alfa == 0.0 {
                continue;
            }
            let integer = k >= m && self.cols[k - m].kind == ColKind::Integer;
            let a = if integer {
                let fj = alfa - alfa.floor();
                if fj <= f0 { fj } else { ratio * (1.0 - fj) }
            } else if alfa > 0.0 {
                alfa
            } else {
                -ratio * alfa
            };
            if a == 0.0 {
                continue;
            }
            form.push(k, side * a);
            b += side * a * bound;
        }
        let coefs = self.reduce_form(&form)?;
        Ok(GomoryCut { coefs, rhs: b })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Bounds;
    use approx::assert_abs_diff_eq;

    /// One free basic row r = x0 + 2 x1 over an integer x0 in [0, 10] at its
    /// lower bound and a continuous x1 <= 1.25 at its upper bound.
    fn problem() -> Problem {
        let mut lp = Problem::new();
        lp.add_rows(1).unwrap();
        lp.add_cols(2).unwrap();
        lp.set_mat_row(0, &[0, 1], &[1.0, 2.0]).unwrap();
        lp.set_col_kind(0, ColKind::Integer).unwrap();
        lp.set_col_bnds(0, Bounds::Double(0.0, 10.0)).unwrap();
        lp.set_col_bnds(1, Bounds::Upper(1.25)).unwrap();
        lp
    }

    #[test]
    fn test_gomory_cut_coefficients() {
        let lp = problem();
        assert_eq!(lp.col_stat(0).unwrap(), VarStatus::NonbasicLower);
        assert_eq!(lp.col_stat(1).unwrap(), VarStatus::NonbasicUpper);

        // y = -0.3 x0 - 2 x1, so beta = -2.5 and f0 = 0.5
        let row = SparseVec::from_pairs([(1, -0.3), (2, -2.0)]);
        let cut = lp.gomory_cut(&row).unwrap();

        // integer x0: alfa' = 0.3 <= f0 keeps 0.3; continuous x1: alfa' = -2 gives 2
        assert_abs_diff_eq!(cut.coefs.get(0).unwrap(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(cut.coefs.get(1).unwrap(), -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cut.rhs, 0.5 - 2.0 * 1.25, epsilon = 1e-12);

        // the current vertex (x0 = 0, x1 = 1.25) violates the cut
        let lhs = 0.3 * 0.0 - 2.0 * 1.25;
        assert!(lhs < cut.rhs);
    }

    #[test]
    fn test_gomory_cut_near_integer_and_free() {
        let mut lp = problem();
        // beta = -4 * 1.25 = -5 has no fractional part
        let row = SparseVec::from_pairs([(2, -4.0)]);
        assert_eq!(lp.gomory_cut(&row).unwrap_err(), CutError::NearIntegerRow);

        lp.set_col_bnds(1, Bounds::Free).unwrap();
        let err = lp.gomory_cut(&SparseVec::from_pairs([(1, 0.5), (2, 1.0)])).unwrap_err();
        assert_eq!(err, CutError::FreeNonbasic);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_gomory_cut_rejects_basic_entry() {
        let lp = problem();
        let err = lp.gomory_cut(&SparseVec::from_pairs([(0, 1.0)])).unwrap_err();
        assert!(err.is_fatal(), "{}", err);
        assert!(lp.gomory_cut(&SparseVec::from_pairs([(7, 1.0)])).unwrap_err().is_fatal());
    }

    #[test]
    fn test_reduce_form_substitutes_rows() {
        let lp = problem();
        // 3 r + x1 + 0.5 x0, with r = x0 + 2 x1
        let form = SparseVec::from_pairs([(0, 3.0), (2, 1.0), (1, 0.5)]);
        let reduced = lp.reduce_form(&form).unwrap();
        assert_eq!(reduced.get(0), Some(3.5));
        assert_eq!(reduced.get(1), Some(7.0));
        assert_eq!(reduced.len(), 2);

        // duplicates are summed and cancellations dropped
        let form = SparseVec::from_pairs([(1, 1.0), (1, -1.0)]);
        assert!(lp.reduce_form(&form).unwrap().is_empty());
        assert!(lp.reduce_form(&SparseVec::from_pairs([(3, 1.0)])).is_err());
    }

    #[test]
    fn test_remove_tiny() {
        let mut v = SparseVec::from_pairs([(0, 1e-12), (1, 0.0), (2, 100.0), (3, -5e-6)]);
        assert_eq!(remove_tiny(&mut v, 1e-8).unwrap(), 2);
        assert_eq!(v.ind, vec![2, 3]);
        assert!(remove_tiny(&mut v, -1.0).is_err());
    }

    #[test]
    fn test_ragged_forms_are_rejected() {
        let lp = problem();
        let ragged = SparseVec { ind: vec![0, 2], val: vec![3.0] };
        let err = lp.reduce_form(&ragged).unwrap_err();
        assert_eq!(err.op(), "reduce_form");

        let err = lp.gomory_cut(&SparseVec { ind: vec![1, 2], val: vec![-0.3] }).unwrap_err();
        assert!(err.is_fatal(), "{}", err);

        let mut v = SparseVec { ind: vec![0, 1, 2], val: vec![5.0] };
        assert!(remove_tiny(&mut v, 1e-8).is_err());
        assert_eq!(v.ind, vec![0, 1, 2], "rejected vector must be left untouched");
    }
}
