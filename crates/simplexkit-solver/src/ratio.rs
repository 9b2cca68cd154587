//! Minimum-ratio pivot selection for primal and dual simplex steps.
//!
//! Both tests read the stored basic solution and never modify the problem.
//! Coefficients smaller than `tol * (1 + max|coef|)` are ignored, negative
//! ratios (from slightly infeasible values) count as zero, and among equal
//! ratios the entry with the largest coefficient magnitude wins.

use crate::error::{LpResult, ensure};
use crate::problem::{Bounds, Problem, VarStatus};
use crate::solution::{DualStatus, PrimalStatus};
use crate::sparse::SparseVec;

/// Running minimum of the ratio test
#[derive(Debug, Default)]
struct Choice {
    best: Option<(usize, f64, f64)>,
}

impl Choice {
    fn offer(&mut self, k: usize, ratio: f64, alfa: f64) {
        let ratio = ratio.max(0.0);
        let better = match self.best {
            None => true,
            Some((_, teta, big)) => teta > ratio || (teta == ratio && big < alfa.abs()),
        };
        if better {
            self.best = Some((k, ratio, alfa.abs()));
        }
    }

    fn winner(&self) -> Option<usize> {
        self.best.map(|(k, _, _)| k)
    }
}

fn check_args(op: &'static str, how: i32, tol: f64) -> LpResult<()> {
    ensure!(how == 1 || how == -1, op, "how = {}; invalid parameter", how);
    ensure!(0.0 < tol && tol < 1.0, op, "tol = {}; invalid tolerance", tol);
    Ok(())
}

fn tolerance(v: &SparseVec, tol: f64) -> f64 {
    let big = v.val.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    tol * (1.0 + big)
}

impl Problem {
    /// Choose the basic variable that leaves the basis first when a variable
    /// `y` with influence column `col` (keyed by basic variable id) increases
    /// (`how = 1`) or decreases (`how = -1`). `Ok(None)` means `y` can change
    /// without limit.
    pub fn prim_ratio_test(&self, col: &SparseVec, how: i32, tol: f64) -> LpResult<Option<usize>> {
        const OP: &str = "prim_ratio_test";
        self.factor(OP)?;
        ensure!(self.prim_stat() == PrimalStatus::Feasible, OP, "current basic solution is not primal feasible");
        check_args(OP, how, tol)?;
        col.check(OP)?;
        let eps = tolerance(col, tol);
        let mut choice = Choice::default();
        for (t, (k, val)) in col.iter().enumerate() {
            ensure!(k < self.num_rows() + self.num_cols(), OP, "ind[{}] = {}; variable number out of range", t, k);
            let var = self.var(k);
            ensure!(var.stat.is_basic(), OP, "ind[{}] = {}; non-basic variable not allowed", t, k);
            let alfa = how as f64 * val;
            let bbar = var.prim;
            let to_lower = |lb: f64| (alfa <= -eps).then(|| (lb - bbar) / alfa);
            let to_upper = |ub: f64| (alfa >= eps).then(|| (ub - bbar) / alfa);
            let ratio = match var.bounds {
                Bounds::Free => None,
                Bounds::Lower(lb) => to_lower(lb),
                Bounds::Upper(ub) => to_upper(ub),
                Bounds::Double(lb, _) if alfa < 0.0 => to_lower(lb),
                Bounds::Double(_, ub) => to_upper(ub),
                Bounds::Fixed(_) => (alfa.abs() >= eps).then_some(0.0),
            };
            if let Some(ratio) = ratio {
                choice.offer(k, ratio, alfa);
            }
        }
        Ok(choice.winner())
    }

    /// Choose the nonbasic variable that enters the basis when a basic
    /// variable with tableau row `row` (keyed by nonbasic variable id) leaves
    /// it increasing (`how = 1`) or decreasing (`how = -1`), keeping the
    /// reduced costs dual feasible. `Ok(None)` means no such variable exists.
    pub fn dual_ratio_test(&self, row: &SparseVec, how: i32, tol: f64) -> LpResult<Option<usize>> {
        const OP: &str = "dual_ratio_test";
        self.factor(OP)?;
        ensure!(self.dual_stat() == DualStatus::Feasible, OP, "current basic solution is not dual feasible");
        check_args(OP, how, tol)?;
        row.check(OP)?;
        let dir = self.dir.sign();
        let eps = tolerance(row, tol);
        let mut choice = Choice::default();
        for (t, (k, val)) in row.iter().enumerate() {
            ensure!(k < self.num_rows() + self.num_cols(), OP, "ind[{}] = {}; variable number out of range", t, k);
            let var = self.var(k);
            ensure!(!var.stat.is_basic(), OP, "ind[{}] = {}; basic variable not allowed", t, k);
            let alfa = how as f64 * val;
            let ratio = match var.stat {
                VarStatus::NonbasicLower => (alfa >= eps).then(|| dir * var.dual / alfa),
                VarStatus::NonbasicUpper => (alfa <= -eps).then(|| dir * var.dual / alfa),
                VarStatus::NonbasicFree => (alfa.abs() >= eps).then_some(0.0),
                VarStatus::NonbasicFixed | VarStatus::Basic => None,
            };
            if let Some(ratio) = ratio {
                choice.offer(k, ratio, alfa);
            }
        }
        Ok(choice.winner())
    }
}
