use log::debug;

use crate::basis::InvertStatus;
use crate::error::{LpError, LpResult, ensure};
use crate::problem::{Bounds, Direction, Problem, VarStatus};
use crate::solution::{DualStatus, PrimalStatus};
use crate::sparse::SparseVec;

/// Outcome of `Problem::warm_up`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmUpStatus {
    /// The basic solution was computed and stored
    Ok,
    /// The problem has no rows or no columns
    Empty,
    /// The statuses do not define a basis
    InvalidBasis,
    /// The basis matrix is singular or ill-conditioned
    Singular,
}

/// Sense of an inequality on a linear form
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Greater than or equal (>=)
    Ge,
    /// Less than or equal (<=)
    Le,
}

/// Value of a nonbasic variable implied by its status.
fn nonbasic_value(bounds: Bounds, stat: VarStatus) -> f64 {
    match stat {
        VarStatus::NonbasicLower | VarStatus::NonbasicFixed => bounds.lb(),
        VarStatus::NonbasicUpper => bounds.ub(),
        VarStatus::NonbasicFree | VarStatus::Basic => 0.0,
    }
}

impl Problem {
    /// Primal values `(row_prim, col_prim)` of the current basic solution.
    pub fn eval_primal(&self) -> LpResult<(Vec<f64>, Vec<f64>)> {
        self.factor("eval_primal")?;
        let (m, n) = (self.num_rows(), self.num_cols());
        let mut prim = vec![0.0; m + n];
        // right-hand side -N*xN of B*xB = -N*xN
        let mut rhs = vec![0.0; m];
        for k in 0..m + n {
            let var = self.var(k);
            if var.stat.is_basic() {
                continue;
            }
            let xn = nonbasic_value(var.bounds, var.stat);
            prim[k] = xn;
            if xn == 0.0 {
                continue;
            }
            if k < m {
                rhs[k] -= xn;
            } else {
                for (i, a) in self.matrix.col(k - m) {
                    rhs[i] += a * xn;
                }
            }
        }
        self.ftran(&mut rhs)?;
        for (&k, &x) in self.basis.head.iter().zip(&rhs) {
            prim[k] = x;
        }
        let col_prim = prim.split_off(m);
        Ok((prim, col_prim))
    }

    /// Dual values (reduced costs) `(row_dual, col_dual)` of the current basic
    /// solution. Basic variables get zero.
    pub fn eval_dual(&self) -> LpResult<(Vec<f64>, Vec<f64>)> {
        self.factor("eval_dual")?;
        let (m, n) = (self.num_rows(), self.num_cols());
        let mut pi: Vec<f64> = self
            .basis
            .head
            .iter()
            .map(|&k| if k < m { 0.0 } else { self.cols[k - m].coef })
            .collect();
        self.btran(&mut pi)?;
        let mut row_dual = vec![0.0; m];
        let mut col_dual = vec![0.0; n];
        for (i, d) in row_dual.iter_mut().enumerate() {
            if !self.rows[i].stat.is_basic() {
                *d = -pi[i];
            }
        }
        for (j, d) in col_dual.iter_mut().enumerate() {
            let col = &self.cols[j];
            if !col.stat.is_basic() {
                *d = col.coef + self.matrix.col(j).map(|(i, a)| a * pi[i]).sum::<f64>();
            }
        }
        Ok((row_dual, col_dual))
    }

    /// Make sure a factorized basis exists, then compute, classify and store
    /// the basic solution.
    pub fn warm_up(&mut self) -> LpResult<WarmUpStatus> {
        let (m, n) = (self.num_rows(), self.num_cols());
        if !self.is_basis_valid() {
            if m == 0 || n == 0 {
                return Ok(WarmUpStatus::Empty);
            }
            match self.invert() {
                InvertStatus::Success => {}
                InvertStatus::Singular | InvertStatus::IllConditioned => return Ok(WarmUpStatus::Singular),
                InvertStatus::StructuralError => return Ok(WarmUpStatus::InvalidBasis),
            }
        }
        let (row_prim, col_prim) = self.eval_primal()?;
        let tol_bnd = 3.0 * self.params.tol_bnd;
        let p_stat = if row_prim.iter().chain(&col_prim).enumerate().any(|(k, &prim)| {
            let b = self.var(k).bounds;
            (b.has_lower() && prim < b.lb() - tol_bnd * (1.0 + b.lb().abs()))
                || (b.has_upper() && prim > b.ub() + tol_bnd * (1.0 + b.ub().abs()))
        }) {
            PrimalStatus::Infeasible
        } else {
            PrimalStatus::Feasible
        };

        let (row_dual, col_dual) = self.eval_dual()?;
        let tol_dj = 3.0 * self.params.tol_dj;
        let dir = self.dir.sign();
        let d_stat = if row_dual.iter().chain(&col_dual).enumerate().any(|(k, &dual)| {
            let stat = self.var(k).stat;
            let below = matches!(stat, VarStatus::Basic | VarStatus::NonbasicLower | VarStatus::NonbasicFree);
            let above = matches!(stat, VarStatus::Basic | VarStatus::NonbasicUpper | VarStatus::NonbasicFree);
            (below && dir * dual < -tol_dj) || (above && dir * dual > tol_dj)
        }) {
            DualStatus::Infeasible
        } else {
            DualStatus::Feasible
        };

        debug!("warm_up: primal {:?}, dual {:?}", p_stat, d_stat);
        self.put_solution(p_stat, d_stat, &row_prim, &row_dual, &col_prim, &col_dual)?;
        Ok(WarmUpStatus::Ok)
    }

    /// Row of the simplex tableau for basic variable `k`: the coefficients
    /// expressing `x[k]` through the nonbasic variables.
    pub fn eval_tab_row(&self, k: usize) -> LpResult<SparseVec> {
        const OP: &str = "eval_tab_row";
        self.factor(OP)?;
        self.check_var(OP, k)?;
        let m = self.num_rows();
        let i = match self.basis.pos[k] {
            Some(i) => i,
            None => return Err(LpError::invalid(OP, format!("k = {k}; variable must be basic"))),
        };
        let mut rho = vec![0.0; m];
        rho[i] = 1.0;
        self.btran(&mut rho)?;
        Ok(self.nonbasic_row(&rho, |_| 0.0))
    }

    /// Coefficients of the nonbasic variables in `c(x) - rho' * (x_R - A*x_S)`,
    /// where `c` gives the structural part of the given form.
    fn nonbasic_row(&self, rho: &[f64], structural: impl Fn(usize) -> f64) -> SparseVec {
        let (m, n) = (self.num_rows(), self.num_cols());
        let mut out = SparseVec::with_capacity(n);
        for t in 0..m + n {
            if self.var(t).stat.is_basic() {
                continue;
            }
            let alfa = if t < m {
                -rho[t]
            } else {
                let j = t - m;
                structural(j) + self.matrix.col(j).map(|(i, a)| rho[i] * a).sum::<f64>()
            };
            if alfa != 0.0 {
                out.push(t, alfa);
            }
        }
        out
    }

    /// Column of the simplex tableau for nonbasic variable `k`: how every basic
    /// variable changes per unit increase of `x[k]`. Entries are keyed by
    /// basic variable id.
    pub fn eval_tab_col(&self, k: usize) -> LpResult<SparseVec> {
        const OP: &str = "eval_tab_col";
        self.factor(OP)?;
        self.check_var(OP, k)?;
        let m = self.num_rows();
        ensure!(self.basis.pos[k].is_none(), OP, "k = {}; variable must be non-basic", k);
        let mut col = vec![0.0; m];
        if k < m {
            col[k] = -1.0;
        } else {
            for (i, a) in self.matrix.col(k - m) {
                col[i] = a;
            }
        }
        self.ftran(&mut col)?;
        Ok(self.keyed_by_basis(&col))
    }

    fn keyed_by_basis(&self, x: &[f64]) -> SparseVec {
        SparseVec::from_pairs(
            self.basis
                .head
                .iter()
                .zip(x)
                .filter(|&(_, &v)| v != 0.0)
                .map(|(&k, &v)| (k, v)),
        )
    }

    /// Express the linear form `sum a[j] * x[m+j]` over structural variables
    /// through the nonbasic variables only.
    pub fn transform_row(&self, row: &SparseVec) -> LpResult<SparseVec> {
        const OP: &str = "transform_row";
        self.factor(OP)?;
        let (m, n) = (self.num_rows(), self.num_cols());
        let a = self.unpack(OP, row, n, "row", "column")?;
        let mut rho: Vec<f64> = self
            .basis
            .head
            .iter()
            .map(|&k| if k < m { 0.0 } else { a[k - m] })
            .collect();
        self.btran(&mut rho)?;
        Ok(self.nonbasic_row(&rho, |j| a[j]))
    }

    /// Solve `B*alfa = a` for an explicit column `a` over the rows; entries of
    /// the result are keyed by basic variable id.
    pub fn transform_col(&self, col: &SparseVec) -> LpResult<SparseVec> {
        const OP: &str = "transform_col";
        self.factor(OP)?;
        let m = self.num_rows();
        let mut a = self.unpack(OP, col, m, "column", "row")?;
        self.ftran(&mut a)?;
        Ok(self.keyed_by_basis(&a))
    }

    /// Scatter an explicit row or column into a dense vector of length `dim`.
    fn unpack(&self, op: &'static str, v: &SparseVec, dim: usize, shape: &str, what: &str) -> LpResult<Vec<f64>> {
        v.check(op)?;
        ensure!(v.len() <= dim, op, "len = {}; invalid {} length", v.len(), shape);
        let mut dense = vec![0.0; dim];
        for (t, (k, x)) in v.iter().enumerate() {
            ensure!(k < dim, op, "ind[{}] = {}; {} index out of range", t, k, what);
            ensure!(x != 0.0, op, "val[{}] = 0; zero coefficient not allowed", t);
            ensure!(dense[k] == 0.0, op, "ind[{}] = {}; duplicate {} indices not allowed", t, k, what);
            dense[k] = x;
        }
        Ok(dense)
    }

    /// Value of `sum a[j] * x[m+j]` at the current basic solution.
    pub fn eval_row(&self, row: &SparseVec) -> LpResult<f64> {
        const OP: &str = "eval_row";
        row.check(OP)?;
        let n = self.num_cols();
        let mut sum = 0.0;
        for (j, a) in row.iter() {
            ensure!(j < n, OP, "j = {}; column number out of range", j);
            sum += a * self.cols[j].prim;
        }
        Ok(sum)
    }

    /// Lower estimate of the objective change one dual simplex step would
    /// cause if the violated inequality `row op rhs` were added to the
    /// problem. The current basic solution must be dual feasible. Returns
    /// `f64::MAX` (`-f64::MAX` when maximizing) if no adjacent dual feasible
    /// basis exists.
    pub fn eval_degrad(&self, row: &SparseVec, op: ConstraintOp, rhs: f64) -> LpResult<f64> {
        const OP: &str = "eval_degrad";
        ensure!(self.dual_stat() == DualStatus::Feasible, OP, "LP basis is not dual feasible");
        row.check(OP)?;
        ensure!(row.len() <= self.num_cols(), OP, "len = {}; invalid row length", row.len());
        let y = self.eval_row(row)?;
        let violated = match op {
            ConstraintOp::Ge => y < rhs,
            ConstraintOp::Le => y > rhs,
        };
        ensure!(violated, OP, "y = {}, rhs = {}; constraint is not violated", y, rhs);

        let alfa = self.transform_row(row)?;
        let how = match op {
            ConstraintOp::Ge => 1,
            ConstraintOp::Le => -1,
        };
        let Some(q) = self.dual_ratio_test(&alfa, how, 1e-7)? else {
            return Ok(match self.dir {
                Direction::Minimize => f64::MAX,
                Direction::Maximize => -f64::MAX,
            });
        };
        let alfa_q = alfa.get(q).unwrap_or(f64::NAN);
        let delta = (rhs - y) / alfa_q * self.var(q).dual;
        Ok(match self.dir {
            Direction::Minimize => delta.max(0.0),
            Direction::Maximize => delta.min(0.0),
        })
    }
}
