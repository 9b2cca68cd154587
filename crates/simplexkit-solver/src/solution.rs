use crate::error::{LpResult, ensure};
use crate::problem::{ColKind, Problem, VarData};

/// Primal status of the basic solution
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimalStatus {
    #[default]
    Undefined,
    Feasible,
    Infeasible,
    /// The problem has no primal feasible solution
    NoFeasible,
}

/// Dual status of the basic solution
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DualStatus {
    #[default]
    Undefined,
    Feasible,
    Infeasible,
    /// The problem has no dual feasible solution
    NoFeasible,
}

/// Generic status of the basic solution, combined from its primal and dual status
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Nothing is known about the solution
    Undefined,
    /// Primal and dual feasible
    Optimal,
    /// Primal feasible
    Feasible,
    /// Primal infeasible
    Infeasible,
    /// The problem has no feasible solution
    NoFeasible,
    /// Primal feasible, dual has no feasible solution
    Unbounded,
}

/// Status of the interior-point solution
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteriorStatus {
    #[default]
    Undefined,
    Optimal,
}

/// Status of the integer solution
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MipStatus {
    #[default]
    Undefined,
    Optimal,
    Feasible,
    NoFeasible,
}

/// Statuses of the solutions cached in a problem object. The values themselves
/// live with each row and column.
#[derive(Debug, Clone, Default)]
pub(crate) struct Solutions {
    pub(crate) p_stat: PrimalStatus,
    pub(crate) d_stat: DualStatus,
    pub(crate) ipt: InteriorStatus,
    pub(crate) mip: MipStatus,
}

impl Solutions {
    pub(crate) fn invalidate(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn invalidate_mip(&mut self) {
        self.mip = MipStatus::Undefined;
    }
}

/// Snapshot of the basic solution of a problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BasicSolution {
    /// Generic solution status
    pub status: SolutionStatus,
    pub primal_status: PrimalStatus,
    pub dual_status: DualStatus,
    /// Objective value, constant term included
    pub objective_value: f64,
    /// Primal values of the auxiliary variables
    pub row_prim: Vec<f64>,
    /// Dual values (reduced costs) of the auxiliary variables
    pub row_dual: Vec<f64>,
    /// Primal values of the structural variables
    pub col_prim: Vec<f64>,
    /// Dual values (reduced costs) of the structural variables
    pub col_dual: Vec<f64>,
}

impl Problem {
    /// Store a basic solution. Statuses of rows and columns are left alone.
    pub fn put_solution(
        &mut self,
        p_stat: PrimalStatus,
        d_stat: DualStatus,
        row_prim: &[f64],
        row_dual: &[f64],
        col_prim: &[f64],
        col_dual: &[f64],
    ) -> LpResult<()> {
        const OP: &str = "put_solution";
        let (m, n) = (self.rows.len(), self.cols.len());
        ensure!(row_prim.len() == m && row_dual.len() == m, OP, "row vectors must have length {}", m);
        ensure!(col_prim.len() == n && col_dual.len() == n, OP, "column vectors must have length {}", n);
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.prim = row_prim[i];
            row.dual = row_dual[i];
        }
        for (j, col) in self.cols.iter_mut().enumerate() {
            col.prim = col_prim[j];
            col.dual = col_dual[j];
        }
        self.sol.p_stat = p_stat;
        self.sol.d_stat = d_stat;
        Ok(())
    }

    /// Store an interior-point solution.
    pub fn put_ipt_soln(
        &mut self,
        status: InteriorStatus,
        row_prim: &[f64],
        row_dual: &[f64],
        col_prim: &[f64],
        col_dual: &[f64],
    ) -> LpResult<()> {
        const OP: &str = "put_ipt_soln";
        let (m, n) = (self.rows.len(), self.cols.len());
        ensure!(row_prim.len() == m && row_dual.len() == m, OP, "row vectors must have length {}", m);
        ensure!(col_prim.len() == n && col_dual.len() == n, OP, "column vectors must have length {}", n);
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.ipt_prim = row_prim[i];
            row.ipt_dual = row_dual[i];
        }
        for (j, col) in self.cols.iter_mut().enumerate() {
            col.ipt_prim = col_prim[j];
            col.ipt_dual = col_dual[j];
        }
        self.sol.ipt = status;
        Ok(())
    }

    /// Store an integer solution. A solution claimed optimal or feasible must be
    /// integral in every integer column.
    pub fn put_mip_soln(&mut self, status: MipStatus, row_val: &[f64], col_val: &[f64]) -> LpResult<()> {
        const OP: &str = "put_mip_soln";
        let (m, n) = (self.rows.len(), self.cols.len());
        ensure!(row_val.len() == m, OP, "row vector must have length {}", m);
        ensure!(col_val.len() == n, OP, "column vector must have length {}", n);
        if matches!(status, MipStatus::Optimal | MipStatus::Feasible) {
            for (j, col) in self.cols.iter().enumerate() {
                let x = col_val[j];
                ensure!(
                    col.kind != ColKind::Integer || x == x.floor(),
                    OP,
                    "col_val[{}] = {}; must be integral",
                    j,
                    x
                );
            }
        }
        for (row, &x) in self.rows.iter_mut().zip(row_val) {
            row.mip_val = x;
        }
        for (col, &x) in self.cols.iter_mut().zip(col_val) {
            col.mip_val = x;
        }
        self.sol.mip = status;
        Ok(())
    }

    pub fn prim_stat(&self) -> PrimalStatus {
        self.sol.p_stat
    }

    pub fn dual_stat(&self) -> DualStatus {
        self.sol.d_stat
    }

    /// Generic status of the basic solution
    pub fn status(&self) -> SolutionStatus {
        match self.sol.p_stat {
            PrimalStatus::Undefined => SolutionStatus::Undefined,
            PrimalStatus::Feasible => match self.sol.d_stat {
                DualStatus::Undefined | DualStatus::Infeasible => SolutionStatus::Feasible,
                DualStatus::Feasible => SolutionStatus::Optimal,
                DualStatus::NoFeasible => SolutionStatus::Unbounded,
            },
            PrimalStatus::Infeasible => SolutionStatus::Infeasible,
            PrimalStatus::NoFeasible => SolutionStatus::NoFeasible,
        }
    }

    fn objective_at(&self, value: impl Fn(&VarData) -> f64) -> f64 {
        self.c0 + self.cols.iter().map(|c| c.coef * value(c)).sum::<f64>()
    }

    /// Objective value of the basic solution
    pub fn obj_val(&self) -> f64 {
        self.objective_at(|c| c.prim)
    }

    pub fn row_prim(&self, i: usize) -> LpResult<f64> {
        self.check_row("row_prim", i)?;
        Ok(self.rows[i].prim)
    }

    pub fn row_dual(&self, i: usize) -> LpResult<f64> {
        self.check_row("row_dual", i)?;
        Ok(self.rows[i].dual)
    }

    pub fn col_prim(&self, j: usize) -> LpResult<f64> {
        self.check_col("col_prim", j)?;
        Ok(self.cols[j].prim)
    }

    pub fn col_dual(&self, j: usize) -> LpResult<f64> {
        self.check_col("col_dual", j)?;
        Ok(self.cols[j].dual)
    }

    /// Copy of the cached basic solution
    pub fn basic_solution(&self) -> BasicSolution {
        BasicSolution {
            status: self.status(),
            primal_status: self.sol.p_stat,
            dual_status: self.sol.d_stat,
            objective_value: self.obj_val(),
            row_prim: self.rows.iter().map(|r| r.prim).collect(),
            row_dual: self.rows.iter().map(|r| r.dual).collect(),
            col_prim: self.cols.iter().map(|c| c.prim).collect(),
            col_dual: self.cols.iter().map(|c| c.dual).collect(),
        }
    }

    pub fn ipt_status(&self) -> InteriorStatus {
        self.sol.ipt
    }

    pub fn ipt_obj_val(&self) -> f64 {
        self.objective_at(|c| c.ipt_prim)
    }

    pub fn ipt_row_prim(&self, i: usize) -> LpResult<f64> {
        self.check_row("ipt_row_prim", i)?;
        Ok(self.rows[i].ipt_prim)
    }

    pub fn ipt_row_dual(&self, i: usize) -> LpResult<f64> {
        self.check_row("ipt_row_dual", i)?;
        Ok(self.rows[i].ipt_dual)
    }

    pub fn ipt_col_prim(&self, j: usize) -> LpResult<f64> {
        self.check_col("ipt_col_prim", j)?;
        Ok(self.cols[j].ipt_prim)
    }

    pub fn ipt_col_dual(&self, j: usize) -> LpResult<f64> {
        self.check_col("ipt_col_dual", j)?;
        Ok(self.cols[j].ipt_dual)
    }

    pub fn mip_status(&self) -> MipStatus {
        self.sol.mip
    }

    pub fn mip_obj_val(&self) -> f64 {
        self.objective_at(|c| c.mip_val)
    }

    pub fn mip_row_val(&self, i: usize) -> LpResult<f64> {
        self.check_row("mip_row_val", i)?;
        Ok(self.rows[i].mip_val)
    }

    pub fn mip_col_val(&self, j: usize) -> LpResult<f64> {
        self.check_col("mip_col_val", j)?;
        Ok(self.cols[j].mip_val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Bounds, Direction};

    fn problem() -> Problem {
        let mut lp = Problem::new();
        lp.add_rows(1).unwrap();
        lp.add_cols(2).unwrap();
        lp.set_obj_coef(0, 2.0).unwrap();
        lp.set_obj_coef(1, -1.0).unwrap();
        lp.set_obj_const(10.0);
        lp
    }

    #[test]
    fn test_status_combines_primal_and_dual() {
        let mut lp = problem();
        assert_eq!(lp.status(), SolutionStatus::Undefined);

        let cases = [
            (PrimalStatus::Feasible, DualStatus::Feasible, SolutionStatus::Optimal),
            (PrimalStatus::Feasible, DualStatus::Infeasible, SolutionStatus::Feasible),
            (PrimalStatus::Feasible, DualStatus::Undefined, SolutionStatus::Feasible),
            (PrimalStatus::Feasible, DualStatus::NoFeasible, SolutionStatus::Unbounded),
            (PrimalStatus::Infeasible, DualStatus::Feasible, SolutionStatus::Infeasible),
            (PrimalStatus::NoFeasible, DualStatus::Undefined, SolutionStatus::NoFeasible),
        ];
        for (p, d, expected) in cases {
            lp.put_solution(p, d, &[0.0], &[0.0], &[0.0, 0.0], &[0.0, 0.0]).unwrap();
            assert_eq!(lp.status(), expected, "p = {:?}, d = {:?}", p, d);
        }
    }

    #[test]
    fn test_obj_val_includes_constant() {
        let mut lp = problem();
        lp.put_solution(
            PrimalStatus::Feasible,
            DualStatus::Feasible,
            &[1.0],
            &[0.0],
            &[3.0, 4.0],
            &[0.0, 0.0],
        )
        .unwrap();
        assert_eq!(lp.obj_val(), 10.0 + 6.0 - 4.0);
        let snapshot = lp.basic_solution();
        assert_eq!(snapshot.status, SolutionStatus::Optimal);
        assert_eq!(snapshot.col_prim, vec![3.0, 4.0]);
    }

    #[test]
    fn test_mutation_invalidates_solution() {
        let mut lp = problem();
        lp.put_solution(PrimalStatus::Feasible, DualStatus::Feasible, &[0.0], &[0.0], &[0.0, 0.0], &[0.0, 0.0])
            .unwrap();
        lp.set_obj_dir(Direction::Maximize);
        assert_eq!(lp.prim_stat(), PrimalStatus::Undefined);

        lp.put_solution(PrimalStatus::Feasible, DualStatus::Feasible, &[0.0], &[0.0], &[0.0, 0.0], &[0.0, 0.0])
            .unwrap();
        lp.set_col_bnds(0, Bounds::Lower(0.0)).unwrap();
        assert_eq!(lp.status(), SolutionStatus::Undefined);
    }

    #[test]
    fn test_put_solution_checks_lengths() {
        let mut lp = problem();
        let err = lp
            .put_solution(PrimalStatus::Feasible, DualStatus::Feasible, &[], &[0.0], &[0.0, 0.0], &[0.0, 0.0])
            .unwrap_err();
        assert_eq!(err.op(), "put_solution");
    }

    #[test]
    fn test_mip_solution_must_be_integral() {
        let mut lp = problem();
        lp.set_col_kind(0, ColKind::Integer).unwrap();
        assert!(lp.put_mip_soln(MipStatus::Feasible, &[0.0], &[1.5, 0.25]).is_err());
        assert_eq!(lp.mip_status(), MipStatus::Undefined);

        // column 1 is continuous
        lp.put_mip_soln(MipStatus::Optimal, &[0.0], &[2.0, 0.25]).unwrap();
        assert_eq!(lp.mip_status(), MipStatus::Optimal);
        assert_eq!(lp.mip_obj_val(), 10.0 + 4.0 - 0.25);

        lp.set_col_kind(1, ColKind::Integer).unwrap();
        assert_eq!(lp.mip_status(), MipStatus::Undefined);
    }

    #[test]
    fn test_interior_point_solution() {
        let mut lp = problem();
        lp.put_ipt_soln(InteriorStatus::Optimal, &[1.0], &[0.5], &[1.0, 1.0], &[0.0, 0.0])
            .unwrap();
        assert_eq!(lp.ipt_status(), InteriorStatus::Optimal);
        assert_eq!(lp.ipt_row_dual(0).unwrap(), 0.5);
        assert_eq!(lp.ipt_obj_val(), 11.0);
    }
}
