use rustc_hash::FxHashMap;

use crate::basis::Basis;
use crate::error::{LpError, LpResult, ensure};
use crate::params::Params;
use crate::solution::Solutions;
use crate::sparse::{MatrixStore, SparseVec};

/// Longest symbolic name accepted for the problem, a row or a column
pub const MAX_NAME_LEN: usize = 255;

/// Optimization direction
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl Direction {
    /// `+1` for minimization, `-1` for maximization
    pub fn sign(self) -> f64 {
        match self {
            Direction::Minimize => 1.0,
            Direction::Maximize => -1.0,
        }
    }
}

/// Bounds of a row or column variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Bounds {
    /// -inf < x < +inf
    #[default]
    Free,
    /// lb <= x < +inf
    Lower(f64),
    /// -inf < x <= ub
    Upper(f64),
    /// lb <= x <= ub
    Double(f64, f64),
    /// x = value
    Fixed(f64),
}

impl Bounds {
    /// Lower bound, or 0 when there is none
    pub fn lb(&self) -> f64 {
        match *self {
            Bounds::Lower(lb) | Bounds::Double(lb, _) | Bounds::Fixed(lb) => lb,
            Bounds::Free | Bounds::Upper(_) => 0.0,
        }
    }

    /// Upper bound, or 0 when there is none
    pub fn ub(&self) -> f64 {
        match *self {
            Bounds::Upper(ub) | Bounds::Double(_, ub) | Bounds::Fixed(ub) => ub,
            Bounds::Free | Bounds::Lower(_) => 0.0,
        }
    }

    pub fn has_lower(&self) -> bool {
        matches!(self, Bounds::Lower(_) | Bounds::Double(..) | Bounds::Fixed(_))
    }

    pub fn has_upper(&self) -> bool {
        matches!(self, Bounds::Upper(_) | Bounds::Double(..) | Bounds::Fixed(_))
    }

    /// Status a nonbasic variable takes after its bounds change to `self`.
    fn status_after_change(&self, current: VarStatus) -> VarStatus {
        match *self {
            Bounds::Free => VarStatus::NonbasicFree,
            Bounds::Lower(_) => VarStatus::NonbasicLower,
            Bounds::Upper(_) => VarStatus::NonbasicUpper,
            Bounds::Double(lb, ub) => match current {
                VarStatus::NonbasicLower | VarStatus::NonbasicUpper => current,
                _ if lb.abs() <= ub.abs() => VarStatus::NonbasicLower,
                _ => VarStatus::NonbasicUpper,
            },
            Bounds::Fixed(_) => VarStatus::NonbasicFixed,
        }
    }

    /// Nonbasic status these bounds allow for a requested nonbasic status.
    fn coerce_status(&self, requested: VarStatus) -> VarStatus {
        match *self {
            Bounds::Free => VarStatus::NonbasicFree,
            Bounds::Lower(_) => VarStatus::NonbasicLower,
            Bounds::Upper(_) => VarStatus::NonbasicUpper,
            Bounds::Double(..) if requested == VarStatus::NonbasicUpper => VarStatus::NonbasicUpper,
            Bounds::Double(..) => VarStatus::NonbasicLower,
            Bounds::Fixed(_) => VarStatus::NonbasicFixed,
        }
    }

    fn check(&self, op: &'static str, what: &str) -> LpResult<()> {
        let finite = match *self {
            Bounds::Free => true,
            Bounds::Lower(v) | Bounds::Upper(v) | Bounds::Fixed(v) => v.is_finite(),
            Bounds::Double(lb, ub) => lb.is_finite() && ub.is_finite(),
        };
        ensure!(finite, op, "{}; bounds {:?} must be finite", what, self);
        Ok(())
    }
}

/// Basic or nonbasic status of a variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarStatus {
    Basic,
    /// Nonbasic on its lower bound
    NonbasicLower,
    /// Nonbasic on its upper bound
    NonbasicUpper,
    /// Nonbasic free variable (value zero)
    NonbasicFree,
    /// Nonbasic fixed variable
    NonbasicFixed,
}

impl VarStatus {
    pub fn is_basic(self) -> bool {
        self == VarStatus::Basic
    }
}

/// Kind of a structural variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColKind {
    #[default]
    Continuous,
    Integer,
}

/// Per-variable data shared by rows (auxiliary variables) and columns
/// (structural variables). `kind` and `coef` are only meaningful for columns.
#[derive(Debug, Clone)]
pub(crate) struct VarData {
    pub(crate) name: Option<String>,
    pub(crate) bounds: Bounds,
    pub(crate) stat: VarStatus,
    pub(crate) scale: f64,
    pub(crate) kind: ColKind,
    pub(crate) coef: f64,
    pub(crate) prim: f64,
    pub(crate) dual: f64,
    pub(crate) ipt_prim: f64,
    pub(crate) ipt_dual: f64,
    pub(crate) mip_val: f64,
}

impl VarData {
    fn new(bounds: Bounds, stat: VarStatus) -> Self {
        Self {
            name: None,
            bounds,
            stat,
            scale: 1.0,
            kind: ColKind::Continuous,
            coef: 0.0,
            prim: 0.0,
            dual: 0.0,
            ipt_prim: 0.0,
            ipt_dual: 0.0,
            mip_val: 0.0,
        }
    }
}

/// A linear programming problem object
///
/// Rows are auxiliary variables `x_R = A x_S`, columns are structural variables.
/// Variable ids are 0-based: row `i` is variable `i` and column `j` is variable
/// `m + j`.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    name: Option<String>,
    pub(crate) dir: Direction,
    pub(crate) c0: f64,
    pub(crate) rows: Vec<VarData>,
    pub(crate) cols: Vec<VarData>,
    pub(crate) matrix: MatrixStore,
    row_index: NameIndex,
    col_index: NameIndex,
    pub(crate) basis: Basis,
    pub(crate) sol: Solutions,
    pub(crate) params: Params,
}

fn check_name(op: &'static str, name: &str) -> LpResult<()> {
    ensure!(
        name.chars().count() <= MAX_NAME_LEN,
        op,
        "name too long ({} chars)",
        name.chars().count()
    );
    Ok(())
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) -> LpResult<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn num_nz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Number of integer columns
    pub fn num_int(&self) -> usize {
        self.cols.iter().filter(|c| c.kind == ColKind::Integer).count()
    }

    /// Number of integer columns with bounds `[0, 1]`
    pub fn num_bin(&self) -> usize {
        self.cols
            .iter()
            .filter(|c| c.kind == ColKind::Integer && c.bounds == Bounds::Double(0.0, 1.0))
            .count()
    }

    /// Variable id of column `j`
    pub fn col_var(&self, j: usize) -> usize {
        self.rows.len() + j
    }

    pub(crate) fn check_row(&self, op: &'static str, i: usize) -> LpResult<()> {
        ensure!(i < self.rows.len(), op, "i = {}; row number out of range", i);
        Ok(())
    }

    pub(crate) fn check_col(&self, op: &'static str, j: usize) -> LpResult<()> {
        ensure!(j < self.cols.len(), op, "j = {}; column number out of range", j);
        Ok(())
    }

    pub(crate) fn check_var(&self, op: &'static str, k: usize) -> LpResult<()> {
        ensure!(k < self.rows.len() + self.cols.len(), op, "k = {}; variable number out of range", k);
        Ok(())
    }

    pub(crate) fn var(&self, k: usize) -> &VarData {
        let m = self.rows.len();
        if k < m { &self.rows[k] } else { &self.cols[k - m] }
    }

    pub(crate) fn var_mut(&mut self, k: usize) -> &mut VarData {
        let m = self.rows.len();
        if k < m { &mut self.rows[k] } else { &mut self.cols[k - m] }
    }

    /// Drop the basis factorization and every cached solution.
    pub fn invalidate_basis(&mut self) {
        self.basis.clear();
        self.sol.invalidate();
    }

    pub fn set_prob_name(&mut self, name: &str) -> LpResult<()> {
        check_name("set_prob_name", name)?;
        self.name = (!name.is_empty()).then(|| name.to_string());
        Ok(())
    }

    pub fn prob_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Assign (or erase, with an empty string) the name of row `i`.
    pub fn set_row_name(&mut self, i: usize, name: &str) -> LpResult<()> {
        self.check_row("set_row_name", i)?;
        check_name("set_row_name", name)?;
        if let Some(old) = self.rows[i].name.take() {
            self.row_index.remove(&old, i);
        }
        if !name.is_empty() {
            self.row_index.insert(name, i);
            self.rows[i].name = Some(name.to_string());
        }
        Ok(())
    }

    /// Assign (or erase, with an empty string) the name of column `j`.
    pub fn set_col_name(&mut self, j: usize, name: &str) -> LpResult<()> {
        self.check_col("set_col_name", j)?;
        check_name("set_col_name", name)?;
        if let Some(old) = self.cols[j].name.take() {
            self.col_index.remove(&old, j);
        }
        if !name.is_empty() {
            self.col_index.insert(name, j);
            self.cols[j].name = Some(name.to_string());
        }
        Ok(())
    }

    pub fn row_name(&self, i: usize) -> LpResult<Option<&str>> {
        self.check_row("row_name", i)?;
        Ok(self.rows[i].name.as_deref())
    }

    pub fn col_name(&self, j: usize) -> LpResult<Option<&str>> {
        self.check_col("col_name", j)?;
        Ok(self.cols[j].name.as_deref())
    }

    /// Row carrying `name`. When several rows share a name the lowest numbered one is returned.
    pub fn find_row(&self, name: &str) -> Option<usize> {
        self.row_index.find(name)
    }

    /// Column carrying `name`. When several columns share a name the lowest numbered one is returned.
    pub fn find_col(&self, name: &str) -> Option<usize> {
        self.col_index.find(name)
    }

    fn rebuild_index(&mut self) {
        self.row_index = NameIndex::build(&self.rows);
        self.col_index = NameIndex::build(&self.cols);
    }

    pub fn set_obj_dir(&mut self, dir: Direction) {
        self.dir = dir;
        self.sol.invalidate();
    }

    pub fn obj_dir(&self) -> Direction {
        self.dir
    }

    pub fn set_obj_coef(&mut self, j: usize, coef: f64) -> LpResult<()> {
        self.check_col("set_obj_coef", j)?;
        self.cols[j].coef = coef;
        self.sol.invalidate();
        Ok(())
    }

    pub fn obj_coef(&self, j: usize) -> LpResult<f64> {
        self.check_col("obj_coef", j)?;
        Ok(self.cols[j].coef)
    }

    pub fn set_obj_const(&mut self, c0: f64) {
        self.c0 = c0;
        self.sol.invalidate();
    }

    pub fn obj_const(&self) -> f64 {
        self.c0
    }

    /// Append `nrs` free basic rows; returns the number of the first new row.
    pub fn add_rows(&mut self, nrs: usize) -> LpResult<usize> {
        ensure!(nrs >= 1, "add_rows", "nrs = {}; invalid number of rows", nrs);
        let first = self.rows.len();
        self.rows.reserve(nrs);
        self.rows
            .extend((0..nrs).map(|_| VarData::new(Bounds::Free, VarStatus::Basic)));
        self.matrix.add_rows(nrs);
        self.invalidate_basis();
        Ok(first)
    }

    /// Append `ncs` continuous columns fixed at zero; returns the number of the
    /// first new column.
    pub fn add_cols(&mut self, ncs: usize) -> LpResult<usize> {
        ensure!(ncs >= 1, "add_cols", "ncs = {}; invalid number of columns", ncs);
        let first = self.cols.len();
        self.cols.reserve(ncs);
        self.cols
            .extend((0..ncs).map(|_| VarData::new(Bounds::Fixed(0.0), VarStatus::NonbasicFixed)));
        self.matrix.add_cols(ncs);
        self.invalidate_basis();
        Ok(first)
    }

    pub fn set_row_bnds(&mut self, i: usize, bounds: Bounds) -> LpResult<()> {
        self.check_row("set_row_bnds", i)?;
        bounds.check("set_row_bnds", &format!("i = {i}"))?;
        let row = &mut self.rows[i];
        row.bounds = bounds;
        if !row.stat.is_basic() {
            row.stat = bounds.status_after_change(row.stat);
        }
        self.invalidate_basis();
        Ok(())
    }

    pub fn set_col_bnds(&mut self, j: usize, bounds: Bounds) -> LpResult<()> {
        self.check_col("set_col_bnds", j)?;
        bounds.check("set_col_bnds", &format!("j = {j}"))?;
        let col = &mut self.cols[j];
        col.bounds = bounds;
        if !col.stat.is_basic() {
            col.stat = bounds.status_after_change(col.stat);
        }
        self.invalidate_basis();
        Ok(())
    }

    pub fn row_bnds(&self, i: usize) -> LpResult<Bounds> {
        self.check_row("row_bnds", i)?;
        Ok(self.rows[i].bounds)
    }

    pub fn col_bnds(&self, j: usize) -> LpResult<Bounds> {
        self.check_col("col_bnds", j)?;
        Ok(self.cols[j].bounds)
    }

    /// Bounds of variable `k` (row or column)
    pub fn var_bnds(&self, k: usize) -> LpResult<Bounds> {
        self.check_var("var_bnds", k)?;
        Ok(self.var(k).bounds)
    }

    pub fn set_col_kind(&mut self, j: usize, kind: ColKind) -> LpResult<()> {
        self.check_col("set_col_kind", j)?;
        self.cols[j].kind = kind;
        self.sol.invalidate_mip();
        Ok(())
    }

    pub fn col_kind(&self, j: usize) -> LpResult<ColKind> {
        self.check_col("col_kind", j)?;
        Ok(self.cols[j].kind)
    }

    /// Set the status of row `i`. A nonbasic status the bounds do not allow is
    /// replaced by the closest one they do.
    pub fn set_row_stat(&mut self, i: usize, stat: VarStatus) -> LpResult<()> {
        self.check_row("set_row_stat", i)?;
        let row = &mut self.rows[i];
        row.stat = if stat.is_basic() { stat } else { row.bounds.coerce_status(stat) };
        self.invalidate_basis();
        Ok(())
    }

    /// Set the status of column `j`. A nonbasic status the bounds do not allow is
    /// replaced by the closest one they do.
    pub fn set_col_stat(&mut self, j: usize, stat: VarStatus) -> LpResult<()> {
        self.check_col("set_col_stat", j)?;
        let col = &mut self.cols[j];
        col.stat = if stat.is_basic() { stat } else { col.bounds.coerce_status(stat) };
        self.invalidate_basis();
        Ok(())
    }

    pub fn row_stat(&self, i: usize) -> LpResult<VarStatus> {
        self.check_row("row_stat", i)?;
        Ok(self.rows[i].stat)
    }

    pub fn col_stat(&self, j: usize) -> LpResult<VarStatus> {
        self.check_col("col_stat", j)?;
        Ok(self.cols[j].stat)
    }

    /// Status of variable `k` (row or column)
    pub fn var_stat(&self, k: usize) -> LpResult<VarStatus> {
        self.check_var("var_stat", k)?;
        Ok(self.var(k).stat)
    }

    pub fn set_rii(&mut self, i: usize, rii: f64) -> LpResult<()> {
        self.check_row("set_rii", i)?;
        ensure!(rii > 0.0, "set_rii", "i = {}; rii = {}; invalid scale factor", i, rii);
        self.rows[i].scale = rii;
        self.invalidate_basis();
        Ok(())
    }

    pub fn set_sjj(&mut self, j: usize, sjj: f64) -> LpResult<()> {
        self.check_col("set_sjj", j)?;
        ensure!(sjj > 0.0, "set_sjj", "j = {}; sjj = {}; invalid scale factor", j, sjj);
        self.cols[j].scale = sjj;
        self.invalidate_basis();
        Ok(())
    }

    pub fn rii(&self, i: usize) -> LpResult<f64> {
        self.check_row("rii", i)?;
        Ok(self.rows[i].scale)
    }

    pub fn sjj(&self, j: usize) -> LpResult<f64> {
        self.check_col("sjj", j)?;
        Ok(self.cols[j].scale)
    }

    /// Replace the contents of row `i` with the given column indices and values.
    pub fn set_mat_row(&mut self, i: usize, ind: &[usize], val: &[f64]) -> LpResult<()> {
        const OP: &str = "set_mat_row";
        self.check_row(OP, i)?;
        let n = self.cols.len();
        ensure!(ind.len() == val.len(), OP, "i = {}; {} indices but {} values", i, ind.len(), val.len());
        ensure!(ind.len() <= n, OP, "i = {}; len = {}; invalid row length", i, ind.len());
        let mut seen = vec![false; n];
        for (k, (&j, &v)) in ind.iter().zip(val).enumerate() {
            ensure!(j < n, OP, "i = {}; ind[{}] = {}; column index out of range", i, k, j);
            ensure!(!seen[j], OP, "i = {}; ind[{}] = {}; duplicate column indices not allowed", i, k, j);
            ensure!(v != 0.0, OP, "i = {}; ind[{}] = {}; zero element not allowed", i, k, j);
            seen[j] = true;
        }
        self.matrix.clear_row(i);
        for (&j, &v) in ind.iter().zip(val) {
            self.matrix.insert(i, j, v);
        }
        self.invalidate_basis();
        Ok(())
    }

    /// Replace the contents of column `j` with the given row indices and values.
    pub fn set_mat_col(&mut self, j: usize, ind: &[usize], val: &[f64]) -> LpResult<()> {
        const OP: &str = "set_mat_col";
        self.check_col(OP, j)?;
        let m = self.rows.len();
        ensure!(ind.len() == val.len(), OP, "j = {}; {} indices but {} values", j, ind.len(), val.len());
        ensure!(ind.len() <= m, OP, "j = {}; len = {}; invalid column length", j, ind.len());
        let mut seen = vec![false; m];
        for (k, (&i, &v)) in ind.iter().zip(val).enumerate() {
            ensure!(i < m, OP, "j = {}; ind[{}] = {}; row index out of range", j, k, i);
            ensure!(!seen[i], OP, "j = {}; ind[{}] = {}; duplicate row indices not allowed", j, k, i);
            ensure!(v != 0.0, OP, "j = {}; ind[{}] = {}; zero element not allowed", j, k, i);
            seen[i] = true;
        }
        self.matrix.clear_col(j);
        for (&i, &v) in ind.iter().zip(val) {
            self.matrix.insert(i, j, v);
        }
        self.invalidate_basis();
        Ok(())
    }

    /// Replace the whole constraint matrix with the triplets `(ia[k], ja[k], ar[k])`.
    pub fn load_matrix(&mut self, ia: &[usize], ja: &[usize], ar: &[f64]) -> LpResult<()> {
        const OP: &str = "load_matrix";
        let (m, n) = (self.rows.len(), self.cols.len());
        ensure!(
            ia.len() == ja.len() && ja.len() == ar.len(),
            OP,
            "triplet arrays differ in length ({}, {}, {})",
            ia.len(),
            ja.len(),
            ar.len()
        );
        let mut store = MatrixStore::default();
        store.add_rows(m);
        store.add_cols(n);
        for (k, ((&i, &j), &v)) in ia.iter().zip(ja).zip(ar).enumerate() {
            ensure!(i < m, OP, "ia[{}] = {}; row index out of range", k, i);
            ensure!(j < n, OP, "ja[{}] = {}; column index out of range", k, j);
            ensure!(v != 0.0, OP, "ar[{}] = 0; zero element not allowed", k);
            store.insert_row_only(i, j, v);
        }
        if let Err((i, j)) = store.link_cols() {
            let k = (0..ia.len()).rev().find(|&k| ia[k] == i && ja[k] == j).unwrap_or(0);
            return Err(LpError::invalid(
                OP,
                format!("ia[{k}] = {i}; ja[{k}] = {j}; duplicate indices not allowed"),
            ));
        }
        self.matrix = store;
        self.invalidate_basis();
        Ok(())
    }

    /// Non-zeros of row `i` as (column, value), most recently inserted first.
    pub fn get_mat_row(&self, i: usize) -> LpResult<SparseVec> {
        self.check_row("get_mat_row", i)?;
        Ok(SparseVec::from_pairs(self.matrix.row(i)))
    }

    /// Non-zeros of column `j` as (row, value), most recently inserted first.
    pub fn get_mat_col(&self, j: usize) -> LpResult<SparseVec> {
        self.check_col("get_mat_col", j)?;
        Ok(SparseVec::from_pairs(self.matrix.col(j)))
    }

    /// Sort row lists by column and column lists by row.
    pub fn order_matrix(&mut self) {
        self.matrix.order();
    }

    /// Delete the rows listed in `num`; the remaining rows keep their relative order.
    pub fn del_rows(&mut self, num: &[usize]) -> LpResult<()> {
        const OP: &str = "del_rows";
        let m = self.rows.len();
        ensure!(!num.is_empty(), OP, "nrs = 0; invalid number of rows");
        let mut gone = vec![false; m];
        for (k, &i) in num.iter().enumerate() {
            ensure!(i < m, OP, "num[{}] = {}; row number out of range", k, i);
            ensure!(!gone[i], OP, "num[{}] = {}; duplicate row numbers not allowed", k, i);
            gone[i] = true;
        }
        for i in (0..m).filter(|&i| gone[i]) {
            self.matrix.clear_row(i);
        }
        self.matrix.remove_rows(&gone);
        let mut flags = gone.iter();
        self.rows.retain(|_| !flags.next().copied().unwrap_or(false));
        self.rebuild_index();
        self.invalidate_basis();
        Ok(())
    }

    /// Delete the columns listed in `num`; the remaining columns keep their
    /// relative order.
    pub fn del_cols(&mut self, num: &[usize]) -> LpResult<()> {
        const OP: &str = "del_cols";
        let n = self.cols.len();
        ensure!(!num.is_empty(), OP, "ncs = 0; invalid number of columns");
        let mut gone = vec![false; n];
        for (k, &j) in num.iter().enumerate() {
            ensure!(j < n, OP, "num[{}] = {}; column number out of range", k, j);
            ensure!(!gone[j], OP, "num[{}] = {}; duplicate column numbers not allowed", k, j);
            gone[j] = true;
        }
        for j in (0..n).filter(|&j| gone[j]) {
            self.matrix.clear_col(j);
        }
        self.matrix.remove_cols(&gone);
        let mut flags = gone.iter();
        self.cols.retain(|_| !flags.next().copied().unwrap_or(false));
        self.rebuild_index();
        self.invalidate_basis();
        Ok(())
    }
}

/// Name lookup for rows or columns. A name may be shared, so every holder is
/// kept, in ascending order.
#[derive(Debug, Clone, Default)]
struct NameIndex(FxHashMap<String, Vec<usize>>);

impl NameIndex {
    fn build(vars: &[VarData]) -> Self {
        let mut index = Self::default();
        for (k, var) in vars.iter().enumerate() {
            if let Some(name) = &var.name {
                index.insert(name, k);
            }
        }
        index
    }

    fn insert(&mut self, name: &str, k: usize) {
        let holders = self.0.entry(name.to_string()).or_default();
        if let Err(pos) = holders.binary_search(&k) {
            holders.insert(pos, k);
        }
    }

    fn remove(&mut self, name: &str, k: usize) {
        if let Some(holders) = self.0.get_mut(name) {
            holders.retain(|&h| h != k);
            if holders.is_empty() {
                self.0.remove(name);
            }
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.0.get(name).and_then(|holders| holders.first().copied())
    }
}
