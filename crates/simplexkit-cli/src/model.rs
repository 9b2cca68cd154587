//! JSON description of an LP and its conversion into a kernel problem.

use serde::Deserialize;
use simplexkit_solver::{Bounds, ColKind, Direction, LpError, Problem, VarStatus};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("cannot read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{what}: lower bound {lower} exceeds upper bound {upper}")]
    Bounds { what: String, lower: f64, upper: f64 },
    #[error(transparent)]
    Lp(#[from] LpError),
}

/// Bounds as written in a model file; a missing side is unbounded.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BoundsDef {
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

impl BoundsDef {
    fn nonnegative() -> Self {
        Self { lower: Some(0.0), upper: None }
    }

    fn to_bounds(self, what: impl FnOnce() -> String) -> Result<Bounds, ModelError> {
        Ok(match (self.lower, self.upper) {
            (None, None) => Bounds::Free,
            (Some(lb), None) => Bounds::Lower(lb),
            (None, Some(ub)) => Bounds::Upper(ub),
            (Some(lb), Some(ub)) if lb == ub => Bounds::Fixed(lb),
            (Some(lb), Some(ub)) if lb < ub => Bounds::Double(lb, ub),
            (Some(lower), Some(upper)) => return Err(ModelError::Bounds { what: what(), lower, upper }),
        })
    }
}

/// Basis status requested for a row or column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusDef {
    Basic,
    Lower,
    Upper,
    Free,
    Fixed,
}

impl From<StatusDef> for VarStatus {
    fn from(def: StatusDef) -> Self {
        match def {
            StatusDef::Basic => VarStatus::Basic,
            StatusDef::Lower => VarStatus::NonbasicLower,
            StatusDef::Upper => VarStatus::NonbasicUpper,
            StatusDef::Free => VarStatus::NonbasicFree,
            StatusDef::Fixed => VarStatus::NonbasicFixed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bounds: BoundsDef,
    #[serde(default)]
    pub status: Option<StatusDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColDef {
    #[serde(default)]
    pub name: Option<String>,
    /// Defaults to `x >= 0`
    #[serde(default = "BoundsDef::nonnegative")]
    pub bounds: BoundsDef,
    #[serde(default)]
    pub obj: f64,
    #[serde(default)]
    pub integer: bool,
    #[serde(default)]
    pub status: Option<StatusDef>,
}

/// An LP as stored in a JSON model file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub obj_const: f64,
    #[serde(default)]
    pub rows: Vec<RowDef>,
    #[serde(default)]
    pub cols: Vec<ColDef>,
    /// Non-zero constraint coefficients as `[row, col, value]`
    #[serde(default)]
    pub matrix: Vec<(usize, usize, f64)>,
}

impl Model {
    pub fn parse(source: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Build the kernel problem. Requested statuses are applied last so that
    /// they are checked against the final bounds.
    pub fn build(&self) -> Result<Problem, ModelError> {
        let mut lp = Problem::new();
        if let Some(name) = &self.name {
            lp.set_prob_name(name)?;
        }
        lp.set_obj_dir(self.direction);
        lp.set_obj_const(self.obj_const);

        if !self.rows.is_empty() {
            lp.add_rows(self.rows.len())?;
        }
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(name) = &row.name {
                lp.set_row_name(i, name)?;
            }
            let bounds = row.bounds.to_bounds(|| describe("row", i, row.name.as_deref()))?;
            lp.set_row_bnds(i, bounds)?;
        }

        if !self.cols.is_empty() {
            lp.add_cols(self.cols.len())?;
        }
        for (j, col) in self.cols.iter().enumerate() {
            if let Some(name) = &col.name {
                lp.set_col_name(j, name)?;
            }
            let bounds = col.bounds.to_bounds(|| describe("column", j, col.name.as_deref()))?;
            lp.set_col_bnds(j, bounds)?;
            lp.set_obj_coef(j, col.obj)?;
            if col.integer {
                lp.set_col_kind(j, ColKind::Integer)?;
            }
        }

        if !self.matrix.is_empty() {
            let ia: Vec<usize> = self.matrix.iter().map(|t| t.0).collect();
            let ja: Vec<usize> = self.matrix.iter().map(|t| t.1).collect();
            let ar: Vec<f64> = self.matrix.iter().map(|t| t.2).collect();
            lp.load_matrix(&ia, &ja, &ar)?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            if let Some(stat) = row.status {
                lp.set_row_stat(i, stat.into())?;
            }
        }
        for (j, col) in self.cols.iter().enumerate() {
            if let Some(stat) = col.status {
                lp.set_col_stat(j, stat.into())?;
            }
        }
        Ok(lp)
    }
}

fn describe(kind: &str, num: usize, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{kind} {num} ({name})"),
        None => format!("{kind} {num}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "sample",
        "direction": "Maximize",
        "rows": [
            { "name": "cap", "bounds": { "upper": 4 }, "status": "upper" },
            { "name": "mix", "bounds": { "upper": 6 } }
        ],
        "cols": [
            { "name": "x", "obj": 3, "status": "basic" },
            { "name": "y", "obj": 2, "integer": true }
        ],
        "matrix": [[0, 0, 1], [0, 1, 1], [1, 0, 1], [1, 1, 3]]
    }"#;

    #[test]
    fn test_build_sample_model() {
        let lp = Model::parse(SAMPLE).unwrap().build().unwrap();
        assert_eq!(lp.prob_name(), Some("sample"));
        assert_eq!(lp.obj_dir(), Direction::Maximize);
        assert_eq!(lp.num_rows(), 2);
        assert_eq!(lp.num_cols(), 2);
        assert_eq!(lp.num_nz(), 4);
        assert_eq!(lp.num_int(), 1);
        assert_eq!(lp.find_col("y"), Some(1));
        assert_eq!(lp.row_bnds(1).unwrap(), Bounds::Upper(6.0));
        assert_eq!(lp.col_bnds(0).unwrap(), Bounds::Lower(0.0));
        assert_eq!(lp.row_stat(0).unwrap(), VarStatus::NonbasicUpper);
        assert_eq!(lp.col_stat(0).unwrap(), VarStatus::Basic);
    }

    #[test]
    fn test_bounds_def_conversion() {
        let what = || "row 0".to_string();
        let def = BoundsDef { lower: Some(2.0), upper: Some(2.0) };
        assert_eq!(def.to_bounds(what).unwrap(), Bounds::Fixed(2.0));
        assert_eq!(BoundsDef::default().to_bounds(what).unwrap(), Bounds::Free);

        let def = BoundsDef { lower: Some(3.0), upper: Some(1.0) };
        let err = def.to_bounds(what).unwrap_err();
        assert_eq!(err.to_string(), "row 0: lower bound 3 exceeds upper bound 1");
    }

    #[test]
    fn test_duplicate_triplets_rejected() {
        let model = Model {
            rows: vec![RowDef { name: None, bounds: BoundsDef::default(), status: None }],
            cols: vec![ColDef {
                name: None,
                bounds: BoundsDef::nonnegative(),
                obj: 0.0,
                integer: false,
                status: None,
            }],
            matrix: vec![(0, 0, 1.0), (0, 0, 2.0)],
            ..Model::default()
        };
        let err = model.build().unwrap_err();
        assert!(matches!(err, ModelError::Lp(LpError::InvariantViolation { op: "load_matrix", .. })));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Model::parse("{ \"rows\": 3 }"), Err(ModelError::Json(_))));
    }
}
