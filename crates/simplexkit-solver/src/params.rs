use crate::error::{LpResult, ensure};

/// Which scaling routine `Problem::scale_prob` runs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Keep unit scale factors
    None,
    /// One equilibration pass
    Equilibrate,
    /// Iterated geometric mean scaling
    GeometricMean,
    /// Geometric mean scaling followed by one equilibration pass
    #[default]
    GeometricMeanThenEquilibrate,
}

/// Order in which rows and columns are scaled within one pass.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleOrder {
    #[default]
    RowsFirst,
    ColsFirst,
}

/// Control parameters of a problem object
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    /// Relative tolerance on primal bound violations
    pub tol_bnd: f64,
    /// Absolute tolerance on reduced cost sign violations
    pub tol_dj: f64,
    /// Scaling routine
    pub scale: ScaleMode,
    /// Scaling order
    pub scale_order: ScaleOrder,
    /// Maximum number of geometric mean iterations
    pub scale_max_iter: usize,
    /// Minimal relative improvement of the scaling quality per iteration
    pub scale_eps: f64,
    /// Relative magnitude below which a pivot candidate counts as zero
    pub eps_tol: f64,
    /// Element growth above which a factorization is ill-conditioned
    pub max_gro: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            tol_bnd: 1e-7,
            tol_dj: 1e-7,
            scale: ScaleMode::default(),
            scale_order: ScaleOrder::default(),
            scale_max_iter: 20,
            scale_eps: 0.01,
            eps_tol: 1e-13,
            max_gro: 1e10,
        }
    }
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tol_bnd(mut self, tol: f64) -> Self {
        self.tol_bnd = tol;
        self
    }

    pub fn with_tol_dj(mut self, tol: f64) -> Self {
        self.tol_dj = tol;
        self
    }

    pub fn with_scale(mut self, mode: ScaleMode) -> Self {
        self.scale = mode;
        self
    }

    pub fn with_scale_order(mut self, order: ScaleOrder) -> Self {
        self.scale_order = order;
        self
    }

    pub fn with_scale_iterations(mut self, max_iter: usize, eps: f64) -> Self {
        self.scale_max_iter = max_iter;
        self.scale_eps = eps;
        self
    }

    pub fn with_pivot_tolerance(mut self, eps_tol: f64) -> Self {
        self.eps_tol = eps_tol;
        self
    }

    pub fn with_max_growth(mut self, max_gro: f64) -> Self {
        self.max_gro = max_gro;
        self
    }

    pub(crate) fn validate(&self) -> LpResult<()> {
        const OP: &str = "set_params";
        ensure!(0.0 < self.tol_bnd && self.tol_bnd < 1.0, OP, "tol_bnd = {}; invalid tolerance", self.tol_bnd);
        ensure!(0.0 < self.tol_dj && self.tol_dj < 1.0, OP, "tol_dj = {}; invalid tolerance", self.tol_dj);
        ensure!(self.scale_eps > 0.0, OP, "scale_eps = {}; invalid criterion", self.scale_eps);
        ensure!(0.0 < self.eps_tol && self.eps_tol < 1.0, OP, "eps_tol = {}; invalid tolerance", self.eps_tol);
        ensure!(self.max_gro > 1.0, OP, "max_gro = {}; invalid growth limit", self.max_gro);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let params = Params::new()
            .with_tol_bnd(1e-6)
            .with_scale(ScaleMode::Equilibrate)
            .with_scale_order(ScaleOrder::ColsFirst)
            .with_scale_iterations(5, 0.1);
        assert_eq!(params.tol_bnd, 1e-6);
        assert_eq!(params.tol_dj, 1e-7);
        assert_eq!(params.scale, ScaleMode::Equilibrate);
        assert_eq!(params.scale_order, ScaleOrder::ColsFirst);
        assert_eq!(params.scale_max_iter, 5);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_tolerance() {
        assert!(Params::new().with_tol_dj(0.0).validate().is_err());
        assert!(Params::new().with_tol_bnd(2.0).validate().is_err());
        assert!(Params::new().with_max_growth(0.5).validate().is_err());
    }
}
