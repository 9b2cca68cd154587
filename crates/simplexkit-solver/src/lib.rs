mod basis;
mod cuts;
mod error;
mod eval;
mod lu;
mod params;
mod problem;
mod ratio;
mod scaling;
mod solution;
mod sparse;

pub use basis::{BasisStatus, InvertStatus};
pub use cuts::{CutError, GomoryCut, remove_tiny};
pub use error::{LpError, LpResult};
pub use eval::{ConstraintOp, WarmUpStatus};
pub use params::{Params, ScaleMode, ScaleOrder};
pub use problem::{Bounds, ColKind, Direction, MAX_NAME_LEN, Problem, VarStatus};
pub use scaling::{Line, MatrixSource, eq_scal, gm_scal};
pub use solution::{
    BasicSolution, DualStatus, InteriorStatus, MipStatus, PrimalStatus, SolutionStatus,
};
pub use sparse::SparseVec;
