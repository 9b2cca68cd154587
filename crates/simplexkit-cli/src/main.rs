mod model;

use clap::{Parser, Subcommand};
use log::{LevelFilter, debug};
use simplexkit_solver::{
    ColKind, ConstraintOp, CutError, DualStatus, GomoryCut, Problem, SolutionStatus, SparseVec,
    VarStatus, WarmUpStatus, remove_tiny,
};
use std::path::{Path, PathBuf};

use model::Model;

/// Cut coefficients below this share of the largest one are dropped before printing
const CUT_EPS: f64 = 1e-9;

#[derive(Parser)]
#[command(name = "simplexkit")]
#[command(about = "Inspect LP bases: warm start, tableau rows and columns, Gomory cuts", long_about = None)]
struct Cli {
    /// Log kernel activity (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a model file and report its dimensions
    Check {
        /// The JSON model file
        file: PathBuf,
    },
    /// Factorize the basis given by the model statuses and print the basic solution
    WarmUp {
        /// The JSON model file
        file: PathBuf,
        /// Scale the problem before factorizing
        #[arg(short, long)]
        scale: bool,
        /// Print the solution as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the tableau row of a basic variable
    TabRow {
        /// The JSON model file
        file: PathBuf,
        /// Row or column name, or #id
        var: String,
    },
    /// Print the tableau column of a non-basic variable
    TabCol {
        /// The JSON model file
        file: PathBuf,
        /// Row or column name, or #id
        var: String,
    },
    /// Generate a Gomory cut from the row of a basic integer column
    Gomory {
        /// The JSON model file
        file: PathBuf,
        /// Column name or #id
        var: String,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn load(file: &Path) -> Problem {
    match Model::load(file).and_then(|model| model.build()) {
        Ok(lp) => lp,
        Err(e) => fail(format!("{}: {}", file.display(), e)),
    }
}

/// Load the model and make sure its basis is factorized and solved.
fn load_warm(file: &Path, scale: bool) -> Problem {
    let mut lp = load(file);
    if scale {
        if let Err(e) = lp.scale_prob() {
            fail(e);
        }
    }
    match lp.warm_up() {
        Ok(WarmUpStatus::Ok) => lp,
        Ok(WarmUpStatus::Empty) => fail("problem has no rows or no columns"),
        Ok(WarmUpStatus::InvalidBasis) => fail("statuses do not define a basis (need one basic variable per row)"),
        Ok(WarmUpStatus::Singular) => fail("basis matrix is singular or ill-conditioned"),
        Err(e) => fail(e),
    }
}

/// Resolve `#id`, a column name or a row name to a variable id.
fn resolve(lp: &Problem, var: &str) -> Result<usize, String> {
    if let Some(id) = var.strip_prefix('#') {
        let k: usize = id.parse().map_err(|_| format!("invalid variable id '{}'", var))?;
        if k >= lp.num_rows() + lp.num_cols() {
            return Err(format!("variable id {} out of range", k));
        }
        return Ok(k);
    }
    if let Some(j) = lp.find_col(var) {
        return Ok(lp.col_var(j));
    }
    lp.find_row(var).ok_or_else(|| format!("unknown variable '{}'", var))
}

fn label(lp: &Problem, k: usize) -> String {
    let m = lp.num_rows();
    let name = if k < m { lp.row_name(k) } else { lp.col_name(k - m) };
    match name {
        Ok(Some(name)) => name.to_string(),
        _ => format!("#{}", k),
    }
}

fn status_label(status: SolutionStatus) -> &'static str {
    match status {
        SolutionStatus::Undefined => "UNDEFINED",
        SolutionStatus::Optimal => "OPTIMAL",
        SolutionStatus::Feasible => "FEASIBLE",
        SolutionStatus::Infeasible => "INFEASIBLE",
        SolutionStatus::NoFeasible => "NO FEASIBLE",
        SolutionStatus::Unbounded => "UNBOUNDED",
    }
}

fn stat_label(stat: VarStatus) -> &'static str {
    match stat {
        VarStatus::Basic => "B",
        VarStatus::NonbasicLower => "NL",
        VarStatus::NonbasicUpper => "NU",
        VarStatus::NonbasicFree => "NF",
        VarStatus::NonbasicFixed => "NS",
    }
}

fn print_entries(lp: &Problem, v: &SparseVec) {
    for (k, val) in v.iter() {
        println!("  {:20} {:14.6}", label(lp, k), val);
    }
}

/// Cut over structural variables, small coefficients dropped; the second value
/// is the degradation estimate when the solution is dual feasible.
fn gomory(lp: &Problem, var: &str) -> Result<(GomoryCut, Option<f64>), String> {
    let k = resolve(lp, var)?;
    let m = lp.num_rows();
    if k < m || lp.col_kind(k - m).map_err(|e| e.to_string())? != ColKind::Integer {
        return Err(format!("{} is not an integer column", label(lp, k)));
    }
    let row = lp.eval_tab_row(k).map_err(|e| e.to_string())?;
    let mut cut = lp.gomory_cut(&row).map_err(|e| match e {
        CutError::FreeNonbasic | CutError::NearIntegerRow => format!("no cut: {}", e),
        CutError::Invalid(e) => e.to_string(),
    })?;
    remove_tiny(&mut cut.coefs, CUT_EPS).map_err(|e| e.to_string())?;
    let degrad = if lp.dual_stat() == DualStatus::Feasible {
        match lp.eval_degrad(&cut.coefs, ConstraintOp::Ge, cut.rhs) {
            Ok(d) => Some(d),
            Err(e) => {
                debug!("gomory: no degradation estimate: {}", e);
                None
            }
        }
    } else {
        None
    };
    Ok((cut, degrad))
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Commands::Check { file } => {
            let lp = load(&file);
            println!("✓ {} is valid", file.display());
            if let Some(name) = lp.prob_name() {
                println!("  name: {}", name);
            }
            println!("  {} rows", lp.num_rows());
            println!("  {} columns ({} integer, {} binary)", lp.num_cols(), lp.num_int(), lp.num_bin());
            println!("  {} non-zeros", lp.num_nz());
        }
        Commands::WarmUp { file, scale, json } => {
            let lp = load_warm(&file, scale);
            let solution = lp.basic_solution();
            if json {
                match serde_json::to_string_pretty(&solution) {
                    Ok(text) => println!("{}", text),
                    Err(e) => fail(e),
                }
                return;
            }

            println!("Status: {}", status_label(solution.status));
            println!("Primal: {:?}", solution.primal_status);
            println!("Dual: {:?}", solution.dual_status);
            println!("Objective: {:.6}", solution.objective_value);
            println!();
            println!("Rows:");
            for (i, (prim, dual)) in solution.row_prim.iter().zip(&solution.row_dual).enumerate() {
                let stat = lp.row_stat(i).map(stat_label).unwrap_or("?");
                println!("  {:20} {:2} {:14.6} {:14.6}", label(&lp, i), stat, prim, dual);
            }
            println!();
            println!("Columns:");
            for (j, (prim, dual)) in solution.col_prim.iter().zip(&solution.col_dual).enumerate() {
                let stat = lp.col_stat(j).map(stat_label).unwrap_or("?");
                println!("  {:20} {:2} {:14.6} {:14.6}", label(&lp, lp.col_var(j)), stat, prim, dual);
            }
        }
        Commands::TabRow { file, var } => {
            let lp = load_warm(&file, false);
            let k = resolve(&lp, &var).unwrap_or_else(|e| fail(e));
            match lp.eval_tab_row(k) {
                Ok(row) => {
                    println!("{} =", label(&lp, k));
                    print_entries(&lp, &row);
                }
                Err(e) => fail(e),
            }
        }
        Commands::TabCol { file, var } => {
            let lp = load_warm(&file, false);
            let k = resolve(&lp, &var).unwrap_or_else(|e| fail(e));
            match lp.eval_tab_col(k) {
                Ok(col) => {
                    println!("d/d {}:", label(&lp, k));
                    print_entries(&lp, &col);
                }
                Err(e) => fail(e),
            }
        }
        Commands::Gomory { file, var } => {
            let lp = load_warm(&file, false);
            match gomory(&lp, &var) {
                Ok((cut, degrad)) => {
                    println!("Cut:");
                    for (j, val) in cut.coefs.iter() {
                        println!("  {:+14.6} {}", val, label(&lp, lp.col_var(j)));
                    }
                    println!("  >= {:.6}", cut.rhs);
                    if let Some(d) = degrad {
                        println!("Objective change estimate: {:.6}", d);
                    }
                }
                Err(e) => fail(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// max x  s.t.  2x <= 3 with x integer and basic at 1.5
    const FRACTIONAL: &str = r#"{
        "direction": "Maximize",
        "rows": [{ "name": "cap", "bounds": { "upper": 3 }, "status": "upper" }],
        "cols": [{ "name": "x", "obj": 1, "integer": true, "status": "basic" }],
        "matrix": [[0, 0, 2]]
    }"#;

    fn warm(source: &str) -> Problem {
        let mut lp = Model::parse(source).unwrap().build().unwrap();
        assert_eq!(lp.warm_up().unwrap(), WarmUpStatus::Ok);
        lp
    }

    #[test]
    fn test_resolve_names_and_ids() {
        let lp = warm(FRACTIONAL);
        assert_eq!(resolve(&lp, "x"), Ok(1));
        assert_eq!(resolve(&lp, "cap"), Ok(0));
        assert_eq!(resolve(&lp, "#1"), Ok(1));
        assert!(resolve(&lp, "#9").is_err());
        assert!(resolve(&lp, "#x").is_err());
        assert!(resolve(&lp, "z").is_err());
        assert_eq!(label(&lp, 1), "x");
    }

    #[test]
    fn test_gomory_command_output() {
        let lp = warm(FRACTIONAL);
        let (cut, degrad) = gomory(&lp, "x").unwrap();
        assert_eq!(cut.coefs.ind, vec![0]);
        assert_abs_diff_eq!(cut.coefs.val[0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cut.rhs, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(degrad.unwrap(), -0.5, epsilon = 1e-12);

        let err = gomory(&lp, "cap").unwrap_err();
        assert_eq!(err, "cap is not an integer column");
    }
}
