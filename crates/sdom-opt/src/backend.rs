//! Solver backend: lowers the model data into HiGHS and maps termination.
//!
//! The model layer never talks to a solver type directly; it hands the
//! registry, constraint rows and objective to [`solve_lowered`] and gets a
//! dense value vector back. Everything solver-specific stays behind this
//! boundary (and behind the `solver-highs` cargo feature).

use serde::{Deserialize, Serialize};

use sdom_core::{SdomError, SdomResult};

use crate::expr::{Comparator, ConstraintRow, LinExpr};
use crate::registry::SymbolRegistry;

/// Solver selection and driver options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Backend name; `highs` is the one open-source MILP backend built in.
    pub solver: String,
    /// Wall-clock limit forwarded to the solver, seconds.
    pub time_limit_secs: Option<f64>,
    /// Relative MIP gap at which the solver may stop.
    pub mip_gap: Option<f64>,
    /// Branch-and-bound worker threads.
    pub threads: Option<i32>,
    /// Mirror the solver log to the console.
    pub verbose: bool,
    /// Solver-native option passthrough, applied verbatim.
    pub options: Vec<(String, OptionValue)>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            solver: "highs".to_string(),
            time_limit_secs: None,
            mip_gap: None,
            threads: None,
            verbose: false,
            options: Vec::new(),
        }
    }
}

/// A solver-native option value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(String),
}

/// Primal values at optimality, indexed by `VarId`.
#[derive(Debug, Clone)]
pub struct RawSolution {
    pub values: Vec<f64>,
    pub objective: f64,
}

/// Solve the lowered model. Non-optimal termination surfaces as the
/// matching [`SdomError`] kind; the orchestrator folds those into a report.
pub fn solve_lowered(
    registry: &SymbolRegistry,
    constraints: &[ConstraintRow],
    objective: &LinExpr,
    settings: &SolverSettings,
) -> SdomResult<RawSolution> {
    if !settings.solver.eq_ignore_ascii_case("highs") {
        return Err(SdomError::Config(format!(
            "unsupported solver '{}'; this build knows 'highs'",
            settings.solver
        )));
    }
    solve_highs(registry, constraints, objective, settings)
}

/// Fold duplicate variable references into one coefficient per column.
fn compress(expr: &LinExpr, len: usize) -> Vec<(usize, f64)> {
    let mut dense = vec![0.0; len];
    for &(var, coeff) in &expr.terms {
        dense[var.index()] += coeff;
    }
    dense
        .into_iter()
        .enumerate()
        .filter(|&(_, c)| c != 0.0)
        .collect()
}

#[cfg(feature = "solver-highs")]
fn solve_highs(
    registry: &SymbolRegistry,
    constraints: &[ConstraintRow],
    objective: &LinExpr,
    settings: &SolverSettings,
) -> SdomResult<RawSolution> {
    use highs::{HighsModelStatus, RowProblem, Sense};

    use crate::registry::VarKind;

    let n = registry.num_variables();
    let mut objective_coeffs = vec![0.0; n];
    for &(var, coeff) in &objective.terms {
        objective_coeffs[var.index()] += coeff;
    }

    let mut problem = RowProblem::default();
    let mut columns = Vec::with_capacity(n);
    for (idx, spec) in registry.variables().enumerate() {
        let coeff = objective_coeffs[idx];
        let col = match (spec.kind, spec.upper.is_finite()) {
            (VarKind::Binary, _) => problem.add_integer_column(coeff, 0.0..=1.0),
            (VarKind::Continuous, true) => problem.add_column(coeff, spec.lower..=spec.upper),
            (VarKind::Continuous, false) => problem.add_column(coeff, spec.lower..),
        };
        columns.push(col);
    }

    for row in constraints {
        // Constants inside the expression move to the bound side.
        let bound = row.rhs - row.expr.constant;
        let factors: Vec<(highs::Col, f64)> = compress(&row.expr, n)
            .into_iter()
            .map(|(idx, coeff)| (columns[idx], coeff))
            .collect();
        match row.comparator {
            Comparator::LessEq => problem.add_row(..=bound, factors),
            Comparator::GreaterEq => problem.add_row(bound.., factors),
            Comparator::Equal => problem.add_row(bound..=bound, factors),
        }
    }

    let mut model = problem.optimise(Sense::Minimise);
    model.set_option("output_flag", settings.verbose);
    model.set_option("log_to_console", settings.verbose);
    if let Some(limit) = settings.time_limit_secs {
        model.set_option("time_limit", limit);
    }
    if let Some(gap) = settings.mip_gap {
        model.set_option("mip_rel_gap", gap);
    }
    if let Some(threads) = settings.threads {
        model.set_option("threads", threads);
    }
    for (key, value) in &settings.options {
        match value {
            OptionValue::Bool(b) => model.set_option(key.as_str(), *b),
            OptionValue::Int(i) => model.set_option(key.as_str(), *i),
            OptionValue::Float(f) => model.set_option(key.as_str(), *f),
            OptionValue::Str(s) => model.set_option(key.as_str(), s.as_str()),
        }
    }

    let solved = model.solve();
    match solved.status() {
        HighsModelStatus::Optimal => {
            let solution = solved.get_solution();
            let values: Vec<f64> = solution.columns().to_vec();
            let objective_value = objective.evaluate(&values);
            Ok(RawSolution {
                values,
                objective: objective_value,
            })
        }
        status => Err(classify_status(format!("{status:?}"))),
    }
}

#[cfg(not(feature = "solver-highs"))]
fn solve_highs(
    _registry: &SymbolRegistry,
    _constraints: &[ConstraintRow],
    _objective: &LinExpr,
    _settings: &SolverSettings,
) -> SdomResult<RawSolution> {
    Err(SdomError::Config(
        "built without the 'solver-highs' feature; no MILP backend available".into(),
    ))
}

/// Map a non-optimal termination status onto the error taxonomy.
fn classify_status(status: String) -> SdomError {
    if status == "Infeasible" {
        SdomError::Infeasible(status)
    } else if status.contains("Unbounded") {
        SdomError::Unbounded(status)
    } else if status.contains("TimeLimit") || status.contains("Timeout") {
        SdomError::Timeout(status)
    } else {
        SdomError::Solver(format!("solver stopped with status {status}"))
    }
}
