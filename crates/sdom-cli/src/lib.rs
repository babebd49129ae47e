//! # sdom-cli: case-level entry points for the storage deployment model
//!
//! The only crate that couples the I/O layer to the formulation layer. The
//! three library entry points mirror the model's lifecycle: build from a
//! case directory, solve, export.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use sdom_core::SdomResult;
use sdom_opt::{ModelOptions, RunResults, SdomModel, SolveOutcome, SolverSettings};

/// How to read and name a case.
#[derive(Debug, Clone)]
pub struct CaseOptions {
    /// Number of chronological hours to model.
    pub horizon: usize,
    /// Run the two-stage resilience workflow.
    pub resilience: bool,
    /// Case name stamped into output file names.
    pub name: String,
}

/// Load a case directory and assemble a model from it.
pub fn build_case_model(case_dir: &Path, options: &CaseOptions) -> SdomResult<SdomModel> {
    let bundle = sdom_io::load_case(case_dir, options.horizon, options.resilience)?;
    sdom_opt::build_model(
        Arc::new(bundle),
        ModelOptions {
            name: options.name.clone(),
            resilience: options.resilience,
        },
    )
}

/// Solve a built model. Blocks until the solver returns.
pub fn solve_model(model: &mut SdomModel, settings: &SolverSettings) -> SdomResult<SolveOutcome> {
    sdom_opt::solve(model, settings)
}

/// Write the result tables into `out_dir`.
pub fn export_results(results: &RunResults, out_dir: &Path) -> SdomResult<()> {
    results.export_csv(out_dir)?;
    info!(out_dir = %out_dir.display(), case = %results.name, "results exported");
    Ok(())
}

/// Build, solve and (on an optimal finish) export a case in one call.
pub fn run_case(
    case_dir: &Path,
    options: &CaseOptions,
    settings: &SolverSettings,
    out_dir: &Path,
) -> SdomResult<SolveOutcome> {
    let mut model = build_case_model(case_dir, options)?;
    let outcome = solve_model(&mut model, settings)?;
    if let Some(results) = &outcome.results {
        export_results(results, out_dir)?;
    }
    Ok(outcome)
}
