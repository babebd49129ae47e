//! Solve orchestration: single-shot and two-stage resilience workflows.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use sdom_core::{SdomError, SdomResult};

use crate::backend::{self, RawSolution, SolverSettings};
use crate::constraints::balancing_fleet_cap;
use crate::expr::{ConstraintRow, LinExpr};
use crate::formulations::resilience::{self, OutageWindow, StorageSizing};
use crate::model::SdomModel;
use crate::registry::SymbolRegistry;
use crate::results::{extract_results, ProblemStatistics, RunResults};

/// Mapped solver termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimeLimit,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::TimeLimit => write!(f, "time_limit"),
        }
    }
}

/// Outcome of one solver invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub solve_time_ms: u128,
    pub statistics: ProblemStatistics,
    /// Whether a feasible incumbent accompanies a non-optimal stop. The
    /// backend does not expose incumbents, so this is currently always
    /// false.
    pub incumbent_available: bool,
    pub message: Option<String>,
}

/// Outcome of a full solve workflow.
#[derive(Debug)]
pub struct SolveOutcome {
    /// Report of the resilience design stage, when one ran.
    pub design_report: Option<SolveReport>,
    /// Report of the (final) operation solve.
    pub report: SolveReport,
    /// Extracted results; absent unless the final solve was optimal.
    pub results: Option<RunResults>,
}

/// Solve the model, blocking until the solver returns.
pub fn solve(model: &mut SdomModel, settings: &SolverSettings) -> SdomResult<SolveOutcome> {
    if model.resilience {
        solve_two_stage(model, settings)
    } else {
        solve_single_stage(model, settings)
    }
}

fn solve_single_stage(
    model: &mut SdomModel,
    settings: &SolverSettings,
) -> SdomResult<SolveOutcome> {
    let mut rows = model.constraints.clone();
    if let Some(cap) = balancing_fleet_cap(&model.registry) {
        rows.push(cap);
    }
    let (report, raw) = attempt("dispatch", &model.registry, &rows, &model.objective, settings)?;
    let results = raw.map(|raw| extract_results(model, &raw, report.statistics));
    Ok(SolveOutcome {
        design_report: None,
        report,
        results,
    })
}

fn solve_two_stage(model: &mut SdomModel, settings: &SolverSettings) -> SdomResult<SolveOutcome> {
    let params = model
        .registry
        .bundle()
        .resilience
        .clone()
        .ok_or_else(|| SdomError::Config("resilience scalars missing".into()))?;
    let (start, end) = params.outage_window(model.registry.horizon())?;
    let window = OutageWindow { start, end };

    // Stage A: size storage to ride through the outage on its own.
    resilience::apply_design_stage(&mut model.registry, &params, &window);
    let design_rows = resilience::design_stage_constraints(&model.registry, &params, &window);
    let (design_report, design_raw) = attempt(
        "resilience design",
        &model.registry,
        &design_rows,
        &model.objective,
        settings,
    )?;
    let Some(design_raw) = design_raw else {
        return Ok(SolveOutcome {
            report: design_report.clone(),
            design_report: Some(design_report),
            results: None,
        });
    };

    let pick = |ids: &[crate::expr::VarId]| -> Vec<f64> {
        ids.iter().map(|&id| design_raw.values[id.index()]).collect()
    };
    let sizing = StorageSizing {
        charge_power_mw: pick(&model.registry.charge_power),
        discharge_power_mw: pick(&model.registry.discharge_power),
        energy_mwh: pick(&model.registry.energy_capacity),
    };
    info!(
        energy_mwh = sizing.energy_mwh.iter().sum::<f64>(),
        discharge_mw = sizing.discharge_power_mw.iter().sum::<f64>(),
        "design stage sized the storage fleet"
    );

    // Stage B: full-year co-optimization with the sizings as floors.
    resilience::apply_operation_stage(&mut model.registry, &window, &sizing);
    model.rebuild_constraints();
    let mut rows = model.constraints.clone();
    rows.extend(resilience::operation_reserve_constraints(
        &model.registry,
        &params,
        &window,
    ));
    let (report, raw) = attempt("operation", &model.registry, &rows, &model.objective, settings)?;
    let results = raw.map(|raw| extract_results(model, &raw, report.statistics));
    Ok(SolveOutcome {
        design_report: Some(design_report),
        report,
        results,
    })
}

/// Run one solver invocation and fold non-optimal termination into the
/// report. Genuine solver failures (missing backend, crash) propagate as
/// errors.
fn attempt(
    stage: &str,
    registry: &SymbolRegistry,
    rows: &[ConstraintRow],
    objective: &LinExpr,
    settings: &SolverSettings,
) -> SdomResult<(SolveReport, Option<RawSolution>)> {
    let statistics = ProblemStatistics {
        variables: registry.num_variables(),
        binaries: registry.num_binaries(),
        constraints: rows.len(),
    };
    let start = Instant::now();
    let outcome = backend::solve_lowered(registry, rows, objective, settings);
    let solve_time_ms = start.elapsed().as_millis();

    let report = |status, objective, message| SolveReport {
        status,
        objective,
        solve_time_ms,
        statistics,
        incumbent_available: false,
        message,
    };

    match outcome {
        Ok(raw) => {
            info!(
                stage,
                objective = raw.objective,
                solve_time_ms = solve_time_ms as u64,
                variables = statistics.variables,
                binaries = statistics.binaries,
                constraints = statistics.constraints,
                "solve finished"
            );
            let objective = raw.objective;
            Ok((
                report(SolveStatus::Optimal, Some(objective), None),
                Some(raw),
            ))
        }
        Err(SdomError::Infeasible(msg)) => {
            info!(stage, "solver reported infeasible");
            Ok((report(SolveStatus::Infeasible, None, Some(msg)), None))
        }
        Err(SdomError::Unbounded(msg)) => {
            info!(stage, "solver reported unbounded");
            Ok((report(SolveStatus::Unbounded, None, Some(msg)), None))
        }
        Err(SdomError::Timeout(msg)) => {
            info!(stage, "solver hit its time limit");
            Ok((report(SolveStatus::TimeLimit, None, Some(msg)), None))
        }
        Err(other) => Err(other),
    }
}
