//! # sdom-opt: the formulation layer of the storage deployment model
//!
//! Builds and solves the least-cost portfolio/dispatch MILP: variable
//! renewables, dispatchable balancing units and multiple storage
//! technologies jointly serving an hourly demand profile under a
//! clean-energy share target, with optional two-stage resilience sizing.
//!
//! ## Architecture
//!
//! The model is data all the way down, solved through one backend boundary:
//!
//! | Piece | Role |
//! |-------|------|
//! | [`registry::SymbolRegistry`] | Declares every set, parameter and variable with domain and bounds |
//! | [`formulations::SubFormulation`] | Pluggable hydro/trade variants contributing variables, constraints and objective terms |
//! | [`objective`] / [`constraints`] | Pure builders reading the registry and appending rows |
//! | [`solve`] | Single-shot or two-stage orchestration over the solver backend |
//! | [`results`] | Primal values into tabular views and a cost decomposition |
//!
//! Constraint builders never reach past the registry to raw input, which
//! keeps them pure and makes golden-model comparisons
//! ([`model::SdomModel::write_lp_debug`]) cheap.

pub mod backend;
pub mod constraints;
pub mod expr;
mod export;
pub mod formulations;
pub mod model;
pub mod objective;
pub mod registry;
pub mod results;
pub mod solve;

pub use backend::{OptionValue, SolverSettings};
pub use model::{build_model, ModelOptions, SdomModel};
pub use results::{ProblemStatistics, RunResults};
pub use solve::{solve, SolveOutcome, SolveReport, SolveStatus};
