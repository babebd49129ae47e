//! Pluggable sub-formulations.
//!
//! Each axis of the model that admits alternatives — how hydro is treated,
//! whether trade is modeled — is a [`SubFormulation`] value selected by name
//! from the case's formulation map. A variant contributes extra variables,
//! extra constraints, objective terms, and its hour-by-hour binding into the
//! common supply balance. At most one variant per axis is composed into a
//! model.
//!
//! The resilience axis is different in kind: enabling it changes the solve
//! into the two-stage design/operation workflow rather than adding a block
//! to the common build, so its machinery lives in [`resilience`] and is
//! driven by the solve orchestrator.

mod hydro;
pub mod resilience;
mod trade;

pub use hydro::{BudgetHydro, RunOfRiver};
pub use trade::{PriceNetLoad, TradeDisabled};

use sdom_core::{InputBundle, SdomError, SdomResult};

use crate::expr::{ConstraintRow, LinExpr};
use crate::registry::SymbolRegistry;

/// One variant of a pluggable model axis.
pub trait SubFormulation: std::fmt::Debug {
    /// Stable variant identifier, e.g. `hydro-monthly-budget`.
    fn id(&self) -> &'static str;

    /// Extra decision variables this variant introduces.
    fn declare_variables(&self, registry: &mut SymbolRegistry);

    /// Variant-specific constraints.
    fn emit_constraints(&self, registry: &SymbolRegistry, constraints: &mut Vec<ConstraintRow>);

    /// Named annual cost terms for the objective and its decomposition.
    fn cost_terms(&self, _registry: &SymbolRegistry) -> Vec<(String, LinExpr)> {
        Vec::new()
    }

    /// Total objective contribution; the sum of [`Self::cost_terms`].
    fn objective_terms(&self, registry: &SymbolRegistry) -> LinExpr {
        self.cost_terms(registry)
            .into_iter()
            .fold(LinExpr::zero(), |acc, (_, term)| acc + term)
    }

    /// Contribution to the supply side of the hourly balance (signed:
    /// exports enter negatively).
    fn balance_terms(&self, registry: &SymbolRegistry, hour: usize) -> LinExpr;
}

/// The composed variant selection for one model instance.
#[derive(Debug)]
pub struct FormulationSet {
    pub hydro: Box<dyn SubFormulation>,
    pub trade: Box<dyn SubFormulation>,
}

/// Pick the variants named by the bundle's formulation map.
pub fn select(bundle: &InputBundle) -> SdomResult<FormulationSet> {
    let choices = &bundle.formulations;
    let hydro: Box<dyn SubFormulation> = if choices.hydro.uses_budget() {
        let budget = bundle.hydro_budget.clone().ok_or_else(|| {
            SdomError::Config("budget hydro selected but no hydro envelope loaded".into())
        })?;
        Box::new(BudgetHydro::new(choices.hydro, budget))
    } else {
        Box::new(RunOfRiver)
    };

    let trade: Box<dyn SubFormulation> = if choices.trade_enabled() {
        let series = bundle.trade.clone().ok_or_else(|| {
            SdomError::Config("trade enabled but no trade series loaded".into())
        })?;
        Box::new(PriceNetLoad::new(
            choices.imports_enabled(),
            choices.exports_enabled(),
            series,
        ))
    } else {
        Box::new(TradeDisabled)
    };

    Ok(FormulationSet { hydro, trade })
}
