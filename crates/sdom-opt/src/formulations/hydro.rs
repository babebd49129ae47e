//! Hydro axis: run-of-river profile vs. budget-constrained dispatch.

use sdom_core::{HydroBudget, HydroVariant};

use crate::expr::{ConstraintRow, LinExpr};
use crate::registry::{SymbolRegistry, VarKind};

use super::SubFormulation;

/// Hydro follows its activated profile exactly; no dispatch freedom.
#[derive(Debug)]
pub struct RunOfRiver;

impl SubFormulation for RunOfRiver {
    fn id(&self) -> &'static str {
        "hydro-run-of-river"
    }

    fn declare_variables(&self, _registry: &mut SymbolRegistry) {}

    fn emit_constraints(&self, _registry: &SymbolRegistry, _constraints: &mut Vec<ConstraintRow>) {}

    fn balance_terms(&self, registry: &SymbolRegistry, hour: usize) -> LinExpr {
        LinExpr::constant(registry.alpha_hydro() * registry.bundle().hydro_mw[hour])
    }
}

/// Hydro dispatch bounded hourly and pinned to a per-period energy budget.
///
/// Monthly and daily budgets differ only in how the horizon is partitioned;
/// the periodization is precomputed in the input bundle.
#[derive(Debug)]
pub struct BudgetHydro {
    variant: HydroVariant,
    budget: HydroBudget,
}

impl BudgetHydro {
    pub fn new(variant: HydroVariant, budget: HydroBudget) -> Self {
        Self { variant, budget }
    }
}

impl SubFormulation for BudgetHydro {
    fn id(&self) -> &'static str {
        match self.variant {
            HydroVariant::MonthlyBudget => "hydro-monthly-budget",
            HydroVariant::DailyBudget => "hydro-daily-budget",
            HydroVariant::RunOfRiver => "hydro-run-of-river",
        }
    }

    fn declare_variables(&self, registry: &mut SymbolRegistry) {
        let alpha = registry.bundle().scalars.alpha_hydro;
        for h in 0..registry.horizon() {
            let id = registry.add_variable(
                format!("hydro_dispatch[{}]", h + 1),
                alpha * self.budget.min_mw[h],
                alpha * self.budget.max_mw[h],
                VarKind::Continuous,
            );
            registry.hydro_dispatch.push(id);
        }
    }

    fn emit_constraints(&self, registry: &SymbolRegistry, constraints: &mut Vec<ConstraintRow>) {
        let alpha = registry.alpha_hydro();
        for (b, (&(start, end), &budget)) in self
            .budget
            .periods
            .iter()
            .zip(&self.budget.budget_mwh)
            .enumerate()
        {
            let mut expr = LinExpr::zero();
            for h in start..end {
                expr.add_term(registry.hydro_dispatch[h], 1.0);
            }
            constraints.push(ConstraintRow::equal(
                format!("hydro_budget[{}]", b + 1),
                expr,
                alpha * budget,
            ));
        }
    }

    fn balance_terms(&self, registry: &SymbolRegistry, hour: usize) -> LinExpr {
        LinExpr::from(registry.hydro_dispatch[hour])
    }
}
