//! Trade axis: disabled vs. price-driven trade gated by net-load sign.

use sdom_core::TradeSeries;

use crate::expr::{ConstraintRow, LinExpr};
use crate::registry::{SymbolRegistry, VarKind};

use super::SubFormulation;

/// Offset breaking the sign degeneracy of the net-load indicator at zero.
const SIGN_EPSILON: f64 = 1e-3;

/// No trade: imports and exports are identically zero and absent from the
/// model.
#[derive(Debug)]
pub struct TradeDisabled;

impl SubFormulation for TradeDisabled {
    fn id(&self) -> &'static str {
        "trade-disabled"
    }

    fn declare_variables(&self, _registry: &mut SymbolRegistry) {}

    fn emit_constraints(&self, _registry: &SymbolRegistry, _constraints: &mut Vec<ConstraintRow>) {}

    fn balance_terms(&self, _registry: &SymbolRegistry, _hour: usize) -> LinExpr {
        LinExpr::zero()
    }
}

/// Price-driven trade: imports are allowed only in hours of positive net
/// load, exports only in hours of VRE surplus, linked through one binary
/// sign indicator per hour.
#[derive(Debug)]
pub struct PriceNetLoad {
    imports_enabled: bool,
    exports_enabled: bool,
    series: TradeSeries,
}

impl PriceNetLoad {
    pub fn new(imports_enabled: bool, exports_enabled: bool, series: TradeSeries) -> Self {
        Self {
            imports_enabled,
            exports_enabled,
            series,
        }
    }

    /// Net load in the hour: demand minus every non-dispatchable clean
    /// source available, as an expression over the build fractions.
    fn net_load(&self, registry: &SymbolRegistry, hour: usize) -> LinExpr {
        let bundle = registry.bundle();
        let fixed = registry.demand(hour)
            - registry.fixed_clean_supply(hour)
            - registry.alpha_hydro() * bundle.hydro_mw[hour];
        LinExpr::constant(fixed) - registry.available_vre(hour)
    }

    /// Indicator big-M: the greater of peak demand and peak VRE
    /// availability. Loose values hurt relaxation tightness, not
    /// correctness.
    fn big_m(&self, registry: &SymbolRegistry) -> f64 {
        let bundle = registry.bundle();
        bundle.peak_demand().max(bundle.peak_vre_availability())
    }
}

impl SubFormulation for PriceNetLoad {
    fn id(&self) -> &'static str {
        "trade-price-net-load"
    }

    fn declare_variables(&self, registry: &mut SymbolRegistry) {
        let horizon = registry.horizon();
        if self.imports_enabled {
            for h in 0..horizon {
                let id = registry.add_variable(
                    format!("import[{}]", h + 1),
                    0.0,
                    self.series.import_cap_mw[h],
                    VarKind::Continuous,
                );
                registry.imports.push(id);
            }
        }
        if self.exports_enabled {
            for h in 0..horizon {
                let id = registry.add_variable(
                    format!("export[{}]", h + 1),
                    0.0,
                    self.series.export_cap_mw[h],
                    VarKind::Continuous,
                );
                registry.exports.push(id);
            }
        }
        for h in 0..horizon {
            let id = registry.add_variable(
                format!("net_load_sign[{}]", h + 1),
                0.0,
                1.0,
                VarKind::Binary,
            );
            registry.net_load_sign.push(id);
        }
    }

    fn emit_constraints(&self, registry: &SymbolRegistry, constraints: &mut Vec<ConstraintRow>) {
        let big_m = self.big_m(registry);
        let export_cap_max = self
            .series
            .export_cap_mw
            .iter()
            .copied()
            .fold(0.0, f64::max);

        for h in 0..registry.horizon() {
            let sign = registry.net_load_sign[h];
            let net_load = self.net_load(registry, h);

            // net load > 0 forces the indicator on
            let mut upper = net_load.clone();
            upper.add_term(sign, -big_m);
            constraints.push(ConstraintRow::less_eq(
                format!("net_load_sign_upper[{}]", h + 1),
                upper,
                0.0,
            ));

            // net load <= 0 (with the epsilon offset) forces it off
            let mut lower = -net_load;
            lower.add_term(sign, big_m);
            constraints.push(ConstraintRow::less_eq(
                format!("net_load_sign_lower[{}]", h + 1),
                lower,
                big_m - SIGN_EPSILON,
            ));

            if self.imports_enabled {
                let mut gate = LinExpr::from(registry.imports[h]);
                gate.add_term(sign, -registry.demand(h));
                constraints.push(ConstraintRow::less_eq(
                    format!("import_gate[{}]", h + 1),
                    gate,
                    0.0,
                ));
            }
            if self.exports_enabled {
                let mut gate = LinExpr::from(registry.exports[h]);
                gate.add_term(sign, export_cap_max);
                constraints.push(ConstraintRow::less_eq(
                    format!("export_gate[{}]", h + 1),
                    gate,
                    export_cap_max,
                ));
            }
        }
    }

    fn cost_terms(&self, registry: &SymbolRegistry) -> Vec<(String, LinExpr)> {
        let mut terms = Vec::new();
        if self.imports_enabled {
            let mut cost = LinExpr::zero();
            for (h, &var) in registry.imports.iter().enumerate() {
                cost.add_term(var, self.series.import_price[h]);
            }
            terms.push(("import_cost".to_string(), cost));
        }
        if self.exports_enabled {
            let mut revenue = LinExpr::zero();
            for (h, &var) in registry.exports.iter().enumerate() {
                revenue.add_term(var, -self.series.export_price[h]);
            }
            terms.push(("export_revenue".to_string(), revenue));
        }
        terms
    }

    fn balance_terms(&self, registry: &SymbolRegistry, hour: usize) -> LinExpr {
        let mut expr = LinExpr::zero();
        if self.imports_enabled {
            expr.add_term(registry.imports[hour], 1.0);
        }
        if self.exports_enabled {
            expr.add_term(registry.exports[hour], -1.0);
        }
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::test_bundle;

    fn series(horizon: usize) -> TradeSeries {
        TradeSeries {
            import_cap_mw: vec![500.0; horizon],
            import_price: vec![30.0; horizon],
            export_cap_mw: vec![400.0; horizon],
            export_price: vec![20.0; horizon],
        }
    }

    #[test]
    fn test_declares_gated_variables() {
        let mut reg = SymbolRegistry::new(test_bundle(4));
        let form = PriceNetLoad::new(true, false, series(4));
        form.declare_variables(&mut reg);
        assert_eq!(reg.imports.len(), 4);
        assert!(reg.exports.is_empty());
        assert_eq!(reg.net_load_sign.len(), 4);
        assert_eq!(reg.var(reg.imports[0]).upper, 500.0);
    }

    #[test]
    fn test_indicator_rows_per_hour() {
        let mut reg = SymbolRegistry::new(test_bundle(4));
        let form = PriceNetLoad::new(true, true, series(4));
        form.declare_variables(&mut reg);
        let mut rows = Vec::new();
        form.emit_constraints(&reg, &mut rows);
        // two sign rows + one gate per direction, per hour
        assert_eq!(rows.len(), 4 * 4);
    }

    #[test]
    fn test_objective_prices_both_directions() {
        let mut reg = SymbolRegistry::new(test_bundle(4));
        let form = PriceNetLoad::new(true, true, series(4));
        form.declare_variables(&mut reg);
        let terms = form.cost_terms(&reg);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].0, "import_cost");
        assert!(terms[1].1.terms.iter().all(|&(_, c)| c < 0.0));
    }

    #[test]
    fn test_disabled_contributes_nothing() {
        let reg = SymbolRegistry::new(test_bundle(4));
        assert!(TradeDisabled.balance_terms(&reg, 0).is_empty());
        assert!(TradeDisabled.objective_terms(&reg).is_empty());
    }
}
