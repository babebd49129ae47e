//! Annualized-cost objective assembly.
//!
//! The objective is built as a list of named terms so that the result
//! extractor can report a cost decomposition that sums to the optimal
//! objective by construction.

use crate::expr::LinExpr;
use crate::formulations::FormulationSet;
use crate::registry::SymbolRegistry;

/// Named annual cost terms, in deterministic emission order.
pub fn cost_terms(
    registry: &SymbolRegistry,
    formulations: &FormulationSet,
) -> Vec<(String, LinExpr)> {
    let bundle = registry.bundle();
    let factors = &bundle.factors;
    let mut terms = Vec::new();

    // VRE investment: a continuous fraction of each plant's maximum build.
    // Plant CAPEX and its transmission CAPEX annualize together under the
    // shared VRE recovery factor.
    for (label, plants, build) in [
        ("pv", &bundle.pv_plants, &registry.pv_build),
        ("wind", &bundle.wind_plants, &registry.wind_build),
    ] {
        let mut capex = LinExpr::zero();
        let mut fom = LinExpr::zero();
        for (plant, &var) in plants.iter().zip(build.iter()) {
            let invested = plant.capex_per_mw * plant.capacity_mw + plant.transmission_capex;
            capex.add_term(var, factors.crf_vre * invested);
            fom.add_term(var, plant.fom_per_mw_yr * plant.capacity_mw);
        }
        terms.push((format!("{label}_capex"), capex));
        terms.push((format!("{label}_fom"), fom));
    }

    let mut bal_capex = LinExpr::zero();
    let mut bal_fom = LinExpr::zero();
    let mut bal_fuel = LinExpr::zero();
    let mut bal_vom = LinExpr::zero();
    for (k, unit) in bundle.balancing.iter().enumerate() {
        let capacity = registry.balancing_capacity[k];
        bal_capex.add_term(capacity, factors.crf_balancing[k] * unit.capex_per_mw);
        bal_fom.add_term(capacity, unit.fom_per_mw_yr);
        for &dispatch in &registry.balancing_dispatch[k] {
            bal_fuel.add_term(dispatch, unit.heat_rate * unit.fuel_cost);
            bal_vom.add_term(dispatch, unit.vom_per_mwh);
        }
    }
    terms.push(("balancing_capex".to_string(), bal_capex));
    terms.push(("balancing_fom".to_string(), bal_fom));
    terms.push(("balancing_fuel".to_string(), bal_fuel));
    terms.push(("balancing_vom".to_string(), bal_vom));

    // Storage power cost splits by the cost ratio: the charge side carries
    // the ratio fraction, the discharge side the rest. VOM is charged on
    // discharge only.
    for (j, tech) in bundle.storage.iter().enumerate() {
        let crf = factors.crf_storage[j];
        let charge_share = tech.cost_ratio;
        let discharge_share = 1.0 - tech.cost_ratio;

        let mut power_capex = LinExpr::zero();
        power_capex.add_term(
            registry.charge_power[j],
            crf * tech.power_capex_per_mw * charge_share,
        );
        power_capex.add_term(
            registry.discharge_power[j],
            crf * tech.power_capex_per_mw * discharge_share,
        );
        terms.push((format!("storage_power_capex[{}]", tech.id), power_capex));

        terms.push((
            format!("storage_energy_capex[{}]", tech.id),
            LinExpr::term(registry.energy_capacity[j], crf * tech.energy_capex_per_mwh),
        ));

        let mut fom = LinExpr::zero();
        fom.add_term(registry.charge_power[j], tech.fom_per_mw_yr * charge_share);
        fom.add_term(
            registry.discharge_power[j],
            tech.fom_per_mw_yr * discharge_share,
        );
        terms.push((format!("storage_fom[{}]", tech.id), fom));

        let mut vom = LinExpr::zero();
        for &discharge in &registry.discharge[j] {
            vom.add_term(discharge, tech.vom_per_mwh);
        }
        terms.push((format!("storage_vom[{}]", tech.id), vom));
    }

    terms.extend(formulations.hydro.cost_terms(registry));
    terms.extend(formulations.trade.cost_terms(registry));
    terms
}

/// The complete minimization objective.
pub fn assemble_objective(registry: &SymbolRegistry, formulations: &FormulationSet) -> LinExpr {
    cost_terms(registry, formulations)
        .into_iter()
        .fold(LinExpr::zero(), |acc, (_, term)| acc + term)
}
