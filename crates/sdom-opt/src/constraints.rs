//! System constraint assembly.
//!
//! Emission follows set-iteration order throughout so constraint indices,
//! and therefore solver logs, are reproducible for a given input.

use crate::expr::{ConstraintRow, LinExpr};
use crate::formulations::FormulationSet;
use crate::registry::SymbolRegistry;

/// Emit the default (full-year) constraint list.
pub fn emit_system_constraints(
    registry: &SymbolRegistry,
    formulations: &FormulationSet,
) -> Vec<ConstraintRow> {
    let bundle = registry.bundle();
    let horizon = registry.horizon();
    let mut rows = Vec::new();

    // Hourly supply/demand balance. Curtailment is absent on purpose: it is
    // absorbed by the per-technology VRE balances below.
    for h in 0..horizon {
        let mut expr = LinExpr::constant(registry.fixed_clean_supply(h));
        expr += formulations.hydro.balance_terms(registry, h);
        expr.add_term(registry.pv_generation[h], 1.0);
        expr.add_term(registry.wind_generation[h], 1.0);
        for dispatch in &registry.balancing_dispatch {
            expr.add_term(dispatch[h], 1.0);
        }
        for j in 0..bundle.storage.len() {
            expr.add_term(registry.discharge[j][h], 1.0);
            expr.add_term(registry.charge[j][h], -1.0);
        }
        expr += formulations.trade.balance_terms(registry, h);
        rows.push(ConstraintRow::equal(
            format!("supply_balance[{}]", h + 1),
            expr,
            registry.demand(h),
        ));
    }

    // Clean-energy share: balancing energy is capped against net-adjusted
    // demand (demand plus charging minus discharging).
    let non_clean_share = 1.0 - registry.clean_share_target();
    let mut clean = LinExpr::zero();
    let mut total_demand = 0.0;
    for h in 0..horizon {
        total_demand += registry.demand(h);
        for dispatch in &registry.balancing_dispatch {
            clean.add_term(dispatch[h], 1.0);
        }
        for j in 0..bundle.storage.len() {
            clean.add_term(registry.charge[j][h], -non_clean_share);
            clean.add_term(registry.discharge[j][h], non_clean_share);
        }
    }
    rows.push(ConstraintRow::less_eq(
        "clean_share_cap",
        clean,
        non_clean_share * total_demand,
    ));

    // Per-technology VRE balance: generation plus curtailment equals the
    // built availability.
    for h in 0..horizon {
        let mut pv = LinExpr::from(registry.pv_generation[h]);
        pv.add_term(registry.pv_curtailment[h], 1.0);
        for (plant, &build) in bundle.pv_plants.iter().zip(&registry.pv_build) {
            pv.add_term(build, -plant.available_mw(h));
        }
        rows.push(ConstraintRow::equal(
            format!("pv_balance[{}]", h + 1),
            pv,
            0.0,
        ));

        let mut wind = LinExpr::from(registry.wind_generation[h]);
        wind.add_term(registry.wind_curtailment[h], 1.0);
        for (plant, &build) in bundle.wind_plants.iter().zip(&registry.wind_build) {
            wind.add_term(build, -plant.available_mw(h));
        }
        rows.push(ConstraintRow::equal(
            format!("wind_balance[{}]", h + 1),
            wind,
            0.0,
        ));
    }

    // Balancing units dispatch within their installed capacity.
    for (k, unit) in bundle.balancing.iter().enumerate() {
        for h in 0..horizon {
            let mut expr = LinExpr::from(registry.balancing_dispatch[k][h]);
            expr.add_term(registry.balancing_capacity[k], -1.0);
            rows.push(ConstraintRow::less_eq(
                format!("balancing_limit[{},{}]", unit.id, h + 1),
                expr,
                0.0,
            ));
        }
    }

    // Storage operating envelope.
    for (j, tech) in bundle.storage.iter().enumerate() {
        let eta = tech.one_way_efficiency();
        for h in 0..horizon {
            let mut charge_limit = LinExpr::from(registry.charge[j][h]);
            charge_limit.add_term(registry.charge_power[j], -1.0);
            rows.push(ConstraintRow::less_eq(
                format!("charge_limit[{},{}]", tech.id, h + 1),
                charge_limit,
                0.0,
            ));

            let mut discharge_limit = LinExpr::from(registry.discharge[j][h]);
            discharge_limit.add_term(registry.discharge_power[j], -1.0);
            rows.push(ConstraintRow::less_eq(
                format!("discharge_limit[{},{}]", tech.id, h + 1),
                discharge_limit,
                0.0,
            ));

            // Charge-xor-discharge through the hourly indicator, with the
            // technology's power ceiling as a tight big-M.
            let mut charge_gate = LinExpr::from(registry.charge[j][h]);
            charge_gate.add_term(registry.charge_indicator[j][h], -tech.max_power_mw);
            rows.push(ConstraintRow::less_eq(
                format!("charge_gate[{},{}]", tech.id, h + 1),
                charge_gate,
                0.0,
            ));
            let mut discharge_gate = LinExpr::from(registry.discharge[j][h]);
            discharge_gate.add_term(registry.charge_indicator[j][h], tech.max_power_mw);
            rows.push(ConstraintRow::less_eq(
                format!("discharge_gate[{},{}]", tech.id, h + 1),
                discharge_gate,
                tech.max_power_mw,
            ));

            // Cyclic state of charge: hour 1 wraps to the final hour. No
            // initial-SOC variable exists, and h = 1 is not special-cased.
            let previous = (h + horizon - 1) % horizon;
            let mut soc = LinExpr::from(registry.soc[j][h]);
            soc.add_term(registry.soc[j][previous], -1.0);
            soc.add_term(registry.charge[j][h], -eta);
            soc.add_term(registry.discharge[j][h], 1.0 / eta);
            rows.push(ConstraintRow::equal(
                format!("soc[{},{}]", tech.id, h + 1),
                soc,
                0.0,
            ));

            let mut cap = LinExpr::from(registry.soc[j][h]);
            cap.add_term(registry.energy_capacity[j], -1.0);
            rows.push(ConstraintRow::less_eq(
                format!("soc_capacity[{},{}]", tech.id, h + 1),
                cap,
                0.0,
            ));
        }

        // Duration window, measured against discharge power corrected for
        // one-way efficiency.
        let mut dur_min = LinExpr::term(registry.discharge_power[j], tech.min_duration_hours / eta);
        dur_min.add_term(registry.energy_capacity[j], -1.0);
        rows.push(ConstraintRow::less_eq(
            format!("duration_min[{}]", tech.id),
            dur_min,
            0.0,
        ));
        let mut dur_max = LinExpr::from(registry.energy_capacity[j]);
        dur_max.add_term(registry.discharge_power[j], -tech.max_duration_hours / eta);
        rows.push(ConstraintRow::less_eq(
            format!("duration_max[{}]", tech.id),
            dur_max,
            0.0,
        ));

        // Annualized cycle cap on discharged energy.
        if let Some(cycles) = tech.cycles_per_year() {
            let mut cycle = LinExpr::zero();
            for &discharge in &registry.discharge[j] {
                cycle.add_term(discharge, 1.0);
            }
            cycle.add_term(registry.energy_capacity[j], -cycles);
            rows.push(ConstraintRow::less_eq(
                format!("cycle_cap[{}]", tech.id),
                cycle,
                0.0,
            ));
        }

        if tech.coupled {
            let mut coupled = LinExpr::from(registry.charge_power[j]);
            coupled.add_term(registry.discharge_power[j], -1.0);
            rows.push(ConstraintRow::equal(
                format!("coupled_power[{}]", tech.id),
                coupled,
                0.0,
            ));
        }
    }

    formulations.hydro.emit_constraints(registry, &mut rows);
    formulations.trade.emit_constraints(registry, &mut rows);
    rows
}

/// Upper bound on the total balancing fleet: the peak residual demand after
/// the activated fixed clean sources. Applied in single-stage solves only.
pub fn balancing_fleet_cap(registry: &SymbolRegistry) -> Option<ConstraintRow> {
    if registry.balancing_capacity.is_empty() {
        return None;
    }
    let mut expr = LinExpr::zero();
    for &capacity in &registry.balancing_capacity {
        expr.add_term(capacity, 1.0);
    }
    Some(ConstraintRow::less_eq(
        "balancing_fleet_cap",
        expr,
        registry.bundle().peak_residual_demand(),
    ))
}
