//! Resilience axis: the two-stage design/operation machinery.
//!
//! Stage A ("design") sizes the storage fleet so that it alone rides through
//! a constant critical load over a fixed outage window. Stage B
//! ("operation") re-solves the full year with the stage-A sizings held as
//! lower bounds, balancing generation banned inside the window, and a
//! rolling state-of-charge reserve armed outside it.
//!
//! Stage A is an outage-window problem: state of charge starts full at the
//! window head (the cyclic wrap is a full-year construct and has no meaning
//! when every source is disabled), and all non-window dispatch is fixed to
//! zero.

use sdom_core::ResilienceParams;

use crate::expr::{ConstraintRow, LinExpr};
use crate::registry::{StageOverrides, SymbolRegistry};

/// Outage window as 0-based hour indices `[start, end)`.
#[derive(Debug, Clone, Copy)]
pub struct OutageWindow {
    pub start: usize,
    pub end: usize,
}

impl OutageWindow {
    pub fn contains(&self, hour: usize) -> bool {
        (self.start..self.end).contains(&hour)
    }

    pub fn hours(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Storage sizings carried from the design stage into the operation stage.
#[derive(Debug, Clone)]
pub struct StorageSizing {
    pub charge_power_mw: Vec<f64>,
    pub discharge_power_mw: Vec<f64>,
    pub energy_mwh: Vec<f64>,
}

/// Re-bound and re-parameterize the registry for the design stage.
///
/// Balancing units, VRE builds, hydro and trade are all disabled; the fixed
/// clean activations and the clean-share target are zeroed; demand becomes
/// the constant critical load inside the window and zero outside it.
pub fn apply_design_stage(
    registry: &mut SymbolRegistry,
    params: &ResilienceParams,
    window: &OutageWindow,
) {
    let horizon = registry.horizon();

    for id in registry
        .pv_build
        .iter()
        .chain(&registry.wind_build)
        .chain(&registry.balancing_capacity)
        .chain(&registry.hydro_dispatch)
        .chain(&registry.imports)
        .chain(&registry.exports)
        .chain(&registry.net_load_sign)
        .copied()
        .collect::<Vec<_>>()
    {
        registry.fix(id, 0.0);
    }
    for dispatch in registry.balancing_dispatch.clone() {
        for id in dispatch {
            registry.fix(id, 0.0);
        }
    }
    let mut idle_hours = Vec::new();
    for j in 0..registry.charge.len() {
        for h in 0..horizon {
            if !window.contains(h) {
                idle_hours.extend([
                    registry.charge[j][h],
                    registry.discharge[j][h],
                    registry.soc[j][h],
                    registry.charge_indicator[j][h],
                ]);
            }
        }
    }
    for id in idle_hours {
        registry.fix(id, 0.0);
    }

    let mut demand = vec![0.0; horizon];
    for h in window.hours() {
        demand[h] = params.critical_peak_load_mw;
    }
    registry.set_overrides(StageOverrides {
        demand: Some(demand),
        alpha_nuclear: Some(0.0),
        alpha_hydro: Some(0.0),
        alpha_other: Some(0.0),
        clean_share_target: Some(0.0),
    });
}

/// Emit the design-stage constraint list.
pub fn design_stage_constraints(
    registry: &SymbolRegistry,
    params: &ResilienceParams,
    window: &OutageWindow,
) -> Vec<ConstraintRow> {
    let bundle = registry.bundle();
    let l_crit = params.critical_peak_load_mw;
    let mut rows = Vec::new();

    // Critical load is served by discharge alone; charging has no source.
    for h in window.hours() {
        let mut expr = LinExpr::zero();
        for j in 0..bundle.storage.len() {
            expr.add_term(registry.discharge[j][h], 1.0);
            expr.add_term(registry.charge[j][h], -1.0);
        }
        rows.push(ConstraintRow::equal(
            format!("outage_balance[{}]", h + 1),
            expr,
            l_crit,
        ));
    }

    for (j, tech) in bundle.storage.iter().enumerate() {
        let eta = tech.one_way_efficiency();
        for h in window.hours() {
            // SOC recursion, starting from a full store at the window head.
            let mut soc = LinExpr::from(registry.soc[j][h]);
            if h == window.start {
                soc.add_term(registry.energy_capacity[j], -1.0);
            } else {
                soc.add_term(registry.soc[j][h - 1], -1.0);
            }
            soc.add_term(registry.charge[j][h], -eta);
            soc.add_term(registry.discharge[j][h], 1.0 / eta);
            rows.push(ConstraintRow::equal(
                format!("outage_soc[{},{}]", tech.id, h + 1),
                soc,
                0.0,
            ));

            let mut cap = LinExpr::from(registry.soc[j][h]);
            cap.add_term(registry.energy_capacity[j], -1.0);
            rows.push(ConstraintRow::less_eq(
                format!("outage_soc_capacity[{},{}]", tech.id, h + 1),
                cap,
                0.0,
            ));

            let mut charge_limit = LinExpr::from(registry.charge[j][h]);
            charge_limit.add_term(registry.charge_power[j], -1.0);
            rows.push(ConstraintRow::less_eq(
                format!("outage_charge_limit[{},{}]", tech.id, h + 1),
                charge_limit,
                0.0,
            ));
            let mut discharge_limit = LinExpr::from(registry.discharge[j][h]);
            discharge_limit.add_term(registry.discharge_power[j], -1.0);
            rows.push(ConstraintRow::less_eq(
                format!("outage_discharge_limit[{},{}]", tech.id, h + 1),
                discharge_limit,
                0.0,
            ));

            let mut charge_gate = LinExpr::from(registry.charge[j][h]);
            charge_gate.add_term(registry.charge_indicator[j][h], -tech.max_power_mw);
            rows.push(ConstraintRow::less_eq(
                format!("outage_charge_gate[{},{}]", tech.id, h + 1),
                charge_gate,
                0.0,
            ));
            let mut discharge_gate = LinExpr::from(registry.discharge[j][h]);
            discharge_gate.add_term(registry.charge_indicator[j][h], tech.max_power_mw);
            rows.push(ConstraintRow::less_eq(
                format!("outage_discharge_gate[{},{}]", tech.id, h + 1),
                discharge_gate,
                tech.max_power_mw,
            ));
        }

        let sqrt_eta = tech.one_way_efficiency();
        let mut dur_min = LinExpr::term(
            registry.discharge_power[j],
            tech.min_duration_hours / sqrt_eta,
        );
        dur_min.add_term(registry.energy_capacity[j], -1.0);
        rows.push(ConstraintRow::less_eq(
            format!("duration_min[{}]", tech.id),
            dur_min,
            0.0,
        ));
        let mut dur_max = LinExpr::from(registry.energy_capacity[j]);
        dur_max.add_term(
            registry.discharge_power[j],
            -tech.max_duration_hours / sqrt_eta,
        );
        rows.push(ConstraintRow::less_eq(
            format!("duration_max[{}]", tech.id),
            dur_max,
            0.0,
        ));

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

    // Efficiency-adjusted stored energy must cover the critical load still
    // ahead in the window.
    for h in window.hours() {
        let mut expr = LinExpr::zero();
        for (j, tech) in bundle.storage.iter().enumerate() {
            expr.add_term(registry.soc[j][h], tech.one_way_efficiency());
        }
        let remaining_hours = (window.end - 1 - h) as f64;
        rows.push(ConstraintRow::greater_eq(
            format!("backup_energy[{}]", h + 1),
            expr,
            l_crit * remaining_hours,
        ));
    }

    let mut power = LinExpr::zero();
    for &id in &registry.discharge_power {
        power.add_term(id, 1.0);
    }
    rows.push(ConstraintRow::greater_eq("backup_power", power, l_crit));

    let mut energy = LinExpr::zero();
    for (j, tech) in bundle.storage.iter().enumerate() {
        energy.add_term(registry.energy_capacity[j], tech.one_way_efficiency());
    }
    rows.push(ConstraintRow::greater_eq(
        "backup_energy_total",
        energy,
        params.backup_duration_hours as f64 * l_crit,
    ));

    rows
}

/// Restore the full-year problem and carry the design sizings forward as
/// lower bounds. Balancing generation stays banned inside the window; the
/// operation stage may still build more of any technology.
pub fn apply_operation_stage(
    registry: &mut SymbolRegistry,
    window: &OutageWindow,
    sizing: &StorageSizing,
) {
    registry.restore_declared_bounds();
    registry.clear_overrides();

    for j in 0..registry.charge_power.len() {
        let charge_id = registry.charge_power[j];
        let discharge_id = registry.discharge_power[j];
        let energy_id = registry.energy_capacity[j];
        registry.set_lower_bound(charge_id, sizing.charge_power_mw[j].max(0.0));
        registry.set_lower_bound(discharge_id, sizing.discharge_power_mw[j].max(0.0));
        registry.set_lower_bound(energy_id, sizing.energy_mwh[j].max(0.0));
    }
    for dispatch in registry.balancing_dispatch.clone() {
        for h in window.hours() {
            registry.fix(dispatch[h], 0.0);
        }
    }
}

/// Rolling reserve for the operation stage: outside the outage window (and
/// its restore tail), stored energy must cover the worst-case residual load
/// of the next backup-duration hours. The lookahead wraps cyclically.
pub fn operation_reserve_constraints(
    registry: &SymbolRegistry,
    params: &ResilienceParams,
    window: &OutageWindow,
) -> Vec<ConstraintRow> {
    let horizon = registry.horizon();
    let bundle = registry.bundle();
    let mut exempt = vec![false; horizon];
    for i in window.start..window.end + params.soc_restore_hours {
        exempt[i % horizon] = true;
    }

    let mut rows = Vec::new();
    for h in 0..horizon {
        if exempt[h] {
            continue;
        }
        let mut expr = LinExpr::zero();
        for (j, tech) in bundle.storage.iter().enumerate() {
            expr.add_term(registry.soc[j][h], tech.one_way_efficiency());
        }
        let mut residual = 0.0;
        for t in 0..params.backup_duration_hours {
            let hh = (h + t) % horizon;
            expr += registry.available_vre(hh);
            residual += registry.demand(hh);
        }
        rows.push(ConstraintRow::greater_eq(
            format!("soc_reserve[{}]", h + 1),
            expr,
            residual,
        ));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::test_bundle;
    use crate::registry::SymbolRegistry;

    fn params() -> ResilienceParams {
        ResilienceParams {
            critical_peak_load_mw: 50.0,
            backup_duration_hours: 4,
            outage_start_hour: 5,
            soc_restore_hours: 2,
        }
    }

    #[test]
    fn test_design_stage_fixes_non_storage() {
        let mut reg = SymbolRegistry::new(test_bundle(12));
        let window = OutageWindow { start: 4, end: 8 };
        apply_design_stage(&mut reg, &params(), &window);
        let pv = reg.var(reg.pv_build[0]);
        assert_eq!((pv.lower, pv.upper), (0.0, 0.0));
        let outside = reg.var(reg.discharge[0][0]);
        assert_eq!((outside.lower, outside.upper), (0.0, 0.0));
        let inside = reg.var(reg.discharge[0][5]);
        assert!(inside.upper.is_infinite());
        assert_eq!(reg.demand(5), 50.0);
        assert_eq!(reg.demand(0), 0.0);
        assert_eq!(reg.clean_share_target(), 0.0);
    }

    #[test]
    fn test_backup_energy_rhs_shrinks_across_window() {
        let reg = SymbolRegistry::new(test_bundle(12));
        let window = OutageWindow { start: 4, end: 8 };
        let rows = design_stage_constraints(&reg, &params(), &window);
        let backup: Vec<&ConstraintRow> = rows
            .iter()
            .filter(|r| r.label.starts_with("backup_energy["))
            .collect();
        assert_eq!(backup.len(), 4);
        assert_eq!(backup[0].rhs, 150.0); // three hours still ahead
        assert_eq!(backup[3].rhs, 0.0);
        let total = rows
            .iter()
            .find(|r| r.label == "backup_energy_total")
            .unwrap();
        assert_eq!(total.rhs, 200.0);
    }

    #[test]
    fn test_operation_stage_carries_lower_bounds() {
        let mut reg = SymbolRegistry::new(test_bundle(12));
        let window = OutageWindow { start: 4, end: 8 };
        apply_design_stage(&mut reg, &params(), &window);
        apply_operation_stage(
            &mut reg,
            &window,
            &StorageSizing {
                charge_power_mw: vec![30.0],
                discharge_power_mw: vec![50.0],
                energy_mwh: vec![200.0],
            },
        );
        assert_eq!(reg.var(reg.energy_capacity[0]).lower, 200.0);
        assert_eq!(reg.demand(0), 100.0); // demand restored
        let banned = reg.var(reg.balancing_dispatch[0][5]);
        assert_eq!((banned.lower, banned.upper), (0.0, 0.0));
        let open = reg.var(reg.balancing_dispatch[0][0]);
        assert!(open.upper.is_infinite());
    }

    #[test]
    fn test_reserve_skips_window_and_restore_tail() {
        let mut reg = SymbolRegistry::new(test_bundle(12));
        let window = OutageWindow { start: 4, end: 8 };
        apply_operation_stage(
            &mut reg,
            &window,
            &StorageSizing {
                charge_power_mw: vec![0.0],
                discharge_power_mw: vec![0.0],
                energy_mwh: vec![0.0],
            },
        );
        let rows = operation_reserve_constraints(&reg, &params(), &window);
        // 12 hours minus 4 outage hours minus 2 restore hours
        assert_eq!(rows.len(), 6);
        // four hours of 100 MW demand ahead of every armed hour
        assert!(rows.iter().all(|r| r.rhs == 400.0));
        assert!(!rows.iter().any(|r| r.label == "soc_reserve[5]"));
        assert!(rows.iter().any(|r| r.label == "soc_reserve[1]"));
    }
}
