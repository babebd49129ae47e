//! The symbol registry: every set, parameter and decision variable of the
//! model, declared with domain and bounds and indexed by name.
//!
//! Constraint and objective builders read exclusively from the registry;
//! they never reach back into raw input tables. The registry also owns the
//! stage overrides used by the two-stage resilience solve: between stages,
//! bounds and parameter activations are edited in place, and no variable is
//! ever recreated.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sdom_core::InputBundle;

use crate::expr::{LinExpr, VarId};

/// Variable integrality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Continuous,
    Binary,
}

/// One declared decision variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarSpec {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

/// Parameter activations a solve stage may override without touching the
/// immutable input bundle.
#[derive(Debug, Clone, Default)]
pub struct StageOverrides {
    pub demand: Option<Vec<f64>>,
    pub alpha_nuclear: Option<f64>,
    pub alpha_hydro: Option<f64>,
    pub alpha_other: Option<f64>,
    pub clean_share_target: Option<f64>,
}

/// Registry of sets, parameters and variables for one model instance.
#[derive(Debug)]
pub struct SymbolRegistry {
    bundle: Arc<InputBundle>,
    vars: Vec<VarSpec>,
    declared_bounds: Vec<(f64, f64)>,
    by_name: HashMap<String, VarId>,
    overrides: StageOverrides,

    // Investment variables
    pub pv_build: Vec<VarId>,
    pub wind_build: Vec<VarId>,
    pub balancing_capacity: Vec<VarId>,
    pub charge_power: Vec<VarId>,
    pub discharge_power: Vec<VarId>,
    pub energy_capacity: Vec<VarId>,

    // Dispatch variables, hour-indexed
    pub pv_generation: Vec<VarId>,
    pub pv_curtailment: Vec<VarId>,
    pub wind_generation: Vec<VarId>,
    pub wind_curtailment: Vec<VarId>,
    pub balancing_dispatch: Vec<Vec<VarId>>,
    pub charge: Vec<Vec<VarId>>,
    pub discharge: Vec<Vec<VarId>>,
    pub soc: Vec<Vec<VarId>>,
    pub charge_indicator: Vec<Vec<VarId>>,

    // Contributed by sub-formulations (empty when the variant omits them)
    pub hydro_dispatch: Vec<VarId>,
    pub imports: Vec<VarId>,
    pub exports: Vec<VarId>,
    pub net_load_sign: Vec<VarId>,
}

impl SymbolRegistry {
    /// Declare the common variables of the model; sub-formulations add
    /// theirs afterwards through [`SymbolRegistry::add_variable`].
    pub fn new(bundle: Arc<InputBundle>) -> Self {
        let horizon = bundle.horizon;
        let mut reg = Self {
            bundle: bundle.clone(),
            vars: Vec::new(),
            declared_bounds: Vec::new(),
            by_name: HashMap::new(),
            overrides: StageOverrides::default(),
            pv_build: Vec::new(),
            wind_build: Vec::new(),
            balancing_capacity: Vec::new(),
            charge_power: Vec::new(),
            discharge_power: Vec::new(),
            energy_capacity: Vec::new(),
            pv_generation: Vec::new(),
            pv_curtailment: Vec::new(),
            wind_generation: Vec::new(),
            wind_curtailment: Vec::new(),
            balancing_dispatch: Vec::new(),
            charge: Vec::new(),
            discharge: Vec::new(),
            soc: Vec::new(),
            charge_indicator: Vec::new(),
            hydro_dispatch: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            net_load_sign: Vec::new(),
        };

        for plant in &bundle.pv_plants {
            let id = reg.add_variable(format!("pv_build[{}]", plant.id), 0.0, 1.0, VarKind::Continuous);
            reg.pv_build.push(id);
        }
        for plant in &bundle.wind_plants {
            let id = reg.add_variable(
                format!("wind_build[{}]", plant.id),
                0.0,
                1.0,
                VarKind::Continuous,
            );
            reg.wind_build.push(id);
        }
        for unit in &bundle.balancing {
            let id = reg.add_variable(
                format!("balancing_capacity[{}]", unit.id),
                unit.min_capacity_mw,
                unit.max_capacity_mw,
                VarKind::Continuous,
            );
            reg.balancing_capacity.push(id);
        }
        for tech in &bundle.storage {
            let charge_power = reg.add_variable_inner(
                format!("charge_power[{}]", tech.id),
                0.0,
                tech.max_power_mw,
                VarKind::Continuous,
            );
            reg.charge_power.push(charge_power);
            let discharge_power = reg.add_variable_inner(
                format!("discharge_power[{}]", tech.id),
                0.0,
                tech.max_power_mw,
                VarKind::Continuous,
            );
            reg.discharge_power.push(discharge_power);
            let energy = reg.add_variable_inner(
                format!("energy_capacity[{}]", tech.id),
                0.0,
                f64::INFINITY,
                VarKind::Continuous,
            );
            reg.energy_capacity.push(energy);
        }
        for h in 0..horizon {
            let gen = reg.add_variable_inner(
                format!("pv_generation[{}]", h + 1),
                0.0,
                f64::INFINITY,
                VarKind::Continuous,
            );
            reg.pv_generation.push(gen);
            let curt = reg.add_variable_inner(
                format!("pv_curtailment[{}]", h + 1),
                0.0,
                f64::INFINITY,
                VarKind::Continuous,
            );
            reg.pv_curtailment.push(curt);
            let gen = reg.add_variable_inner(
                format!("wind_generation[{}]", h + 1),
                0.0,
                f64::INFINITY,
                VarKind::Continuous,
            );
            reg.wind_generation.push(gen);
            let curt = reg.add_variable_inner(
                format!("wind_curtailment[{}]", h + 1),
                0.0,
                f64::INFINITY,
                VarKind::Continuous,
            );
            reg.wind_curtailment.push(curt);
        }
        for unit in &bundle.balancing {
            let mut dispatch = Vec::with_capacity(horizon);
            for h in 0..horizon {
                dispatch.push(reg.add_variable_inner(
                    format!("balancing_dispatch[{},{}]", unit.id, h + 1),
                    0.0,
                    f64::INFINITY,
                    VarKind::Continuous,
                ));
            }
            reg.balancing_dispatch.push(dispatch);
        }
        for tech in &bundle.storage {
            let mut charge = Vec::with_capacity(horizon);
            let mut discharge = Vec::with_capacity(horizon);
            let mut soc = Vec::with_capacity(horizon);
            let mut indicator = Vec::with_capacity(horizon);
            for h in 0..horizon {
                charge.push(reg.add_variable_inner(
                    format!("charge[{},{}]", tech.id, h + 1),
                    0.0,
                    f64::INFINITY,
                    VarKind::Continuous,
                ));
                discharge.push(reg.add_variable_inner(
                    format!("discharge[{},{}]", tech.id, h + 1),
                    0.0,
                    f64::INFINITY,
                    VarKind::Continuous,
                ));
                soc.push(reg.add_variable_inner(
                    format!("soc[{},{}]", tech.id, h + 1),
                    0.0,
                    f64::INFINITY,
                    VarKind::Continuous,
                ));
                indicator.push(reg.add_variable_inner(
                    format!("charge_indicator[{},{}]", tech.id, h + 1),
                    0.0,
                    1.0,
                    VarKind::Binary,
                ));
            }
            reg.charge.push(charge);
            reg.discharge.push(discharge);
            reg.soc.push(soc);
            reg.charge_indicator.push(indicator);
        }
        reg
    }

    fn add_variable_inner(&mut self, name: String, lower: f64, upper: f64, kind: VarKind) -> VarId {
        let id = VarId(self.vars.len());
        self.by_name.insert(name.clone(), id);
        self.vars.push(VarSpec {
            name,
            lower,
            upper,
            kind,
        });
        self.declared_bounds.push((lower, upper));
        id
    }

    /// Declare an additional variable (used by sub-formulations).
    pub fn add_variable(&mut self, name: String, lower: f64, upper: f64, kind: VarKind) -> VarId {
        self.add_variable_inner(name, lower, upper, kind)
    }

    pub fn var(&self, id: VarId) -> &VarSpec {
        &self.vars[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = &VarSpec> {
        self.vars.iter()
    }

    pub fn num_variables(&self) -> usize {
        self.vars.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.vars.iter().filter(|v| v.kind == VarKind::Binary).count()
    }

    pub fn set_lower_bound(&mut self, id: VarId, value: f64) {
        self.vars[id.index()].lower = value;
    }

    pub fn set_upper_bound(&mut self, id: VarId, value: f64) {
        self.vars[id.index()].upper = value;
    }

    /// Pin a variable to a single value.
    pub fn fix(&mut self, id: VarId, value: f64) {
        let spec = &mut self.vars[id.index()];
        spec.lower = value;
        spec.upper = value;
    }

    /// Reset every variable to the bounds it was declared with.
    pub fn restore_declared_bounds(&mut self) {
        for (spec, &(lower, upper)) in self.vars.iter_mut().zip(&self.declared_bounds) {
            spec.lower = lower;
            spec.upper = upper;
        }
    }

    // === Parameter views (stage-override aware) ===

    pub fn bundle(&self) -> &InputBundle {
        &self.bundle
    }

    pub fn horizon(&self) -> usize {
        self.bundle.horizon
    }

    pub fn demand(&self, hour: usize) -> f64 {
        match &self.overrides.demand {
            Some(series) => series[hour],
            None => self.bundle.demand_mw[hour],
        }
    }

    pub fn alpha_nuclear(&self) -> f64 {
        self.overrides
            .alpha_nuclear
            .unwrap_or(self.bundle.scalars.alpha_nuclear)
    }

    pub fn alpha_hydro(&self) -> f64 {
        self.overrides
            .alpha_hydro
            .unwrap_or(self.bundle.scalars.alpha_hydro)
    }

    pub fn alpha_other(&self) -> f64 {
        self.overrides
            .alpha_other
            .unwrap_or(self.bundle.scalars.alpha_other)
    }

    pub fn clean_share_target(&self) -> f64 {
        self.overrides
            .clean_share_target
            .unwrap_or(self.bundle.scalars.clean_share_target)
    }

    /// Fixed clean supply outside the hydro axis: activated nuclear and
    /// other-renewables profiles, MW.
    pub fn fixed_clean_supply(&self, hour: usize) -> f64 {
        self.alpha_nuclear() * self.bundle.nuclear_mw[hour]
            + self.alpha_other() * self.bundle.other_renewables_mw[hour]
    }

    /// Full-build VRE availability in the hour as an expression over the
    /// build fractions.
    pub fn available_vre(&self, hour: usize) -> LinExpr {
        let mut expr = LinExpr::zero();
        for (plant, &var) in self.bundle.pv_plants.iter().zip(&self.pv_build) {
            expr.add_term(var, plant.available_mw(hour));
        }
        for (plant, &var) in self.bundle.wind_plants.iter().zip(&self.wind_build) {
            expr.add_term(var, plant.available_mw(hour));
        }
        expr
    }

    pub fn set_overrides(&mut self, overrides: StageOverrides) {
        self.overrides = overrides;
    }

    pub fn clear_overrides(&mut self) {
        self.overrides = StageOverrides::default();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sdom_core::{
        BalancingUnit, FormulationChoices, StorageTech, SystemScalars, VrePlant,
    };

    pub(crate) fn test_bundle(horizon: usize) -> Arc<InputBundle> {
        let storage = vec![StorageTech {
            id: "battery".into(),
            power_capex_per_mw: 100_000.0,
            energy_capex_per_mwh: 50_000.0,
            efficiency: 0.81,
            min_duration_hours: 1.0,
            max_duration_hours: 10.0,
            max_power_mw: 400.0,
            coupled: true,
            fom_per_mw_yr: 5_000.0,
            vom_per_mwh: 0.5,
            lifetime_years: 15.0,
            cost_ratio: 0.5,
            max_cycles: 5000.0,
        }];
        let balancing = vec![BalancingUnit {
            id: "ccgt".into(),
            min_capacity_mw: 0.0,
            max_capacity_mw: 1000.0,
            lifetime_years: 25.0,
            capex_per_mw: 0.0,
            heat_rate: 1.0,
            fuel_cost: 10.0,
            vom_per_mwh: 0.0,
            fom_per_mw_yr: 0.0,
        }];
        let factors = InputBundle::derive_factors(0.06, &storage, &balancing);
        Arc::new(InputBundle {
            horizon,
            scalars: SystemScalars {
                discount_rate: 0.06,
                clean_share_target: 0.0,
                alpha_nuclear: 1.0,
                alpha_hydro: 1.0,
                alpha_other: 1.0,
            },
            resilience: None,
            demand_mw: vec![100.0; horizon],
            nuclear_mw: vec![0.0; horizon],
            hydro_mw: vec![0.0; horizon],
            other_renewables_mw: vec![0.0; horizon],
            pv_plants: vec![VrePlant {
                id: "pv1".into(),
                capacity_mw: 50.0,
                capex_per_mw: 800_000.0,
                fom_per_mw_yr: 15_000.0,
                transmission_capex: 0.0,
                latitude: 35.0,
                longitude: -106.0,
                capacity_factor: vec![0.5; horizon],
            }],
            wind_plants: vec![],
            storage,
            balancing,
            formulations: FormulationChoices::default(),
            trade: None,
            hydro_budget: None,
            factors,
        })
    }

    #[test]
    fn test_registry_declares_expected_counts() {
        let reg = SymbolRegistry::new(test_bundle(4));
        // 1 pv build + 1 balancing capacity + 3 storage sizes
        // + 4 hours × (4 VRE dispatch + 1 balancing + 4 storage)
        assert_eq!(reg.num_variables(), 5 + 4 * 9);
        assert_eq!(reg.num_binaries(), 4);
        assert!(reg.lookup("charge[battery,3]").is_some());
        assert!(reg.lookup("charge[battery,5]").is_none());
    }

    #[test]
    fn test_bound_edits_and_restore() {
        let mut reg = SymbolRegistry::new(test_bundle(4));
        let id = reg.energy_capacity[0];
        reg.fix(id, 123.0);
        assert_eq!(reg.var(id).lower, 123.0);
        assert_eq!(reg.var(id).upper, 123.0);
        reg.restore_declared_bounds();
        assert_eq!(reg.var(id).lower, 0.0);
        assert!(reg.var(id).upper.is_infinite());
    }

    #[test]
    fn test_overrides_shadow_bundle_parameters() {
        let mut reg = SymbolRegistry::new(test_bundle(4));
        assert_eq!(reg.demand(0), 100.0);
        reg.set_overrides(StageOverrides {
            demand: Some(vec![7.0; 4]),
            alpha_nuclear: Some(0.0),
            ..Default::default()
        });
        assert_eq!(reg.demand(0), 7.0);
        assert_eq!(reg.alpha_nuclear(), 0.0);
        reg.clear_overrides();
        assert_eq!(reg.demand(0), 100.0);
    }

    #[test]
    fn test_available_vre_expression() {
        let reg = SymbolRegistry::new(test_bundle(4));
        let expr = reg.available_vre(0);
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.terms[0].1, 25.0); // 50 MW × 0.5 CF
    }
}
