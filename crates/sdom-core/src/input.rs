//! The validated input bundle consumed by the formulation layer.
//!
//! A bundle is assembled once from a case directory, validated, and then
//! shared immutably: model builds read from it but never write back. All
//! monetary figures are converted to the MW/MWh basis before they land here.

use serde::{Deserialize, Serialize};

use crate::error::{SdomError, SdomResult};
use crate::finance::{self, VRE_LIFETIME_YEARS};

/// System-wide scalar parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemScalars {
    /// Discount rate used for every capital recovery factor. Must be > 0.
    pub discount_rate: f64,
    /// Minimum clean share of net-adjusted demand, in [0, 1].
    pub clean_share_target: f64,
    /// Activation fraction applied to the nuclear profile.
    pub alpha_nuclear: f64,
    /// Activation fraction applied to the hydro profile.
    pub alpha_hydro: f64,
    /// Activation fraction applied to the other-renewables profile.
    pub alpha_other: f64,
}

/// Resolved resilience parameters (present only when the two-stage solve is
/// requested).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceParams {
    /// Constant critical load to ride through, MW.
    pub critical_peak_load_mw: f64,
    /// Outage duration and backup sizing horizon, hours.
    pub backup_duration_hours: usize,
    /// First hour of the outage window, 1-indexed like the input tables.
    pub outage_start_hour: usize,
    /// Hours after the outage during which the state-of-charge reserve is
    /// not enforced, giving the fleet time to refill.
    pub soc_restore_hours: usize,
}

impl ResilienceParams {
    /// Outage window as 0-based hour indices `[start, end)`.
    pub fn outage_window(&self, horizon: usize) -> SdomResult<(usize, usize)> {
        if self.outage_start_hour == 0 {
            return Err(SdomError::Data("outage start hour is 1-indexed".into()));
        }
        let start = self.outage_start_hour - 1;
        let end = start + self.backup_duration_hours;
        if end > horizon {
            return Err(SdomError::Data(format!(
                "outage window [{}, {}) exceeds the {}-hour horizon",
                start, end, horizon
            )));
        }
        Ok((start, end))
    }
}

/// One PV or wind plant with its hourly capacity-factor profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VrePlant {
    pub id: String,
    /// Maximum buildable capacity, MW.
    pub capacity_mw: f64,
    /// Overnight capital cost, $/MW.
    pub capex_per_mw: f64,
    /// Fixed O&M, $/MW-yr.
    pub fom_per_mw_yr: f64,
    /// Lump-sum transmission interconnection cost, $.
    pub transmission_capex: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Hourly capacity factor in [0, 1], one entry per horizon hour.
    pub capacity_factor: Vec<f64>,
}

impl VrePlant {
    /// Available generation at full build in the given hour, MW.
    pub fn available_mw(&self, hour: usize) -> f64 {
        self.capacity_mw * self.capacity_factor[hour]
    }
}

/// One storage technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageTech {
    pub id: String,
    /// Power-component capital cost, $/MW.
    pub power_capex_per_mw: f64,
    /// Energy-component capital cost, $/MWh.
    pub energy_capex_per_mwh: f64,
    /// Round-trip efficiency, in (0, 1].
    pub efficiency: f64,
    /// Minimum discharge duration, hours.
    pub min_duration_hours: f64,
    /// Maximum discharge duration, hours.
    pub max_duration_hours: f64,
    /// Upper bound on charge and discharge power, MW.
    pub max_power_mw: f64,
    /// Charge and discharge share one power train.
    pub coupled: bool,
    /// Fixed O&M, $/MW-yr.
    pub fom_per_mw_yr: f64,
    /// Variable O&M on discharged energy, $/MWh.
    pub vom_per_mwh: f64,
    pub lifetime_years: f64,
    /// Fraction of the power cost carried by the charge side, in [0, 1].
    pub cost_ratio: f64,
    /// Lifetime cycle budget; zero disables the annualized cycle cap.
    pub max_cycles: f64,
}

impl StorageTech {
    /// One-way efficiency applied symmetrically to charge and discharge.
    pub fn one_way_efficiency(&self) -> f64 {
        self.efficiency.sqrt()
    }

    /// Annualized cycle allowance multiplying the energy capacity, 1/yr.
    pub fn cycles_per_year(&self) -> Option<f64> {
        (self.max_cycles > 0.0).then(|| self.max_cycles / self.lifetime_years)
    }
}

/// One dispatchable balancing unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancingUnit {
    pub id: String,
    /// Minimum installed capacity, MW.
    pub min_capacity_mw: f64,
    /// Maximum installed capacity, MW.
    pub max_capacity_mw: f64,
    pub lifetime_years: f64,
    /// Overnight capital cost, $/MW.
    pub capex_per_mw: f64,
    /// Heat rate, MMBtu/MWh.
    pub heat_rate: f64,
    /// Fuel price, $/MMBtu.
    pub fuel_cost: f64,
    /// Variable O&M, $/MWh.
    pub vom_per_mwh: f64,
    /// Fixed O&M, $/MW-yr.
    pub fom_per_mw_yr: f64,
}

impl BalancingUnit {
    /// Marginal dispatch cost, $/MWh.
    pub fn marginal_cost(&self) -> f64 {
        self.heat_rate * self.fuel_cost + self.vom_per_mwh
    }
}

/// Hydro treatment selected by the formulation map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HydroVariant {
    /// Hydro follows its profile exactly; no dispatch variable exists.
    RunOfRiver,
    /// Dispatchable within hourly bounds and a monthly energy budget.
    MonthlyBudget,
    /// Dispatchable within hourly bounds and a daily energy budget.
    DailyBudget,
}

impl HydroVariant {
    pub fn parse(name: &str) -> SdomResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "runofriver" | "run_of_river" | "run-of-river" => Ok(HydroVariant::RunOfRiver),
            "monthlybudget" | "monthly_budget" | "monthly" => Ok(HydroVariant::MonthlyBudget),
            "dailybudget" | "daily_budget" | "daily" => Ok(HydroVariant::DailyBudget),
            other => Err(SdomError::Config(format!(
                "unknown hydro formulation '{other}'"
            ))),
        }
    }

    pub fn uses_budget(&self) -> bool {
        !matches!(self, HydroVariant::RunOfRiver)
    }
}

/// Trade treatment selected by the formulation map, per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeVariant {
    Disabled,
    /// Price-driven trade gated by the sign of the hourly net load.
    PriceNetLoad,
}

impl TradeVariant {
    pub fn parse(name: &str) -> SdomResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(TradeVariant::Disabled),
            "pricenetload" | "price_net_load" | "price-net-load" => Ok(TradeVariant::PriceNetLoad),
            other => Err(SdomError::Config(format!(
                "unknown trade formulation '{other}'"
            ))),
        }
    }
}

/// Formulation selection for the pluggable axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulationChoices {
    pub hydro: HydroVariant,
    pub imports: TradeVariant,
    pub exports: TradeVariant,
}

impl FormulationChoices {
    pub fn imports_enabled(&self) -> bool {
        self.imports == TradeVariant::PriceNetLoad
    }

    pub fn exports_enabled(&self) -> bool {
        self.exports == TradeVariant::PriceNetLoad
    }

    pub fn trade_enabled(&self) -> bool {
        self.imports_enabled() || self.exports_enabled()
    }
}

impl Default for FormulationChoices {
    fn default() -> Self {
        Self {
            hydro: HydroVariant::RunOfRiver,
            imports: TradeVariant::Disabled,
            exports: TradeVariant::Disabled,
        }
    }
}

/// Hourly trade caps and prices, present only when trade is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSeries {
    pub import_cap_mw: Vec<f64>,
    pub import_price: Vec<f64>,
    pub export_cap_mw: Vec<f64>,
    pub export_price: Vec<f64>,
}

/// Hourly hydro envelope plus the per-period energy budgets, all unscaled;
/// the hydro activation fraction is applied at constraint emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydroBudget {
    /// Hourly dispatch floor, MW.
    pub min_mw: Vec<f64>,
    /// Hourly dispatch ceiling, MW.
    pub max_mw: Vec<f64>,
    /// Contiguous budget periods as 0-based `[start, end)` hour ranges.
    pub periods: Vec<(usize, usize)>,
    /// Energy budget per period, MWh. Taken from the hydro profile.
    pub budget_mwh: Vec<f64>,
}

/// Capital recovery factors precomputed from the discount rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedFactors {
    /// Shared CRF for PV and wind.
    pub crf_vre: f64,
    /// CRF per balancing unit, aligned with the balancing table.
    pub crf_balancing: Vec<f64>,
    /// CRF per storage technology, aligned with the storage table.
    pub crf_storage: Vec<f64>,
}

/// The full validated model input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBundle {
    /// Number of chronological hours, ordered cyclically.
    pub horizon: usize,
    pub scalars: SystemScalars,
    pub resilience: Option<ResilienceParams>,
    pub demand_mw: Vec<f64>,
    pub nuclear_mw: Vec<f64>,
    pub hydro_mw: Vec<f64>,
    pub other_renewables_mw: Vec<f64>,
    pub pv_plants: Vec<VrePlant>,
    pub wind_plants: Vec<VrePlant>,
    pub storage: Vec<StorageTech>,
    pub balancing: Vec<BalancingUnit>,
    pub formulations: FormulationChoices,
    pub trade: Option<TradeSeries>,
    pub hydro_budget: Option<HydroBudget>,
    pub factors: DerivedFactors,
}

impl InputBundle {
    /// Precompute the capital recovery factors for the bundle's tables.
    pub fn derive_factors(
        discount_rate: f64,
        storage: &[StorageTech],
        balancing: &[BalancingUnit],
    ) -> DerivedFactors {
        DerivedFactors {
            crf_vre: finance::capital_recovery_factor(discount_rate, VRE_LIFETIME_YEARS),
            crf_balancing: balancing
                .iter()
                .map(|k| finance::capital_recovery_factor(discount_rate, k.lifetime_years))
                .collect(),
            crf_storage: storage
                .iter()
                .map(|j| finance::capital_recovery_factor(discount_rate, j.lifetime_years))
                .collect(),
        }
    }

    /// Peak demand over the horizon, MW.
    pub fn peak_demand(&self) -> f64 {
        self.demand_mw.iter().copied().fold(0.0, f64::max)
    }

    /// Peak residual demand after the activated fixed clean sources, MW.
    pub fn peak_residual_demand(&self) -> f64 {
        let s = &self.scalars;
        (0..self.horizon)
            .map(|h| {
                self.demand_mw[h]
                    - s.alpha_nuclear * self.nuclear_mw[h]
                    - s.alpha_hydro * self.hydro_mw[h]
                    - s.alpha_other * self.other_renewables_mw[h]
            })
            .fold(0.0, f64::max)
    }

    /// Peak full-build VRE availability across all plants, MW.
    pub fn peak_vre_availability(&self) -> f64 {
        (0..self.horizon)
            .map(|h| {
                self.pv_plants
                    .iter()
                    .chain(self.wind_plants.iter())
                    .map(|p| p.available_mw(h))
                    .sum::<f64>()
            })
            .fold(0.0, f64::max)
    }

    /// Enforce the input invariants that survive table loading.
    pub fn validate(&self) -> SdomResult<()> {
        let s = &self.scalars;
        if !(s.discount_rate > 0.0) {
            return Err(SdomError::Data("discount rate must be positive".into()));
        }
        check_fraction("clean-energy share target", s.clean_share_target)?;
        check_fraction("alpha_Nuclear", s.alpha_nuclear)?;
        check_fraction("alpha_Hydro", s.alpha_hydro)?;
        check_fraction("alpha_OtherRenewables", s.alpha_other)?;

        for (name, series) in [
            ("demand", &self.demand_mw),
            ("nuclear", &self.nuclear_mw),
            ("hydro", &self.hydro_mw),
            ("other renewables", &self.other_renewables_mw),
        ] {
            if series.len() != self.horizon {
                return Err(SdomError::Data(format!(
                    "{name} series has {} rows, expected {}",
                    series.len(),
                    self.horizon
                )));
            }
            check_series_finite(name, series)?;
        }

        for plant in self.pv_plants.iter().chain(self.wind_plants.iter()) {
            if plant.capacity_factor.len() != self.horizon {
                return Err(SdomError::Data(format!(
                    "plant '{}' has {} capacity factors, expected {}",
                    plant.id,
                    plant.capacity_factor.len(),
                    self.horizon
                )));
            }
            for (h, &cf) in plant.capacity_factor.iter().enumerate() {
                if !(0.0..=1.0).contains(&cf) {
                    return Err(SdomError::Data(format!(
                        "plant '{}' capacity factor {} at hour {} outside [0, 1]",
                        plant.id,
                        cf,
                        h + 1
                    )));
                }
            }
            check_non_negative(&plant.id, "capacity", plant.capacity_mw)?;
            check_non_negative(&plant.id, "capex", plant.capex_per_mw)?;
            check_non_negative(&plant.id, "FOM", plant.fom_per_mw_yr)?;
            check_non_negative(&plant.id, "transmission capex", plant.transmission_capex)?;
        }

        for tech in &self.storage {
            if !(tech.efficiency > 0.0 && tech.efficiency <= 1.0) {
                return Err(SdomError::Data(format!(
                    "storage '{}' efficiency {} outside (0, 1]",
                    tech.id, tech.efficiency
                )));
            }
            if tech.min_duration_hours < 0.0 || tech.min_duration_hours > tech.max_duration_hours {
                return Err(SdomError::Data(format!(
                    "storage '{}' duration window [{}, {}] is invalid",
                    tech.id, tech.min_duration_hours, tech.max_duration_hours
                )));
            }
            if !(0.0..=1.0).contains(&tech.cost_ratio) {
                return Err(SdomError::Data(format!(
                    "storage '{}' cost ratio {} outside [0, 1]",
                    tech.id, tech.cost_ratio
                )));
            }
            check_non_negative(&tech.id, "power capex", tech.power_capex_per_mw)?;
            check_non_negative(&tech.id, "energy capex", tech.energy_capex_per_mwh)?;
            check_non_negative(&tech.id, "FOM", tech.fom_per_mw_yr)?;
            check_non_negative(&tech.id, "VOM", tech.vom_per_mwh)?;
            check_non_negative(&tech.id, "max power", tech.max_power_mw)?;
            check_non_negative(&tech.id, "max cycles", tech.max_cycles)?;
            if !(tech.lifetime_years > 0.0) {
                return Err(SdomError::Data(format!(
                    "storage '{}' lifetime must be positive",
                    tech.id
                )));
            }
        }

        for unit in &self.balancing {
            if unit.min_capacity_mw < 0.0 || unit.min_capacity_mw > unit.max_capacity_mw {
                return Err(SdomError::Data(format!(
                    "balancing unit '{}' capacity window [{}, {}] is invalid",
                    unit.id, unit.min_capacity_mw, unit.max_capacity_mw
                )));
            }
            check_non_negative(&unit.id, "capex", unit.capex_per_mw)?;
            check_non_negative(&unit.id, "heat rate", unit.heat_rate)?;
            check_non_negative(&unit.id, "fuel cost", unit.fuel_cost)?;
            check_non_negative(&unit.id, "VOM", unit.vom_per_mwh)?;
            check_non_negative(&unit.id, "FOM", unit.fom_per_mw_yr)?;
            if !(unit.lifetime_years > 0.0) {
                return Err(SdomError::Data(format!(
                    "balancing unit '{}' lifetime must be positive",
                    unit.id
                )));
            }
        }

        if self.formulations.hydro.uses_budget() {
            let budget = self.hydro_budget.as_ref().ok_or_else(|| {
                SdomError::Config("budget hydro selected but no hourly hydro bounds loaded".into())
            })?;
            budget.validate(self.horizon)?;
        }

        if self.formulations.trade_enabled() {
            let trade = self.trade.as_ref().ok_or_else(|| {
                SdomError::Config("trade enabled but no trade series loaded".into())
            })?;
            for (name, series) in [
                ("import cap", &trade.import_cap_mw),
                ("import price", &trade.import_price),
                ("export cap", &trade.export_cap_mw),
                ("export price", &trade.export_price),
            ] {
                if series.len() != self.horizon {
                    return Err(SdomError::Data(format!(
                        "{name} series has {} rows, expected {}",
                        series.len(),
                        self.horizon
                    )));
                }
                check_series_finite(name, series)?;
            }
        }

        if let Some(res) = &self.resilience {
            res.outage_window(self.horizon)?;
            if !(res.critical_peak_load_mw >= 0.0) {
                return Err(SdomError::Data("critical peak load must be >= 0".into()));
            }
        }

        Ok(())
    }
}

impl HydroBudget {
    fn validate(&self, horizon: usize) -> SdomResult<()> {
        if self.min_mw.len() != horizon || self.max_mw.len() != horizon {
            return Err(SdomError::Data(
                "hydro bound series length does not match the horizon".into(),
            ));
        }
        for h in 0..horizon {
            if self.min_mw[h] < 0.0 || self.min_mw[h] > self.max_mw[h] {
                return Err(SdomError::Data(format!(
                    "hydro bounds [{}, {}] at hour {} are invalid",
                    self.min_mw[h],
                    self.max_mw[h],
                    h + 1
                )));
            }
        }
        if self.periods.len() != self.budget_mwh.len() {
            return Err(SdomError::Data(
                "hydro budget count does not match the period count".into(),
            ));
        }
        let mut cursor = 0;
        for (&(start, end), &budget) in self.periods.iter().zip(&self.budget_mwh) {
            if start != cursor || end <= start || end > horizon {
                return Err(SdomError::Data(
                    "hydro budget periods must tile the horizon contiguously".into(),
                ));
            }
            cursor = end;
            let floor: f64 = self.min_mw[start..end].iter().sum();
            let ceiling: f64 = self.max_mw[start..end].iter().sum();
            if budget < floor - 1e-6 || budget > ceiling + 1e-6 {
                return Err(SdomError::Data(format!(
                    "hydro budget {budget} MWh for hours [{}, {}) outside feasible range [{floor}, {ceiling}]",
                    start + 1,
                    end + 1
                )));
            }
        }
        if cursor != horizon {
            return Err(SdomError::Data(format!(
                "horizon of {horizon} hours does not end on a hydro budget-period boundary"
            )));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> SdomResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SdomError::Data(format!("{name} {value} outside [0, 1]")));
    }
    Ok(())
}

fn check_non_negative(id: &str, name: &str, value: f64) -> SdomResult<()> {
    if !(value >= 0.0) || !value.is_finite() {
        return Err(SdomError::Data(format!(
            "'{id}' {name} must be a non-negative finite number, got {value}"
        )));
    }
    Ok(())
}

fn check_series_finite(name: &str, series: &[f64]) -> SdomResult<()> {
    for (h, v) in series.iter().enumerate() {
        if !v.is_finite() {
            return Err(SdomError::Data(format!(
                "{name} series has a non-finite value at hour {}",
                h + 1
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_bundle() -> InputBundle {
        let storage = vec![StorageTech {
            id: "battery".into(),
            power_capex_per_mw: 300_000.0,
            energy_capex_per_mwh: 150_000.0,
            efficiency: 0.85,
            min_duration_hours: 1.0,
            max_duration_hours: 10.0,
            max_power_mw: 500.0,
            coupled: true,
            fom_per_mw_yr: 8_000.0,
            vom_per_mwh: 1.0,
            lifetime_years: 15.0,
            cost_ratio: 0.5,
            max_cycles: 5000.0,
        }];
        let balancing = vec![BalancingUnit {
            id: "ccgt".into(),
            min_capacity_mw: 0.0,
            max_capacity_mw: 1000.0,
            lifetime_years: 25.0,
            capex_per_mw: 900_000.0,
            heat_rate: 6.5,
            fuel_cost: 3.0,
            vom_per_mwh: 2.0,
            fom_per_mw_yr: 10_000.0,
        }];
        let factors = InputBundle::derive_factors(0.06, &storage, &balancing);
        InputBundle {
            horizon: 4,
            scalars: SystemScalars {
                discount_rate: 0.06,
                clean_share_target: 0.5,
                alpha_nuclear: 1.0,
                alpha_hydro: 1.0,
                alpha_other: 1.0,
            },
            resilience: None,
            demand_mw: vec![100.0; 4],
            nuclear_mw: vec![10.0; 4],
            hydro_mw: vec![5.0; 4],
            other_renewables_mw: vec![0.0; 4],
            pv_plants: vec![VrePlant {
                id: "pv1".into(),
                capacity_mw: 50.0,
                capex_per_mw: 800_000.0,
                fom_per_mw_yr: 15_000.0,
                transmission_capex: 1_000_000.0,
                latitude: 35.0,
                longitude: -106.0,
                capacity_factor: vec![0.0, 0.5, 0.9, 0.2],
            }],
            wind_plants: vec![],
            storage,
            balancing,
            formulations: FormulationChoices::default(),
            trade: None,
            hydro_budget: None,
            factors,
        }
    }

    #[test]
    fn test_valid_bundle_passes() {
        tiny_bundle().validate().unwrap();
    }

    #[test]
    fn test_capacity_factor_out_of_range() {
        let mut bundle = tiny_bundle();
        bundle.pv_plants[0].capacity_factor[2] = 1.2;
        let err = bundle.validate().unwrap_err();
        assert!(matches!(err, SdomError::Data(_)));
    }

    #[test]
    fn test_efficiency_must_be_positive() {
        let mut bundle = tiny_bundle();
        bundle.storage[0].efficiency = 0.0;
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn test_duration_window_ordering() {
        let mut bundle = tiny_bundle();
        bundle.storage[0].min_duration_hours = 12.0;
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn test_peak_residual_demand() {
        let bundle = tiny_bundle();
        // 100 - 10 - 5 - 0 = 85 in every hour
        assert!((bundle.peak_residual_demand() - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_hydro_budget_must_tile_horizon() {
        let budget = HydroBudget {
            min_mw: vec![0.0; 4],
            max_mw: vec![10.0; 4],
            periods: vec![(0, 3)],
            budget_mwh: vec![15.0],
        };
        assert!(budget.validate(4).is_err());
    }

    #[test]
    fn test_hydro_budget_feasibility_window() {
        let budget = HydroBudget {
            min_mw: vec![0.0; 4],
            max_mw: vec![10.0; 4],
            periods: vec![(0, 4)],
            budget_mwh: vec![45.0],
        };
        // 45 MWh cannot fit under a 40 MWh ceiling
        assert!(budget.validate(4).is_err());
    }

    #[test]
    fn test_outage_window_is_one_indexed() {
        let res = ResilienceParams {
            critical_peak_load_mw: 50.0,
            backup_duration_hours: 24,
            outage_start_hour: 100,
            soc_restore_hours: 24,
        };
        assert_eq!(res.outage_window(8760).unwrap(), (99, 123));
    }
}
