//! Case loading: from a directory of tables to a validated [`InputBundle`].

use std::collections::HashMap;
use std::path::Path;

use chrono::{Datelike, Days, NaiveDate};
use tracing::{info, warn};

use sdom_core::units::{per_kw_to_per_mw, per_kwh_to_per_mwh};
use sdom_core::{
    BalancingUnit, FormulationChoices, HydroBudget, HydroVariant, InputBundle, ResilienceParams,
    SdomError, SdomResult, StorageTech, SystemScalars, TradeSeries, TradeVariant, VrePlant,
};

use crate::case::{logical, normalize, CaseDir};
use crate::tables::{self, param_row, PlantRow};

/// Load and validate a case directory.
///
/// `horizon` is the number of chronological hours to model; series files may
/// carry more rows than the horizon (a prefix is read) but never fewer.
pub fn load_case(dir: &Path, horizon: usize, resilience: bool) -> SdomResult<InputBundle> {
    if horizon == 0 {
        return Err(SdomError::Config("horizon must be at least one hour".into()));
    }
    let case = CaseDir::open(dir)?;

    let scalars = tables::read_scalars(case.required(logical::SCALARS)?)?;
    let formulations = read_formulation_choices(&case)?;

    let demand_mw = tables::read_hourly(case.required(logical::LOAD)?, horizon)?;
    let nuclear_mw = tables::read_hourly(case.required(logical::NUCLEAR)?, horizon)?;
    let hydro_mw = tables::read_hourly(case.required(logical::HYDRO)?, horizon)?;
    let other_renewables_mw =
        tables::read_hourly(case.required(logical::OTHER_RENEWABLES)?, horizon)?;

    let pv_plants = load_vre_fleet(&case, logical::CF_SOLAR, logical::CAP_SOLAR, horizon)?;
    let wind_plants = load_vre_fleet(&case, logical::CF_WIND, logical::CAP_WIND, horizon)?;

    let storage = load_storage(&case)?;
    let balancing = load_balancing(&case)?;

    let trade = if formulations.trade_enabled() {
        Some(TradeSeries {
            import_cap_mw: tables::read_hourly(case.required(logical::IMPORT_CAP)?, horizon)?,
            import_price: tables::read_hourly(case.required(logical::IMPORT_PRICES)?, horizon)?,
            export_cap_mw: tables::read_hourly(case.required(logical::EXPORT_CAP)?, horizon)?,
            export_price: tables::read_hourly(case.required(logical::EXPORT_PRICES)?, horizon)?,
        })
    } else {
        None
    };

    let hydro_budget = if formulations.hydro.uses_budget() {
        Some(load_hydro_budget(
            &case,
            formulations.hydro,
            &hydro_mw,
            horizon,
        )?)
    } else {
        None
    };

    let system = SystemScalars {
        discount_rate: required_scalar(&scalars, "r")?,
        clean_share_target: required_scalar(&scalars, "GenMix_Target")?,
        alpha_nuclear: optional_scalar(&scalars, "alpha_Nuclear", 1.0),
        alpha_hydro: optional_scalar(&scalars, "alpha_Hydro", 1.0),
        alpha_other: optional_scalar(&scalars, "alpha_OtherRenewables", 1.0),
    };

    let resilience_params = if resilience {
        Some(read_resilience(&scalars, &demand_mw)?)
    } else {
        None
    };

    let factors = InputBundle::derive_factors(system.discount_rate, &storage, &balancing);
    let bundle = InputBundle {
        horizon,
        scalars: system,
        resilience: resilience_params,
        demand_mw,
        nuclear_mw,
        hydro_mw,
        other_renewables_mw,
        pv_plants,
        wind_plants,
        storage,
        balancing,
        formulations,
        trade,
        hydro_budget,
        factors,
    };
    bundle.validate()?;
    info!(
        horizon,
        pv = bundle.pv_plants.len(),
        wind = bundle.wind_plants.len(),
        storage = bundle.storage.len(),
        balancing = bundle.balancing.len(),
        "case loaded"
    );
    Ok(bundle)
}

fn required_scalar(scalars: &HashMap<String, f64>, name: &str) -> SdomResult<f64> {
    scalars
        .get(&normalize(name))
        .copied()
        .ok_or_else(|| SdomError::Config(format!("scalar '{name}' is missing")))
}

fn optional_scalar(scalars: &HashMap<String, f64>, name: &str, default: f64) -> f64 {
    scalars.get(&normalize(name)).copied().unwrap_or(default)
}

fn read_formulation_choices(case: &CaseDir) -> SdomResult<FormulationChoices> {
    let mut choices = FormulationChoices::default();
    for (component, formulation) in tables::read_formulations(case.required(logical::FORMULATIONS)?)? {
        match normalize(&component).as_str() {
            "hydro" => choices.hydro = HydroVariant::parse(&formulation)?,
            "imports" => choices.imports = TradeVariant::parse(&formulation)?,
            "exports" => choices.exports = TradeVariant::parse(&formulation)?,
            other => {
                return Err(SdomError::Config(format!(
                    "unknown formulation component '{other}'"
                )))
            }
        }
    }
    Ok(choices)
}

/// Join a capacity-factor matrix with its capacity/cost table.
///
/// Plants present on only one side carry incomplete data and are dropped
/// with a warning; this is recovery, not failure.
fn load_vre_fleet(
    case: &CaseDir,
    cf_file: &str,
    cap_file: &str,
    horizon: usize,
) -> SdomResult<Vec<VrePlant>> {
    let (cf_ids, cf_columns) = tables::read_cf_matrix(case.required(cf_file)?, horizon)?;
    let rows = tables::read_plant_table(case.required(cap_file)?)?;
    let mut by_id: HashMap<String, PlantRow> =
        rows.into_iter().map(|r| (normalize(&r.id), r)).collect();

    let mut fleet = Vec::with_capacity(cf_ids.len());
    for (id, column) in cf_ids.iter().zip(cf_columns) {
        match by_id.remove(&normalize(id)) {
            Some(row) => fleet.push(VrePlant {
                id: row.id,
                capacity_mw: row.capacity_mw,
                capex_per_mw: per_kw_to_per_mw(row.capex_per_kw),
                fom_per_mw_yr: per_kw_to_per_mw(row.fom_per_kw_yr),
                transmission_capex: row.transmission_capex,
                latitude: row.latitude,
                longitude: row.longitude,
                capacity_factor: column,
            }),
            None => warn!(
                plant = %id,
                table = cap_file,
                "dropping plant with capacity factors but no capacity row"
            ),
        }
    }
    for row in by_id.values() {
        warn!(
            plant = %row.id,
            table = cf_file,
            "dropping plant with a capacity row but no capacity factors"
        );
    }
    Ok(fleet)
}

fn load_storage(case: &CaseDir) -> SdomResult<Vec<StorageTech>> {
    let path = case.required(logical::STORAGE)?;
    let (ids, params) = tables::read_param_table(path)?;
    let p_capex = param_row(&params, "P_Capex", path)?;
    let e_capex = param_row(&params, "E_Capex", path)?;
    let eff = param_row(&params, "Eff", path)?;
    let min_dur = param_row(&params, "Min_Duration", path)?;
    let max_dur = param_row(&params, "Max_Duration", path)?;
    let max_p = param_row(&params, "Max_P", path)?;
    let coupled = param_row(&params, "Coupled", path)?;
    let fom = param_row(&params, "FOM", path)?;
    let vom = param_row(&params, "VOM", path)?;
    let lifetime = param_row(&params, "Lifetime", path)?;
    let cost_ratio = param_row(&params, "CostRatio", path)?;
    let max_cycles = param_row(&params, "MaxCycles", path)?;

    Ok(ids
        .iter()
        .enumerate()
        .map(|(j, id)| StorageTech {
            id: id.clone(),
            power_capex_per_mw: per_kw_to_per_mw(p_capex[j]),
            energy_capex_per_mwh: per_kwh_to_per_mwh(e_capex[j]),
            efficiency: eff[j],
            min_duration_hours: min_dur[j],
            max_duration_hours: max_dur[j],
            max_power_mw: max_p[j],
            coupled: coupled[j] != 0.0,
            fom_per_mw_yr: per_kw_to_per_mw(fom[j]),
            vom_per_mwh: vom[j],
            lifetime_years: lifetime[j],
            cost_ratio: cost_ratio[j],
            max_cycles: max_cycles[j],
        })
        .collect())
}

fn load_balancing(case: &CaseDir) -> SdomResult<Vec<BalancingUnit>> {
    let path = case.required(logical::BALANCING)?;
    let (ids, params) = tables::read_param_table(path)?;
    let min_cap = param_row(&params, "MinCapacity", path)?;
    let max_cap = param_row(&params, "MaxCapacity", path)?;
    let lifetime = param_row(&params, "Lifetime", path)?;
    let capex = param_row(&params, "Capex", path)?;
    let heat_rate = param_row(&params, "HeatRate", path)?;
    let fuel_cost = param_row(&params, "FuelCost", path)?;
    let vom = param_row(&params, "VOM", path)?;
    let fom = param_row(&params, "FOM", path)?;

    Ok(ids
        .iter()
        .enumerate()
        .map(|(k, id)| BalancingUnit {
            id: id.clone(),
            min_capacity_mw: min_cap[k],
            max_capacity_mw: max_cap[k],
            lifetime_years: lifetime[k],
            capex_per_mw: per_kw_to_per_mw(capex[k]),
            heat_rate: heat_rate[k],
            fuel_cost: fuel_cost[k],
            vom_per_mwh: vom[k],
            fom_per_mw_yr: per_kw_to_per_mw(fom[k]),
        })
        .collect())
}

fn load_hydro_budget(
    case: &CaseDir,
    variant: HydroVariant,
    hydro_mw: &[f64],
    horizon: usize,
) -> SdomResult<HydroBudget> {
    let max_mw = tables::read_hourly(case.required(logical::HYDRO_MAX)?, horizon)?;
    let min_mw = tables::read_hourly(case.required(logical::HYDRO_MIN)?, horizon)?;
    let periods = match variant {
        HydroVariant::MonthlyBudget => month_periods(horizon)?,
        HydroVariant::DailyBudget => day_periods(horizon)?,
        HydroVariant::RunOfRiver => Vec::new(),
    };
    let budget_mwh = periods
        .iter()
        .map(|&(start, end)| hydro_mw[start..end].iter().sum())
        .collect();
    Ok(HydroBudget {
        min_mw,
        max_mw,
        periods,
        budget_mwh,
    })
}

/// Partition the horizon into calendar months, anchored at January 1st of a
/// non-leap year. The horizon must end on a month boundary.
fn month_periods(horizon: usize) -> SdomResult<Vec<(usize, usize)>> {
    let anchor = NaiveDate::from_ymd_opt(2019, 1, 1)
        .ok_or_else(|| SdomError::Other("calendar anchor out of range".into()))?;
    let mut periods: Vec<(usize, usize)> = Vec::new();
    let mut current_month = anchor.month();
    let mut start = 0;
    for hour in 0..horizon {
        let date = anchor
            .checked_add_days(Days::new((hour / 24) as u64))
            .ok_or_else(|| SdomError::Other("calendar date out of range".into()))?;
        if date.month() != current_month {
            periods.push((start, hour));
            start = hour;
            current_month = date.month();
        }
    }
    periods.push((start, horizon));
    let (_, last_end) = periods[periods.len() - 1];
    let last_date = anchor
        .checked_add_days(Days::new((last_end / 24) as u64))
        .ok_or_else(|| SdomError::Other("calendar date out of range".into()))?;
    if last_end % 24 != 0 || last_date.day() != 1 {
        return Err(SdomError::Data(format!(
            "horizon of {horizon} hours does not end on a month boundary"
        )));
    }
    Ok(periods)
}

/// Partition the horizon into calendar days.
fn day_periods(horizon: usize) -> SdomResult<Vec<(usize, usize)>> {
    if horizon % 24 != 0 {
        return Err(SdomError::Data(format!(
            "horizon of {horizon} hours is not a whole number of days"
        )));
    }
    Ok((0..horizon / 24).map(|d| (d * 24, (d + 1) * 24)).collect())
}

fn read_resilience(
    scalars: &HashMap<String, f64>,
    demand_mw: &[f64],
) -> SdomResult<ResilienceParams> {
    let peak = demand_mw.iter().copied().fold(0.0, f64::max);
    let critical_peak_load_mw = match scalars.get(&normalize("critical_peak_load")) {
        Some(&load) => load,
        None => {
            let frac = scalars.get(&normalize("CriticalLoadFrac")).ok_or_else(|| {
                SdomError::Config(
                    "resilience needs 'critical_peak_load' or 'CriticalLoadFrac'".into(),
                )
            })?;
            frac * peak
        }
    };
    let duration = required_scalar(scalars, "max_backup_power_dur")?;
    let start = required_scalar(scalars, "outage_start_hour")?;
    let restore = optional_scalar(scalars, "SOC_restore_hours", 0.0);
    if duration < 1.0 || start < 1.0 || restore < 0.0 {
        return Err(SdomError::Data(
            "resilience window scalars must be positive".into(),
        ));
    }
    Ok(ResilienceParams {
        critical_peak_load_mw,
        backup_duration_hours: duration as usize,
        outage_start_hour: start as usize,
        soc_restore_hours: restore as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_case(dir: &Path) {
        let hourly = |n: usize, v: f64| {
            let mut s = String::from("hour,MW\n");
            for h in 1..=n {
                s.push_str(&format!("{h},{v}\n"));
            }
            s
        };
        fs::write(dir.join("Scalars.csv"), "Name,Value\nr,0.06\nGenMix_Target,0.5\n").unwrap();
        fs::write(
            dir.join("Formulations.csv"),
            "Component,Formulation\nhydro,RunOfRiver\nImports,Disabled\nExports,Disabled\n",
        )
        .unwrap();
        fs::write(dir.join("Load_hourly.csv"), hourly(24, 100.0)).unwrap();
        fs::write(dir.join("Nucl_hourly.csv"), hourly(24, 10.0)).unwrap();
        fs::write(dir.join("lahy_hourly.csv"), hourly(24, 5.0)).unwrap();
        fs::write(dir.join("otre_hourly.csv"), hourly(24, 0.0)).unwrap();
        let mut cf = String::from("hour,pv1,ghost\n");
        for h in 1..=24 {
            cf.push_str(&format!("{h},0.5,0.5\n"));
        }
        fs::write(dir.join("CFSolar.csv"), cf).unwrap();
        fs::write(
            dir.join("CapSolar.csv"),
            "id,MW,Capex,FOM,TransCost,Lat,Lon\npv1,50,800,15,1000000,35,-106\n",
        )
        .unwrap();
        let mut wind_cf = String::from("hour,w1\n");
        for h in 1..=24 {
            wind_cf.push_str(&format!("{h},0.4\n"));
        }
        fs::write(dir.join("CFWind.csv"), wind_cf).unwrap();
        fs::write(
            dir.join("CapWind.csv"),
            "id,MW,Capex,FOM,TransCost,Lat,Lon\nw1,80,1200,30,2000000,42,-95\n",
        )
        .unwrap();
        fs::write(
            dir.join("StorageData.csv"),
            "Parameter,battery\nP_Capex,200\nE_Capex,150\nEff,0.85\nMin_Duration,1\nMax_Duration,10\nMax_P,500\nCoupled,1\nFOM,8\nVOM,1\nLifetime,15\nCostRatio,0.5\nMaxCycles,5000\n",
        )
        .unwrap();
        fs::write(
            dir.join("Data_BalancingUnits.csv"),
            "Parameter,ccgt\nMinCapacity,0\nMaxCapacity,1000\nLifetime,25\nCapex,900\nHeatRate,6.5\nFuelCost,3\nVOM,2\nFOM,10\n",
        )
        .unwrap();
    }

    #[test]
    fn test_load_case_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        write_case(dir.path());
        let bundle = load_case(dir.path(), 24, false).unwrap();
        assert_eq!(bundle.horizon, 24);
        // the ghost plant has no capacity row and is dropped
        assert_eq!(bundle.pv_plants.len(), 1);
        assert_eq!(bundle.pv_plants[0].id, "pv1");
        // $/kW → $/MW
        assert_eq!(bundle.pv_plants[0].capex_per_mw, 800_000.0);
        assert_eq!(bundle.storage[0].energy_capex_per_mwh, 150_000.0);
        assert!(bundle.storage[0].coupled);
        assert_eq!(bundle.balancing[0].marginal_cost(), 6.5 * 3.0 + 2.0);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        write_case(dir.path());
        fs::remove_file(dir.path().join("StorageData.csv")).unwrap();
        let err = load_case(dir.path(), 24, false).unwrap_err();
        assert!(matches!(err, SdomError::Config(_)));
    }

    #[test]
    fn test_month_periods_single_january() {
        let periods = month_periods(744).unwrap();
        assert_eq!(periods, vec![(0, 744)]);
    }

    #[test]
    fn test_month_periods_full_year() {
        let periods = month_periods(8760).unwrap();
        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0], (0, 744));
        assert_eq!(periods[1], (744, 744 + 672));
        assert_eq!(periods[11].1, 8760);
    }

    #[test]
    fn test_month_periods_reject_partial_month() {
        assert!(month_periods(100).is_err());
    }

    #[test]
    fn test_day_periods() {
        assert_eq!(day_periods(48).unwrap(), vec![(0, 24), (24, 48)]);
        assert!(day_periods(36).is_err());
    }
}
