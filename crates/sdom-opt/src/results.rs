//! Result extraction: primal values into tabular views.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::RawSolution;
use crate::expr::VarId;
use crate::model::SdomModel;
use crate::objective;

/// Problem sizes reported alongside every solve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProblemStatistics {
    pub variables: usize,
    pub binaries: usize,
    pub constraints: usize,
}

/// One metric/technology/value/unit summary line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub metric: String,
    pub technology: String,
    pub value: f64,
    pub unit: String,
}

/// Per-hour system dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRow {
    pub hour: usize,
    pub demand_mw: f64,
    pub nuclear_mw: f64,
    pub hydro_mw: f64,
    pub other_renewables_mw: f64,
    pub pv_mw: f64,
    pub pv_curtailed_mw: f64,
    pub wind_mw: f64,
    pub wind_curtailed_mw: f64,
    pub balancing_mw: f64,
    pub storage_net_mw: f64,
    pub import_mw: f64,
    pub export_mw: f64,
}

/// Per-hour, per-technology storage operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageRow {
    pub hour: usize,
    pub technology: String,
    pub charge_mw: f64,
    pub discharge_mw: f64,
    pub soc_mwh: f64,
}

/// Per-hour, per-unit balancing dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalRow {
    pub hour: usize,
    pub unit: String,
    pub generation_mw: f64,
}

/// Per-plant build decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledPlantRow {
    pub id: String,
    pub technology: String,
    pub build_fraction: f64,
    pub capacity_mw: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything read out of a solved model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    pub name: String,
    pub total_cost: f64,
    /// Annual cost by objective term; sums to `total_cost` by construction.
    pub cost_breakdown: BTreeMap<String, f64>,
    pub summary: Vec<SummaryRow>,
    pub generation: Vec<GenerationRow>,
    pub storage: Vec<StorageRow>,
    pub thermal: Vec<ThermalRow>,
    pub installed_plants: Vec<InstalledPlantRow>,
    pub statistics: ProblemStatistics,
}

/// Populate the result views from a solved model.
pub fn extract_results(
    model: &SdomModel,
    solution: &RawSolution,
    statistics: ProblemStatistics,
) -> RunResults {
    let registry = &model.registry;
    let bundle = registry.bundle();
    let horizon = registry.horizon();
    let value = |id: VarId| solution.values[id.index()];

    let mut cost_breakdown = BTreeMap::new();
    for (name, term) in objective::cost_terms(registry, &model.formulations) {
        cost_breakdown.insert(name, term.evaluate(&solution.values));
    }

    let hydro_mw = |h: usize| {
        if registry.hydro_dispatch.is_empty() {
            registry.alpha_hydro() * bundle.hydro_mw[h]
        } else {
            value(registry.hydro_dispatch[h])
        }
    };

    let mut generation = Vec::with_capacity(horizon);
    for h in 0..horizon {
        let balancing_mw: f64 = registry
            .balancing_dispatch
            .iter()
            .map(|dispatch| value(dispatch[h]))
            .sum();
        let storage_net_mw: f64 = (0..bundle.storage.len())
            .map(|j| value(registry.discharge[j][h]) - value(registry.charge[j][h]))
            .sum();
        generation.push(GenerationRow {
            hour: h + 1,
            demand_mw: registry.demand(h),
            nuclear_mw: registry.alpha_nuclear() * bundle.nuclear_mw[h],
            hydro_mw: hydro_mw(h),
            other_renewables_mw: registry.alpha_other() * bundle.other_renewables_mw[h],
            pv_mw: value(registry.pv_generation[h]),
            pv_curtailed_mw: value(registry.pv_curtailment[h]),
            wind_mw: value(registry.wind_generation[h]),
            wind_curtailed_mw: value(registry.wind_curtailment[h]),
            balancing_mw,
            storage_net_mw,
            import_mw: registry.imports.get(h).map_or(0.0, |&id| value(id)),
            export_mw: registry.exports.get(h).map_or(0.0, |&id| value(id)),
        });
    }

    let mut storage = Vec::with_capacity(horizon * bundle.storage.len());
    for h in 0..horizon {
        for (j, tech) in bundle.storage.iter().enumerate() {
            storage.push(StorageRow {
                hour: h + 1,
                technology: tech.id.clone(),
                charge_mw: value(registry.charge[j][h]),
                discharge_mw: value(registry.discharge[j][h]),
                soc_mwh: value(registry.soc[j][h]),
            });
        }
    }

    let mut thermal = Vec::with_capacity(horizon * bundle.balancing.len());
    for h in 0..horizon {
        for (k, unit) in bundle.balancing.iter().enumerate() {
            thermal.push(ThermalRow {
                hour: h + 1,
                unit: unit.id.clone(),
                generation_mw: value(registry.balancing_dispatch[k][h]),
            });
        }
    }

    let mut installed_plants = Vec::new();
    for (technology, plants, build) in [
        ("pv", &bundle.pv_plants, &registry.pv_build),
        ("wind", &bundle.wind_plants, &registry.wind_build),
    ] {
        for (plant, &var) in plants.iter().zip(build.iter()) {
            let fraction = value(var);
            installed_plants.push(InstalledPlantRow {
                id: plant.id.clone(),
                technology: technology.to_string(),
                build_fraction: fraction,
                capacity_mw: fraction * plant.capacity_mw,
                latitude: plant.latitude,
                longitude: plant.longitude,
            });
        }
    }

    let summary = build_summary(model, solution, &generation);

    RunResults {
        name: model.name.clone(),
        total_cost: solution.objective,
        cost_breakdown,
        summary,
        generation,
        storage,
        thermal,
        installed_plants,
        statistics,
    }
}

fn build_summary(
    model: &SdomModel,
    solution: &RawSolution,
    generation: &[GenerationRow],
) -> Vec<SummaryRow> {
    let registry = &model.registry;
    let bundle = registry.bundle();
    let value = |id: VarId| solution.values[id.index()];
    let mut rows = Vec::new();
    let push = |rows: &mut Vec<SummaryRow>, metric: &str, technology: &str, v: f64, unit: &str| {
        rows.push(SummaryRow {
            metric: metric.to_string(),
            technology: technology.to_string(),
            value: v,
            unit: unit.to_string(),
        });
    };

    push(&mut rows, "total_cost", "system", solution.objective, "$/yr");

    let pv_mw: f64 = bundle
        .pv_plants
        .iter()
        .zip(&registry.pv_build)
        .map(|(p, &v)| p.capacity_mw * value(v))
        .sum();
    push(&mut rows, "installed_capacity", "pv", pv_mw, "MW");
    let wind_mw: f64 = bundle
        .wind_plants
        .iter()
        .zip(&registry.wind_build)
        .map(|(p, &v)| p.capacity_mw * value(v))
        .sum();
    push(&mut rows, "installed_capacity", "wind", wind_mw, "MW");
    for (k, unit) in bundle.balancing.iter().enumerate() {
        push(
            &mut rows,
            "installed_capacity",
            &unit.id,
            value(registry.balancing_capacity[k]),
            "MW",
        );
    }
    for (j, tech) in bundle.storage.iter().enumerate() {
        push(
            &mut rows,
            "installed_charge_power",
            &tech.id,
            value(registry.charge_power[j]),
            "MW",
        );
        push(
            &mut rows,
            "installed_discharge_power",
            &tech.id,
            value(registry.discharge_power[j]),
            "MW",
        );
        push(
            &mut rows,
            "installed_energy",
            &tech.id,
            value(registry.energy_capacity[j]),
            "MWh",
        );
    }

    for (metric, total) in [
        ("generation", generation.iter().map(|r| r.pv_mw).sum::<f64>()),
        ("curtailment", generation.iter().map(|r| r.pv_curtailed_mw).sum()),
    ] {
        push(&mut rows, metric, "pv", total, "MWh");
    }
    for (metric, total) in [
        ("generation", generation.iter().map(|r| r.wind_mw).sum::<f64>()),
        ("curtailment", generation.iter().map(|r| r.wind_curtailed_mw).sum()),
    ] {
        push(&mut rows, metric, "wind", total, "MWh");
    }
    push(
        &mut rows,
        "generation",
        "nuclear",
        generation.iter().map(|r| r.nuclear_mw).sum(),
        "MWh",
    );
    push(
        &mut rows,
        "generation",
        "hydro",
        generation.iter().map(|r| r.hydro_mw).sum(),
        "MWh",
    );
    push(
        &mut rows,
        "generation",
        "other_renewables",
        generation.iter().map(|r| r.other_renewables_mw).sum(),
        "MWh",
    );
    push(
        &mut rows,
        "generation",
        "balancing",
        generation.iter().map(|r| r.balancing_mw).sum(),
        "MWh",
    );
    for (j, tech) in bundle.storage.iter().enumerate() {
        let discharged: f64 = registry.discharge[j].iter().map(|&id| value(id)).sum();
        push(&mut rows, "discharged_energy", &tech.id, discharged, "MWh");
    }
    push(
        &mut rows,
        "imports",
        "trade",
        generation.iter().map(|r| r.import_mw).sum(),
        "MWh",
    );
    push(
        &mut rows,
        "exports",
        "trade",
        generation.iter().map(|r| r.export_mw).sum(),
        "MWh",
    );

    rows
}
