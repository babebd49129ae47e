//! Model composition: registry + formulations + objective + constraints.
//!
//! Assembly order is fixed (inputs → symbols → variant declarations →
//! objective → constraints) so two builds of the same bundle produce
//! byte-identical model data.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use sdom_core::{InputBundle, SdomError, SdomResult};

use crate::constraints::emit_system_constraints;
use crate::expr::{ConstraintRow, LinExpr};
use crate::formulations::{self, FormulationSet};
use crate::objective::assemble_objective;
use crate::registry::{SymbolRegistry, VarSpec};

/// Build options for one model instance.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Case name, used to stamp output files.
    pub name: String,
    /// Run the two-stage resilience workflow instead of a single solve.
    pub resilience: bool,
}

/// One buildable, solvable model instance.
///
/// The instance owns its symbol registry and constraint list for its entire
/// solve; the two-stage workflow edits bounds on the registry in place and
/// re-emits constraints, but never recreates a variable.
#[derive(Debug)]
pub struct SdomModel {
    pub name: String,
    pub resilience: bool,
    pub registry: SymbolRegistry,
    pub formulations: FormulationSet,
    pub objective: LinExpr,
    pub constraints: Vec<ConstraintRow>,
}

/// Assemble a model from a validated bundle.
pub fn build_model(bundle: Arc<InputBundle>, options: ModelOptions) -> SdomResult<SdomModel> {
    if options.resilience && bundle.resilience.is_none() {
        return Err(SdomError::Config(
            "resilience solve requested but the case carries no resilience scalars".into(),
        ));
    }

    let formulations = formulations::select(&bundle)?;
    let mut registry = SymbolRegistry::new(bundle);
    formulations.hydro.declare_variables(&mut registry);
    formulations.trade.declare_variables(&mut registry);

    let objective = assemble_objective(&registry, &formulations);
    let constraints = emit_system_constraints(&registry, &formulations);

    info!(
        hydro = formulations.hydro.id(),
        trade = formulations.trade.id(),
        variables = registry.num_variables(),
        binaries = registry.num_binaries(),
        constraints = constraints.len(),
        "model assembled"
    );

    Ok(SdomModel {
        name: options.name,
        resilience: options.resilience,
        registry,
        formulations,
        objective,
        constraints,
    })
}

#[derive(Serialize)]
struct DebugModel<'a> {
    variables: Vec<&'a VarSpec>,
    objective: &'a LinExpr,
    constraints: &'a [ConstraintRow],
}

impl SdomModel {
    /// Re-emit the default constraint list against the registry's current
    /// parameter overrides.
    pub fn rebuild_constraints(&mut self) {
        self.constraints = emit_system_constraints(&self.registry, &self.formulations);
    }

    /// Dump the model data as JSON for golden-model comparisons.
    pub fn write_lp_debug(&self, path: &Path) -> SdomResult<()> {
        let debug = DebugModel {
            variables: self.registry.variables().collect(),
            objective: &self.objective,
            constraints: &self.constraints,
        };
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &debug)
            .map_err(|e| SdomError::Other(format!("debug dump failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::test_bundle;

    #[test]
    fn test_build_produces_a_complete_model() {
        let model = build_model(
            test_bundle(4),
            ModelOptions {
                name: "tiny".into(),
                resilience: false,
            },
        )
        .unwrap();
        assert!(!model.constraints.is_empty());
        assert!(!model.objective.is_empty());
        assert_eq!(model.registry.num_binaries(), 4);
    }

    #[test]
    fn test_resilience_without_scalars_is_config_error() {
        let err = build_model(
            test_bundle(4),
            ModelOptions {
                name: "tiny".into(),
                resilience: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SdomError::Config(_)));
    }

    #[test]
    fn test_debug_dump_round_trips_as_json() {
        let model = build_model(
            test_bundle(2),
            ModelOptions {
                name: "tiny".into(),
                resilience: false,
            },
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model.write_lp_debug(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["variables"].as_array().unwrap().len() >= 2);
    }
}
