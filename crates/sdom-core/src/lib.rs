//! # sdom-core: shared foundation for the storage deployment model
//!
//! Home of the unified error type, the validated [`InputBundle`] consumed by
//! the formulation layer, and the small amount of financial and unit
//! arithmetic shared across the workspace.

pub mod error;
pub mod finance;
pub mod input;
pub mod units;

pub use error::{SdomError, SdomResult};
pub use input::{
    BalancingUnit, DerivedFactors, FormulationChoices, HydroBudget, HydroVariant, InputBundle,
    ResilienceParams, StorageTech, SystemScalars, TradeSeries, TradeVariant, VrePlant,
};
