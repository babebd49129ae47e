//! # sdom-io: case-directory loading for the storage deployment model
//!
//! Turns a flat directory of CSV tables into the validated
//! [`sdom_core::InputBundle`] the formulation layer consumes. File-name
//! matching is case- and separator-insensitive; schemas are documented in
//! [`tables`].

pub mod bundle;
pub mod case;
pub mod tables;

pub use bundle::load_case;
pub use case::CaseDir;
