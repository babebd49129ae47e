//! Unified error types for the SDOM ecosystem
//!
//! This module provides a common error type [`SdomError`] that can represent
//! errors from any part of the system: case loading, input validation, model
//! assembly and solving. Domain-specific failures are converted to
//! `SdomError` for uniform handling at API boundaries.

use thiserror::Error;

/// Unified error type for all SDOM operations.
#[derive(Error, Debug)]
pub enum SdomError {
    /// I/O errors (file access, directory scans, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing input file, unknown formulation, bad settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// An input table violates a model invariant
    #[error("Data error: {0}")]
    Data(String),

    /// Malformed cell, header or row in an input table
    #[error("Parse error: {0}")]
    Parse(String),

    /// Solver backend failed (missing binary, crash, numerical breakdown)
    #[error("Solver error: {0}")]
    Solver(String),

    /// The solver proved the problem infeasible
    #[error("Problem infeasible: {0}")]
    Infeasible(String),

    /// The solver proved the problem unbounded
    #[error("Problem unbounded: {0}")]
    Unbounded(String),

    /// The solver stopped on its wall-clock limit
    #[error("Solver time limit reached: {0}")]
    Timeout(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using SdomError.
pub type SdomResult<T> = Result<T, SdomError>;

impl From<String> for SdomError {
    fn from(s: String) -> Self {
        SdomError::Other(s)
    }
}

impl From<&str> for SdomError {
    fn from(s: &str) -> Self {
        SdomError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdomError::Config("missing scalars table".into());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("missing scalars table"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let sdom_err: SdomError = io_err.into();
        assert!(matches!(sdom_err, SdomError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> SdomResult<()> {
            Err(SdomError::Data("efficiency above one".into()))
        }

        fn outer() -> SdomResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
