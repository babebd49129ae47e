//! Linear algebra over registry variables.
//!
//! The model is pure data: expressions and constraint rows reference
//! variables by [`VarId`] and are lowered into a solver backend only at
//! solve time. Keeping them as plain serializable structs makes golden-model
//! comparisons and debug dumps trivial.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Index of a variable in the symbol registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A sparse linear expression `Σ coeff·var + constant`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinExpr {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coeff: f64) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        if coeff != 0.0 {
            self.terms.push((var, coeff));
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate against a dense value vector indexed by `VarId`.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        LinExpr::term(var, 1.0)
    }
}

impl Add for LinExpr {
    type Output = LinExpr;
    fn add(mut self, rhs: LinExpr) -> LinExpr {
        self += rhs;
        self
    }
}

impl AddAssign for LinExpr {
    fn add_assign(&mut self, rhs: LinExpr) {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl Sub for LinExpr {
    type Output = LinExpr;
    fn sub(mut self, rhs: LinExpr) -> LinExpr {
        self -= rhs;
        self
    }
}

impl SubAssign for LinExpr {
    fn sub_assign(&mut self, rhs: LinExpr) {
        self.terms
            .extend(rhs.terms.into_iter().map(|(v, c)| (v, -c)));
        self.constant -= rhs.constant;
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;
    fn neg(mut self) -> LinExpr {
        for (_, coeff) in &mut self.terms {
            *coeff = -*coeff;
        }
        self.constant = -self.constant;
        self
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;
    fn mul(mut self, scale: f64) -> LinExpr {
        for (_, coeff) in &mut self.terms {
            *coeff *= scale;
        }
        self.constant *= scale;
        self
    }
}

impl Mul<VarId> for f64 {
    type Output = LinExpr;
    fn mul(self, var: VarId) -> LinExpr {
        LinExpr::term(var, self)
    }
}

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    LessEq,
    GreaterEq,
    Equal,
}

/// One emitted constraint: `expr ⋈ rhs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintRow {
    /// Stable human-readable label, e.g. `soc[battery,17]`. Labels follow
    /// set-iteration order so solver logs are reproducible.
    pub label: String,
    pub expr: LinExpr,
    pub comparator: Comparator,
    pub rhs: f64,
}

impl ConstraintRow {
    pub fn less_eq(label: impl Into<String>, expr: LinExpr, rhs: f64) -> Self {
        Self {
            label: label.into(),
            expr,
            comparator: Comparator::LessEq,
            rhs,
        }
    }

    pub fn greater_eq(label: impl Into<String>, expr: LinExpr, rhs: f64) -> Self {
        Self {
            label: label.into(),
            expr,
            comparator: Comparator::GreaterEq,
            rhs,
        }
    }

    pub fn equal(label: impl Into<String>, expr: LinExpr, rhs: f64) -> Self {
        Self {
            label: label.into(),
            expr,
            comparator: Comparator::Equal,
            rhs,
        }
    }

    /// Whether a candidate point satisfies the row to the given tolerance.
    pub fn satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.comparator {
            Comparator::LessEq => lhs <= self.rhs + tolerance,
            Comparator::GreaterEq => lhs >= self.rhs - tolerance,
            Comparator::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_arithmetic() {
        let x = VarId(0);
        let y = VarId(1);
        let expr = (2.0 * x + LinExpr::term(y, 3.0) - LinExpr::constant(1.0)) * 2.0;
        assert_eq!(expr.evaluate(&[1.0, 1.0]), 8.0);
        assert_eq!((-expr).evaluate(&[1.0, 1.0]), -8.0);
    }

    #[test]
    fn test_zero_coefficients_are_dropped() {
        let mut expr = LinExpr::zero();
        expr.add_term(VarId(0), 0.0);
        assert!(expr.is_empty());
    }

    #[test]
    fn test_constraint_satisfaction() {
        let x = VarId(0);
        let row = ConstraintRow::less_eq("cap", LinExpr::from(x), 5.0);
        assert!(row.satisfied(&[5.0], 1e-9));
        assert!(!row.satisfied(&[5.1], 1e-9));
    }
}
