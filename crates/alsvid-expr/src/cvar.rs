//! Conditional-value-at-risk measurements.
//!
//! A CVaR measurement aggregates only the tail of an outcome distribution:
//! the lowest-eigenvalue outcomes up to probability mass α. It is not a
//! linear functional — it has no adjoint — but it shares the measurement
//! interface so the sampler and driver treat it like any other measurement.

use num_complex::Complex64;
use std::fmt;

use crate::error::{ExprError, ExprResult};
use crate::expr::Expr;

/// A risk-weighted measurement over a diagonal observable.
#[derive(Debug, Clone, PartialEq)]
pub struct CVarMeasurement {
    primitive: Box<Expr>,
    coeff: Complex64,
    alpha: f64,
}

impl CVarMeasurement {
    /// Create a CVaR measurement of `observable` with confidence level
    /// `alpha ∈ (0, 1]`.
    ///
    /// `alpha = 1` reduces to the ordinary expectation; `alpha → 0⁺`
    /// approaches the minimum observed eigenvalue.
    pub fn new(observable: Expr, alpha: f64) -> ExprResult<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ExprError::InvalidAlpha(alpha));
        }
        Ok(Self {
            primitive: Box::new(observable),
            coeff: Complex64::new(1.0, 0.0),
            alpha,
        })
    }

    /// The confidence level α.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The underlying observable.
    pub fn primitive(&self) -> &Expr {
        &self.primitive
    }

    /// The coefficient.
    pub fn coeff(&self) -> Complex64 {
        self.coeff
    }

    /// Return a copy scaled by `scalar`.
    #[must_use]
    pub fn scaled(&self, scalar: Complex64) -> Self {
        Self {
            primitive: self.primitive.clone(),
            coeff: self.coeff * scalar,
            alpha: self.alpha,
        }
    }

    pub(crate) fn with_coeff(&self, coeff: Complex64) -> Self {
        Self {
            primitive: self.primitive.clone(),
            coeff,
            alpha: self.alpha,
        }
    }

    /// Rebuild with a rewritten observable (used by converters).
    #[must_use]
    pub fn with_primitive(&self, observable: Expr) -> Self {
        Self {
            primitive: Box::new(observable),
            coeff: self.coeff,
            alpha: self.alpha,
        }
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.primitive.num_qubits()
    }

    /// Evaluate the CVaR of the observable over a sampled state.
    ///
    /// Outcomes are sorted ascending by their diagonal eigenvalue
    /// `h_b = ⟨b|O|b⟩`; probability mass accumulates from the bottom until
    /// it first exceeds α at index `j`, and the result is
    /// `(Σ_{i<j} p_i·(h_i − h_j) + α·h_j) / α`.
    pub fn eval_with(&self, front: &Expr) -> ExprResult<Complex64> {
        let state = match front {
            Expr::State(s) if !s.is_measurement() => s,
            _ => {
                return Err(ExprError::EvalNotScalar(
                    "a CVaR measurement against a non-state operand",
                ));
            }
        };
        if state.num_qubits() != self.num_qubits() {
            return Err(ExprError::QubitCountMismatch {
                op: "evaluate",
                left: self.num_qubits(),
                right: state.num_qubits(),
            });
        }

        // (probability, eigenvalue) per observed outcome. Amplitudes come
        // from the sampler as square roots of frequencies, so the
        // probability is the squared magnitude.
        let mut outcomes = Vec::new();
        for (bitstring, amp) in state.outcomes()? {
            let p = (amp * amp.conj()).re;
            let h = self.primitive.expectation_of_bitstring(&bitstring)?.re;
            outcomes.push((p, h));
        }
        if outcomes.is_empty() {
            return Err(ExprError::EvalNotScalar(
                "a CVaR measurement over an empty outcome distribution",
            ));
        }
        outcomes.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut j = 0;
        let mut running_total = 0.0;
        for (i, (p, _)) in outcomes.iter().enumerate() {
            running_total += p;
            j = i;
            if running_total > self.alpha {
                break;
            }
        }

        let h_j = outcomes[j].1;
        let mut cvar = self.alpha * h_j;
        for (p_i, h_i) in &outcomes[..j] {
            cvar += p_i * (h_i - h_j);
        }

        Ok(Complex64::new(cvar / self.alpha, 0.0) * self.coeff)
    }
}

impl fmt::Display for CVarMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coeff == Complex64::new(1.0, 0.0) {
            write!(f, "CVaR[α={}]({})", self.alpha, self.primitive)
        } else {
            write!(f, "{} * CVaR[α={}]({})", self.coeff, self.alpha, self.primitive)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_validation() {
        let z = Expr::pauli("Z").unwrap();
        assert!(matches!(
            CVarMeasurement::new(z.clone(), 0.0),
            Err(ExprError::InvalidAlpha(_))
        ));
        assert!(matches!(
            CVarMeasurement::new(z.clone(), 1.5),
            Err(ExprError::InvalidAlpha(_))
        ));
        assert!(CVarMeasurement::new(z, 1.0).is_ok());
    }
}
