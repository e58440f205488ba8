//! Quantum gate types and their matrices.

use ndarray::{Array2, arr2};
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{IrError, IrResult};
use crate::parameter::ParameterExpression;

/// Standard gates with known semantics.
///
/// The set is deliberately small: the Pauli axes, the Clifford rotations
/// used by measurement-basis changes, the parameterized rotations used by
/// variational ansätze, and the common entanglers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis: `diag(e^{−iθ/2}, e^{iθ/2})`.
    Rz(ParameterExpression),
    /// Phase gate: `diag(1, e^{iθ})`.
    P(ParameterExpression),
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// SWAP gate.
    Swap,
    /// ZZ rotation gate: `exp(−iθ/2 · Z⊗Z)`.
    RZZ(ParameterExpression),
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::Swap => "swap",
            StandardGate::RZZ(_) => "rzz",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::Swap
            | StandardGate::RZZ(_) => 2,
        }
    }

    /// Check if this gate carries a free symbolic parameter.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get the parameter expressions of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::RZZ(p) => vec![p],
            _ => vec![],
        }
    }

    /// Return a copy with every parameter bound through `values`.
    pub fn bind_all(&self, values: &FxHashMap<String, f64>) -> Self {
        self.map_parameters(|p| p.bind_all(values).simplify())
    }

    /// Return a copy with `name → name + delta` substituted in every parameter.
    pub fn shifted(&self, name: &str, delta: f64) -> Self {
        self.map_parameters(|p| p.shifted(name, delta))
    }

    fn map_parameters(&self, f: impl Fn(&ParameterExpression) -> ParameterExpression) -> Self {
        match self {
            StandardGate::Rx(p) => StandardGate::Rx(f(p)),
            StandardGate::Ry(p) => StandardGate::Ry(f(p)),
            StandardGate::Rz(p) => StandardGate::Rz(f(p)),
            StandardGate::P(p) => StandardGate::P(f(p)),
            StandardGate::RZZ(p) => StandardGate::RZZ(f(p)),
            _ => self.clone(),
        }
    }

    /// The unitary matrix of this gate.
    ///
    /// For two-qubit gates, operand 0 is the least-significant bit of the
    /// local basis index. Errors if a parameter is still symbolic.
    pub fn matrix(&self) -> IrResult<Array2<Complex64>> {
        let m = match self {
            StandardGate::I => arr2(&[[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(1.0, 0.0)]]),
            StandardGate::X => arr2(&[[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]),
            StandardGate::Y => arr2(&[[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]]),
            StandardGate::Z => arr2(&[[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]]),
            StandardGate::H => {
                let s = 1.0 / 2.0_f64.sqrt();
                arr2(&[[c(s, 0.0), c(s, 0.0)], [c(s, 0.0), c(-s, 0.0)]])
            }
            StandardGate::S => arr2(&[[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, 1.0)]]),
            StandardGate::Sdg => arr2(&[[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, -1.0)]]),
            StandardGate::T => phase_matrix(PI / 4.0),
            StandardGate::Tdg => phase_matrix(-PI / 4.0),
            StandardGate::Rx(p) => {
                let theta = self.require_bound(p)?;
                let (cos, sin) = ((theta / 2.0).cos(), (theta / 2.0).sin());
                arr2(&[[c(cos, 0.0), c(0.0, -sin)], [c(0.0, -sin), c(cos, 0.0)]])
            }
            StandardGate::Ry(p) => {
                let theta = self.require_bound(p)?;
                let (cos, sin) = ((theta / 2.0).cos(), (theta / 2.0).sin());
                arr2(&[[c(cos, 0.0), c(-sin, 0.0)], [c(sin, 0.0), c(cos, 0.0)]])
            }
            StandardGate::Rz(p) => {
                let theta = self.require_bound(p)?;
                arr2(&[
                    [Complex64::from_polar(1.0, -theta / 2.0), c(0.0, 0.0)],
                    [c(0.0, 0.0), Complex64::from_polar(1.0, theta / 2.0)],
                ])
            }
            StandardGate::P(p) => {
                let theta = self.require_bound(p)?;
                phase_matrix(theta)
            }
            StandardGate::CX => {
                let mut m = Array2::zeros((4, 4));
                m[[0, 0]] = c(1.0, 0.0);
                m[[2, 2]] = c(1.0, 0.0);
                m[[3, 1]] = c(1.0, 0.0);
                m[[1, 3]] = c(1.0, 0.0);
                m
            }
            StandardGate::CY => {
                let mut m = Array2::zeros((4, 4));
                m[[0, 0]] = c(1.0, 0.0);
                m[[2, 2]] = c(1.0, 0.0);
                m[[3, 1]] = c(0.0, 1.0);
                m[[1, 3]] = c(0.0, -1.0);
                m
            }
            StandardGate::CZ => {
                let mut m = Array2::eye(4);
                m[[3, 3]] = c(-1.0, 0.0);
                m
            }
            StandardGate::Swap => {
                let mut m = Array2::zeros((4, 4));
                m[[0, 0]] = c(1.0, 0.0);
                m[[3, 3]] = c(1.0, 0.0);
                m[[2, 1]] = c(1.0, 0.0);
                m[[1, 2]] = c(1.0, 0.0);
                m
            }
            StandardGate::RZZ(p) => {
                let theta = self.require_bound(p)?;
                let inner = Complex64::from_polar(1.0, theta / 2.0);
                let outer = Complex64::from_polar(1.0, -theta / 2.0);
                let mut m = Array2::zeros((4, 4));
                m[[0, 0]] = outer;
                m[[1, 1]] = inner;
                m[[2, 2]] = inner;
                m[[3, 3]] = outer;
                m
            }
        };
        Ok(m)
    }

    /// The inverse gate.
    pub fn inverse(&self) -> Self {
        match self {
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::Rx(p) => StandardGate::Rx(-p.clone()),
            StandardGate::Ry(p) => StandardGate::Ry(-p.clone()),
            StandardGate::Rz(p) => StandardGate::Rz(-p.clone()),
            StandardGate::P(p) => StandardGate::P(-p.clone()),
            StandardGate::RZZ(p) => StandardGate::RZZ(-p.clone()),
            // Self-inverse gates.
            _ => self.clone(),
        }
    }

    fn require_bound(&self, p: &ParameterExpression) -> IrResult<f64> {
        p.as_f64().ok_or_else(|| {
            let name = p
                .symbols()
                .into_iter()
                .next()
                .unwrap_or_else(|| self.name().to_string());
            IrError::UnboundParameter(name)
        })
    }
}

#[inline]
fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn phase_matrix(theta: f64) -> Array2<Complex64> {
    arr2(&[
        [c(1.0, 0.0), c(0.0, 0.0)],
        [c(0.0, 0.0), Complex64::from_polar(1.0, theta)],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn test_gate_arity() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::RZZ(0.5.into()).num_qubits(), 2);
    }

    #[test]
    fn test_unbound_parameter_matrix_errors() {
        let gate = StandardGate::Rx(ParameterExpression::symbol("theta"));
        assert!(matches!(
            gate.matrix(),
            Err(IrError::UnboundParameter(name)) if name == "theta"
        ));
    }

    #[test]
    fn test_rz_convention() {
        let m = StandardGate::Rz(ParameterExpression::constant(PI)).matrix().unwrap();
        assert!(approx(m[[0, 0]], Complex64::from_polar(1.0, -PI / 2.0)));
        assert!(approx(m[[1, 1]], Complex64::from_polar(1.0, PI / 2.0)));
    }

    #[test]
    fn test_hadamard_is_self_inverse() {
        let h = StandardGate::H.matrix().unwrap();
        let prod = h.dot(&h);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { c(1.0, 0.0) } else { c(0.0, 0.0) };
                assert!(approx(prod[[i, j]], expected));
            }
        }
    }

    #[test]
    fn test_cx_flips_target_when_control_set() {
        // Operand 0 (control) is the least-significant bit: |01⟩ (index 1) → |11⟩ (index 3).
        let m = StandardGate::CX.matrix().unwrap();
        assert!(approx(m[[3, 1]], c(1.0, 0.0)));
        assert!(approx(m[[1, 3]], c(1.0, 0.0)));
        assert!(approx(m[[2, 2]], c(1.0, 0.0)));
    }

    #[test]
    fn test_bind_all() {
        let gate = StandardGate::Ry(ParameterExpression::symbol("a"));
        let values: FxHashMap<String, f64> = [("a".to_string(), 1.0)].into_iter().collect();
        assert!(!gate.bind_all(&values).is_parameterized());
    }
}
