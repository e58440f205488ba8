//! Rewriting Pauli measurements into the computational basis.
//!
//! A shot-based backend can only sample Z-basis outcomes. Measuring an X or
//! Y axis therefore becomes: append the basis rotation to the state circuit
//! (`H` for X, `S† H` for Y), and measure the diagonalized Pauli instead.
//! Each group of qubit-wise commuting terms shares one rotated circuit.

use num_complex::Complex64;

use alsvid_ir::{Circuit, QubitId};

use crate::convert::grouping::{group_terms, pauli_terms};
use crate::error::{ExprError, ExprResult};
use crate::expr::Expr;
use crate::list_op::{CombineRule, ListOp};
use crate::pauli::{PauliAxis, PauliString};
use crate::primitive::PrimitiveOp;
use crate::state_fn::{StateFn, StatePrimitive};

/// Rewrites `measurement(Pauli sum) ∘ circuit-state` compositions into
/// diagonal measurements over rotated circuit states.
#[derive(Debug, Clone, Copy)]
pub struct PauliBasisChange {
    grouping: bool,
}

impl Default for PauliBasisChange {
    fn default() -> Self {
        Self::new()
    }
}

impl PauliBasisChange {
    /// Create a basis changer with qubit-wise grouping enabled.
    pub fn new() -> Self {
        Self { grouping: true }
    }

    /// Enable or disable grouping (one circuit per term when disabled).
    #[must_use]
    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.grouping = grouping;
        self
    }

    /// Rewrite the measurement compositions inside `expr`.
    ///
    /// Compositions whose state is not a circuit, or whose measurement is
    /// not a Pauli observable, pass through unchanged — the dense path
    /// handles them.
    pub fn convert(&self, expr: &Expr) -> ExprResult<Expr> {
        match expr {
            Expr::List(l) if l.rule() == CombineRule::Compose && l.children().len() == 2 => {
                self.rewrite(&l.children()[0], &l.children()[1], l.coeff())
                    .map(|rewritten| rewritten.unwrap_or_else(|| expr.clone()))
            }
            Expr::List(_) => expr.traverse(&mut |child| self.convert(child)),
            _ => Ok(expr.clone()),
        }
    }

    fn rewrite(
        &self,
        measurement: &Expr,
        state: &Expr,
        outer_coeff: Complex64,
    ) -> ExprResult<Option<Expr>> {
        let Expr::State(state_fn) = state else {
            return Ok(None);
        };
        let StatePrimitive::Circuit { circuit, .. } = state_fn.primitive() else {
            return Ok(None);
        };

        match measurement {
            Expr::State(m) if m.is_measurement() => {
                let StatePrimitive::Operator(observable) = m.primitive() else {
                    return Ok(None);
                };
                let Some(terms) = pauli_terms(observable) else {
                    return Ok(None);
                };
                let groups = if self.grouping {
                    group_terms(&terms)
                } else {
                    terms.into_iter().map(|t| vec![t]).collect()
                };

                let mut children = Vec::with_capacity(groups.len());
                for group in &groups {
                    children.push(composed_group(
                        group,
                        m.coeff(),
                        circuit,
                        state_fn.coeff(),
                        None,
                    )?);
                }
                let rewritten = if children.len() == 1 {
                    children.into_iter().next().expect("one group")
                } else {
                    Expr::List(ListOp::summed(children))
                };
                Ok(Some(rewritten.scaled(outer_coeff)))
            }
            Expr::CVar(cvar) => {
                let Some(terms) = pauli_terms(cvar.primitive()) else {
                    return Ok(None);
                };
                let groups = group_terms(&terms);
                // CVaR is nonlinear: the whole observable must diagonalize
                // under a single rotation.
                if groups.len() != 1 {
                    return Err(ExprError::NonDiagonal(cvar.primitive().to_string()));
                }
                Ok(Some(
                    composed_group(
                        &groups[0],
                        cvar.coeff(),
                        circuit,
                        state_fn.coeff(),
                        Some(cvar.alpha()),
                    )?
                    .scaled(outer_coeff),
                ))
            }
            _ => Ok(None),
        }
    }
}

/// Build `diagonal-measurement ∘ rotated-circuit-state` for one group.
fn composed_group(
    group: &[(Complex64, PauliString)],
    measurement_coeff: Complex64,
    circuit: &Circuit,
    state_coeff: Complex64,
    cvar_alpha: Option<f64>,
) -> ExprResult<Expr> {
    let support = support_of(group);
    let mut rotated = circuit.clone();
    rotated.append(&rotation_circuit(&support)?)?;
    let rotated_state = Expr::State(StateFn::from_circuit(rotated).scaled(state_coeff));

    let diag_terms: Vec<Expr> = group
        .iter()
        .map(|(coeff, pauli)| {
            Expr::Primitive(PrimitiveOp::pauli(pauli.diagonalized()).scaled(*coeff))
        })
        .collect();
    let diag_observable = if diag_terms.len() == 1 {
        diag_terms.into_iter().next().expect("one term")
    } else {
        Expr::List(ListOp::summed(diag_terms))
    };

    let diag_measurement = match cvar_alpha {
        Some(alpha) => {
            Expr::CVar(crate::cvar::CVarMeasurement::new(diag_observable, alpha)?)
                .scaled(measurement_coeff)
        }
        None => Expr::State(StateFn::measurement(diag_observable)).scaled(measurement_coeff),
    };

    diag_measurement.compose(&rotated_state)
}

/// The per-qubit measurement axis of a qubit-wise commuting group.
fn support_of(group: &[(Complex64, PauliString)]) -> PauliString {
    let n = group
        .first()
        .map_or(0, |(_, p)| p.num_qubits() as usize);
    let mut axes = vec![PauliAxis::I; n];
    for (_, pauli) in group {
        for (k, axis) in pauli.axes().iter().enumerate() {
            if *axis != PauliAxis::I {
                axes[k] = *axis;
            }
        }
    }
    PauliString::from_axes(axes)
}

/// The rotation that maps each axis of `support` onto Z.
fn rotation_circuit(support: &PauliString) -> ExprResult<Circuit> {
    let mut circuit = Circuit::with_size("basis_change", support.num_qubits(), 0);
    for (k, axis) in support.axes().iter().enumerate() {
        let q = QubitId(k as u32);
        match axis {
            PauliAxis::X => {
                circuit.h(q)?;
            }
            PauliAxis::Y => {
                circuit.sdg(q)?;
                circuit.h(q)?;
            }
            PauliAxis::I | PauliAxis::Z => {}
        }
    }
    Ok(circuit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;

    fn h_rz_rx_circuit(a: f64, b: f64) -> Circuit {
        let mut circuit = Circuit::with_size("ansatz", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.rz(a, QubitId(0)).unwrap();
        circuit.rx(b, QubitId(0)).unwrap();
        circuit
    }

    #[test]
    fn test_rewritten_tree_is_diagonal() {
        let observable = consts::X.clone() * 0.5 - consts::Z.clone();
        let state = Expr::State(StateFn::from_circuit(h_rz_rx_circuit(0.3, 0.7)));
        let composed = Expr::State(StateFn::measurement(observable))
            .compose(&state)
            .unwrap();

        let converted = PauliBasisChange::new().convert(&composed).unwrap();

        // Every operator measurement left in the tree must be diagonal.
        fn assert_diagonal(expr: &Expr) {
            match expr {
                Expr::State(s) if s.is_measurement() => {
                    if let StatePrimitive::Operator(op) = s.primitive() {
                        assert!(op.is_diagonal_operator());
                    }
                }
                Expr::List(l) => l.children().iter().for_each(assert_diagonal),
                _ => {}
            }
        }
        assert_diagonal(&converted);
    }

    #[test]
    fn test_preserves_expectation_value() {
        // ⟨0.5X − Z⟩ on H;RZ(a);RX(b)|0⟩ is 0.5·cos(a) − sin(a)·sin(b).
        let (a, b) = (0.3, 0.7);
        let observable = consts::X.clone() * 0.5 - consts::Z.clone();
        let state = Expr::State(StateFn::from_circuit(h_rz_rx_circuit(a, b)));
        let composed = Expr::State(StateFn::measurement(observable))
            .compose(&state)
            .unwrap();

        let expected = 0.5 * a.cos() - a.sin() * b.sin();
        let direct = composed.eval().unwrap();
        assert!((direct.re - expected).abs() < 1e-10);

        let converted = PauliBasisChange::new().convert(&composed).unwrap();
        let value = converted.eval().unwrap();
        assert!((value.re - expected).abs() < 1e-10);
    }

    #[test]
    fn test_cvar_requires_single_group() {
        let observable = consts::X.clone() * 0.5 - consts::Z.clone();
        let cvar = Expr::CVar(crate::cvar::CVarMeasurement::new(observable, 0.5).unwrap());
        let state = Expr::State(StateFn::from_circuit(h_rz_rx_circuit(0.1, 0.2)));
        let composed = cvar.compose(&state).unwrap();
        assert!(matches!(
            PauliBasisChange::new().convert(&composed),
            Err(ExprError::NonDiagonal(_))
        ));
    }
}
