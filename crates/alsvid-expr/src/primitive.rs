//! Atomic operator leaves.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use std::fmt;

use alsvid_ir::{Circuit, InstructionKind, QubitId};

use crate::error::{ExprError, ExprResult};
use crate::pauli::PauliString;

/// The payload of an atomic operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// A weighted Pauli string.
    Pauli(PauliString),
    /// A dense matrix.
    Matrix(Array2<Complex64>),
    /// A unitary given as a circuit.
    Circuit(Circuit),
}

/// An atomic operator: a primitive with a complex coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveOp {
    primitive: Primitive,
    coeff: Complex64,
}

impl PrimitiveOp {
    /// A Pauli-string operator with coefficient 1.
    pub fn pauli(pauli: PauliString) -> Self {
        Self {
            primitive: Primitive::Pauli(pauli),
            coeff: Complex64::new(1.0, 0.0),
        }
    }

    /// A dense-matrix operator with coefficient 1.
    ///
    /// The matrix must be square with power-of-two dimension.
    pub fn matrix(matrix: Array2<Complex64>) -> ExprResult<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols || rows == 0 || !rows.is_power_of_two() {
            return Err(ExprError::InvalidConversion(format!(
                "operator matrix must be square with power-of-two dimension, got {rows}x{cols}"
            )));
        }
        Ok(Self {
            primitive: Primitive::Matrix(matrix),
            coeff: Complex64::new(1.0, 0.0),
        })
    }

    /// A circuit-unitary operator with coefficient 1.
    pub fn circuit(circuit: Circuit) -> Self {
        Self {
            primitive: Primitive::Circuit(circuit),
            coeff: Complex64::new(1.0, 0.0),
        }
    }

    /// Return a copy scaled by `scalar`.
    #[must_use]
    pub fn scaled(&self, scalar: Complex64) -> Self {
        Self {
            primitive: self.primitive.clone(),
            coeff: self.coeff * scalar,
        }
    }

    pub(crate) fn with_coeff(&self, coeff: Complex64) -> Self {
        Self {
            primitive: self.primitive.clone(),
            coeff,
        }
    }

    /// The primitive payload.
    pub fn primitive(&self) -> &Primitive {
        &self.primitive
    }

    /// The coefficient.
    pub fn coeff(&self) -> Complex64 {
        self.coeff
    }

    /// Number of qubits this operator acts on.
    pub fn num_qubits(&self) -> u32 {
        match &self.primitive {
            Primitive::Pauli(p) => p.num_qubits(),
            Primitive::Matrix(m) => m.nrows().trailing_zeros(),
            Primitive::Circuit(c) => c.num_qubits(),
        }
    }

    /// The dense matrix of this operator, including the coefficient.
    pub fn to_matrix(&self) -> ExprResult<Array2<Complex64>> {
        let m = match &self.primitive {
            Primitive::Pauli(p) => p.to_matrix(),
            Primitive::Matrix(m) => m.clone(),
            Primitive::Circuit(c) => circuit_unitary(c)?,
        };
        Ok(m * self.coeff)
    }

    /// The adjoint operator.
    pub fn adjoint(&self) -> ExprResult<Self> {
        let primitive = match &self.primitive {
            // Pauli strings are Hermitian.
            Primitive::Pauli(p) => Primitive::Pauli(p.clone()),
            Primitive::Matrix(m) => Primitive::Matrix(m.t().mapv(|v| v.conj())),
            Primitive::Circuit(c) => Primitive::Circuit(c.inverse()?),
        };
        Ok(Self {
            primitive,
            coeff: self.coeff.conj(),
        })
    }

    /// Compose `self · other` if both are Pauli primitives.
    pub(crate) fn compose_pauli(&self, other: &Self) -> Option<ExprResult<Self>> {
        match (&self.primitive, &other.primitive) {
            (Primitive::Pauli(a), Primitive::Pauli(b)) => Some(a.mul(b).map(|(phase, pauli)| Self {
                primitive: Primitive::Pauli(pauli),
                coeff: self.coeff * other.coeff * phase,
            })),
            _ => None,
        }
    }

    /// Tensor `self ⊗ other` if both are Pauli primitives.
    pub(crate) fn tensor_pauli(&self, other: &Self) -> Option<Self> {
        match (&self.primitive, &other.primitive) {
            (Primitive::Pauli(a), Primitive::Pauli(b)) => Some(Self {
                primitive: Primitive::Pauli(a.tensor(b)),
                coeff: self.coeff * other.coeff,
            }),
            _ => None,
        }
    }

    /// `⟨b|O|b⟩` including the coefficient.
    pub fn diagonal_entry(&self, bitstring: &str) -> ExprResult<Complex64> {
        let entry = match &self.primitive {
            Primitive::Pauli(p) => p.diagonal_entry(bitstring)?,
            Primitive::Matrix(m) => {
                let idx = bitstring_index(bitstring, self.num_qubits())?;
                m[[idx, idx]]
            }
            Primitive::Circuit(_) => {
                return Err(ExprError::InvalidConversion(
                    "diagonal entry of a circuit operator; convert to matrix form first".into(),
                ));
            }
        };
        Ok(entry * self.coeff)
    }
}

impl fmt::Display for PrimitiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.primitive {
            Primitive::Pauli(p) => p.to_string(),
            Primitive::Matrix(m) => format!("Matrix({}x{})", m.nrows(), m.ncols()),
            Primitive::Circuit(c) => format!("Circuit({})", c.name()),
        };
        if self.coeff == Complex64::new(1.0, 0.0) {
            write!(f, "{body}")
        } else {
            write!(f, "{} * {body}", self.coeff)
        }
    }
}

/// Convert a bitstring (char k = qubit k) to a basis index.
pub(crate) fn bitstring_index(bitstring: &str, num_qubits: u32) -> ExprResult<usize> {
    if bitstring.len() != num_qubits as usize || !bitstring.chars().all(|c| c == '0' || c == '1') {
        return Err(ExprError::InvalidBitstring {
            len: bitstring.len(),
            num_qubits,
        });
    }
    let mut idx = 0usize;
    for (k, ch) in bitstring.chars().enumerate() {
        if ch == '1' {
            idx |= 1 << k;
        }
    }
    Ok(idx)
}

/// Format a basis index as a bitstring (char k = qubit k).
pub(crate) fn index_bitstring(index: usize, num_qubits: u32) -> String {
    (0..num_qubits)
        .map(|k| if index >> k & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// Apply a small gate matrix to a full statevector in place.
///
/// Operand 0 of `qubits` is the least-significant bit of the gate's local
/// basis index.
pub(crate) fn apply_gate_to_vector(
    state: &mut [Complex64],
    gate: &Array2<Complex64>,
    qubits: &[QubitId],
) {
    let masks: Vec<usize> = qubits.iter().map(|q| 1usize << q.0).collect();
    let full_mask: usize = masks.iter().sum();
    let local_dim = 1 << qubits.len();
    let mut local = vec![Complex64::new(0.0, 0.0); local_dim];

    for base in 0..state.len() {
        if base & full_mask != 0 {
            continue;
        }
        for (l, slot) in local.iter_mut().enumerate() {
            *slot = state[global_index(base, l, &masks)];
        }
        for (l_out, row) in gate.rows().into_iter().enumerate() {
            let mut acc = Complex64::new(0.0, 0.0);
            for (l_in, g) in row.iter().enumerate() {
                acc += g * local[l_in];
            }
            state[global_index(base, l_out, &masks)] = acc;
        }
    }
}

#[inline]
fn global_index(base: usize, local: usize, masks: &[usize]) -> usize {
    let mut idx = base;
    for (j, mask) in masks.iter().enumerate() {
        if local >> j & 1 == 1 {
            idx |= mask;
        }
    }
    idx
}

/// The full unitary of a circuit, built column by column.
///
/// Exponential in the qubit count; intended for matrix conversion of small
/// operators, not for execution.
pub(crate) fn circuit_unitary(circuit: &Circuit) -> ExprResult<Array2<Complex64>> {
    let n = circuit.num_qubits();
    let dim = 1usize << n;
    let mut unitary = Array2::<Complex64>::eye(dim);
    for inst in circuit.instructions() {
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                let g = gate.matrix()?;
                for j in 0..dim {
                    let mut col: Vec<Complex64> = unitary.column(j).to_vec();
                    apply_gate_to_vector(&mut col, &g, &inst.qubits);
                    for (i, v) in col.into_iter().enumerate() {
                        unitary[[i, j]] = v;
                    }
                }
            }
            // Measurements and snapshots do not alter the unitary action.
            InstructionKind::Measure | InstructionKind::ExpectationSnapshot { .. } => {}
        }
    }
    Ok(unitary)
}

/// The statevector a circuit prepares from `|0…0⟩`.
pub(crate) fn circuit_statevector(circuit: &Circuit) -> ExprResult<Array1<Complex64>> {
    let dim = 1usize << circuit.num_qubits();
    let mut state = vec![Complex64::new(0.0, 0.0); dim];
    state[0] = Complex64::new(1.0, 0.0);
    for inst in circuit.instructions() {
        if let InstructionKind::Gate(gate) = &inst.kind {
            apply_gate_to_vector(&mut state, &gate.matrix()?, &inst.qubits);
        }
    }
    Ok(Array1::from_vec(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::QubitId;

    fn approx(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn test_bitstring_index_qubit_order() {
        // Char k = qubit k, so "10" sets qubit 0 only: index 1.
        assert_eq!(bitstring_index("10", 2).unwrap(), 1);
        assert_eq!(bitstring_index("01", 2).unwrap(), 2);
        assert_eq!(index_bitstring(1, 2), "10");
    }

    #[test]
    fn test_bitstring_index_wrong_length() {
        assert!(matches!(
            bitstring_index("101", 2),
            Err(ExprError::InvalidBitstring { .. })
        ));
    }

    #[test]
    fn test_circuit_unitary_matches_gate_matrix() {
        let mut circuit = Circuit::with_size("h", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let u = circuit_unitary(&circuit).unwrap();
        let h = alsvid_ir::StandardGate::H.matrix().unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert!(approx(u[[i, j]], h[[i, j]]));
            }
        }
    }

    #[test]
    fn test_bell_statevector() {
        let mut circuit = Circuit::with_size("bell", 2, 0);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        let sv = circuit_statevector(&circuit).unwrap();
        let s = 1.0 / 2.0_f64.sqrt();
        assert!(approx(sv[0], Complex64::new(s, 0.0)));
        assert!(approx(sv[3], Complex64::new(s, 0.0)));
        assert!(sv[1].norm() < 1e-12 && sv[2].norm() < 1e-12);
    }

    #[test]
    fn test_pauli_compose_merges() {
        let x = PrimitiveOp::pauli(PauliString::from_label("X").unwrap());
        let y = PrimitiveOp::pauli(PauliString::from_label("Y").unwrap());
        let merged = x.compose_pauli(&y).unwrap().unwrap();
        match merged.primitive() {
            Primitive::Pauli(p) => assert_eq!(p.to_string(), "Z"),
            _ => panic!("expected a Pauli primitive"),
        }
        assert!(approx(merged.coeff(), Complex64::new(0.0, 1.0)));
    }

    #[test]
    fn test_matrix_op_rejects_non_square() {
        let m = Array2::<Complex64>::zeros((2, 3));
        assert!(PrimitiveOp::matrix(m).is_err());
    }

    #[test]
    fn test_adjoint_conjugates_coeff() {
        let x = PrimitiveOp::pauli(PauliString::from_label("X").unwrap())
            .scaled(Complex64::new(0.0, 2.0));
        let adj = x.adjoint().unwrap();
        assert!(approx(adj.coeff(), Complex64::new(0.0, -2.0)));
    }
}
