//! Circuit instructions combining gates with operands.

use serde::{Deserialize, Serialize};

use crate::gate::StandardGate;
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(StandardGate),
    /// Measurement of qubits into classical bits.
    Measure,
    /// Request a precomputed expectation value from the executing backend.
    ///
    /// The observable is carried as `(coefficient, Pauli label)` pairs so
    /// this crate stays independent of the operator algebra. Backends that
    /// cannot evaluate observables directly ignore the instruction.
    ExpectationSnapshot {
        /// Key under which the backend reports the value.
        label: String,
        /// Weighted Pauli terms, labels in qubit order (char k = qubit k).
        terms: Vec<(f64, String)>,
    },
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction operates on (for measure).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: StandardGate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a measurement instruction.
    pub fn measure(
        qubits: impl IntoIterator<Item = QubitId>,
        clbits: impl IntoIterator<Item = ClbitId>,
    ) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: qubits.into_iter().collect(),
            clbits: clbits.into_iter().collect(),
        }
    }

    /// Create an expectation-snapshot instruction spanning the given qubits.
    pub fn expectation_snapshot(
        label: impl Into<String>,
        terms: Vec<(f64, String)>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> Self {
        Self {
            kind: InstructionKind::ExpectationSnapshot {
                label: label.into(),
                terms,
            },
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Check if this instruction carries a free symbolic parameter.
    pub fn is_parameterized(&self) -> bool {
        match &self.kind {
            InstructionKind::Gate(gate) => gate.is_parameterized(),
            InstructionKind::Measure | InstructionKind::ExpectationSnapshot { .. } => false,
        }
    }
}
