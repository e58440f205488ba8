//! Error types for the circuit representation.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur when building or binding circuits.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index is outside the circuit's register.
    #[error("Qubit {qubit} out of range for circuit with {num_qubits} qubits")]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Width of the circuit.
        num_qubits: u32,
    },

    /// Classical bit index is outside the circuit's register.
    #[error("Classical bit {clbit} out of range for circuit with {num_clbits} classical bits")]
    ClbitOutOfRange {
        /// The offending classical bit.
        clbit: ClbitId,
        /// Number of classical bits in the circuit.
        num_clbits: u32,
    },

    /// The same qubit appears twice in one instruction.
    #[error("Duplicate qubit {qubit} in '{gate}' operands")]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Name of the gate.
        gate: &'static str,
    },

    /// Gate applied to the wrong number of qubits.
    #[error("Gate '{gate}' requires {expected} qubits, got {got}")]
    ArityMismatch {
        /// Name of the gate.
        gate: &'static str,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Measurement with mismatched qubit/clbit counts.
    #[error("Measurement maps {qubits} qubits to {clbits} classical bits")]
    MeasureArity {
        /// Number of qubits being measured.
        qubits: usize,
        /// Number of classical bits provided.
        clbits: usize,
    },

    /// Circuits of different widths cannot be concatenated.
    #[error("Cannot append a {right}-qubit circuit to a {left}-qubit circuit")]
    WidthMismatch {
        /// Width of the receiving circuit.
        left: u32,
        /// Width of the appended circuit.
        right: u32,
    },

    /// A symbolic parameter was used where a concrete value is required.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// The instruction has no inverse.
    #[error("Cannot invert instruction '{0}'")]
    NonInvertible(&'static str),
}

/// Result type for circuit operations.
pub type IrResult<T> = Result<T, IrError>;
