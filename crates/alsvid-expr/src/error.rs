//! Error types for the expression algebra.

use thiserror::Error;

/// Errors produced by building, rewriting, or evaluating expressions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExprError {
    /// Two expressions of different widths were combined.
    #[error("Cannot {op} expressions of {left} and {right} qubits")]
    QubitCountMismatch {
        /// The attempted operation.
        op: &'static str,
        /// Width of the left operand.
        left: u32,
        /// Width of the right operand.
        right: u32,
    },

    /// A measurement and a non-measurement were combined outside composition.
    #[error("Cannot {op} a measurement with a non-measurement; compose them instead")]
    MeasurementMismatch {
        /// The attempted operation.
        op: &'static str,
    },

    /// Composition onto a ket state function is not defined.
    #[error("Composition onto a non-measurement state function is not defined")]
    ComposeOnState,

    /// A Pauli label contained a character outside I, X, Y, Z.
    #[error("Invalid Pauli label character '{0}'")]
    InvalidPauliLabel(char),

    /// A bitstring did not match the expression's qubit count.
    #[error("Bitstring of length {len} does not match {num_qubits} qubits")]
    InvalidBitstring {
        /// Length of the offending bitstring.
        len: usize,
        /// Width of the expression.
        num_qubits: u32,
    },

    /// CVaR confidence level must lie in (0, 1].
    #[error("CVaR alpha must be in (0, 1], got {0}")]
    InvalidAlpha(f64),

    /// The adjoint of a CVaR measurement is not defined.
    #[error("The adjoint of a CVaR measurement is not defined: it is not a linear functional")]
    CVarAdjoint,

    /// A generic list was evaluated without a combine function.
    #[error("Generic list has no combine function; evaluate its children individually")]
    MissingCombineFn,

    /// The expression does not fold to a scalar.
    #[error("Cannot evaluate {0} to a scalar without a measurement context")]
    EvalNotScalar(&'static str),

    /// The requested representation is not defined for this expression.
    #[error("Invalid conversion: {0}")]
    InvalidConversion(String),

    /// A diagonal observable was required.
    #[error("Observable is not diagonal in the computational basis: {0}")]
    NonDiagonal(String),

    /// Circuit-level error.
    #[error("Circuit error: {0}")]
    Ir(#[from] alsvid_ir::IrError),
}

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;
