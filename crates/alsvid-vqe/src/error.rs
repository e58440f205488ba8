//! Error types for the variational driver.

use thiserror::Error;

/// Errors that prevent or abort a variational optimization run.
///
/// Configuration errors are raised before any backend call is made.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VqeError {
    /// No operator was ever provided.
    #[error("Operator was never provided")]
    MissingOperator,

    /// Ansatz and operator widths disagree.
    #[error("Ansatz acts on {ansatz} qubits but the operator acts on {operator}")]
    AnsatzOperatorMismatch {
        /// Qubits of the ansatz.
        ansatz: u32,
        /// Qubits of the operator.
        operator: u32,
    },

    /// The initial point does not match the ansatz's parameter count.
    #[error("Initial point size {got} and parameter size {expected} mismatch")]
    InitialPointDimension {
        /// The ansatz's parameter count.
        expected: usize,
        /// Length of the supplied initial point.
        got: usize,
    },

    /// The ansatz reported bounds of the wrong length.
    #[error("Ansatz bounds size {got} does not match parameter size {expected}")]
    BoundsDimension {
        /// The ansatz's parameter count.
        expected: usize,
        /// Length of the reported bounds.
        got: usize,
    },

    /// The problem has bounds but the optimizer cannot use them.
    #[error("Problem has bounds but optimizer does not support bounds")]
    BoundsUnsupported,

    /// The optimizer requires bounds the problem does not have.
    #[error("Problem does not have bounds but optimizer requires bounds")]
    BoundsRequired,

    /// An initial point was supplied to an optimizer that ignores it.
    #[error("Optimizer does not support an initial point")]
    InitialPointUnsupported,

    /// Evaluation-side error.
    #[error(transparent)]
    Eval(#[from] alsvid_eval::EvalError),

    /// Expression-level error.
    #[error(transparent)]
    Expr(#[from] alsvid_expr::ExprError),

    /// Backend-level error, surfaced unchanged.
    #[error(transparent)]
    Hal(#[from] alsvid_hal::HalError),

    /// Circuit-level error.
    #[error("Circuit error: {0}")]
    Ir(#[from] alsvid_ir::IrError),
}

/// Result type for driver operations.
pub type VqeResult<T> = Result<T, VqeError>;
