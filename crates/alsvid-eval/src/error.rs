//! Error types for sampling and expectation evaluation.

use thiserror::Error;

/// Errors produced by the sampler, expectation engines and gradients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// Parameter binding lists must all have the same length.
    #[error("Binding list for '{parameter}' has length {got}, expected {expected}")]
    BindingLengthMismatch {
        /// Name of the offending parameter.
        parameter: String,
        /// Length of the first binding list.
        expected: usize,
        /// Length of the offending list.
        got: usize,
    },

    /// A parameter map was supplied with empty binding lists.
    #[error("Parameter bindings must contain at least one value set")]
    EmptyBindings,

    /// The sampler or expectation engine was configured inconsistently.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An expectation value was requested before a state was bound.
    #[error("No state bound; call set_state before computing expectations")]
    MissingState,

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

/// Result type for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;
