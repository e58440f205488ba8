//! Error types for the backend contract.

use thiserror::Error;

/// Errors that can occur in backend operations.
///
/// Execution errors are never retried by callers; they surface unchanged to
/// whoever started the evaluation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Client-side transpilation failed.
    #[error("Transpilation failed: {0}")]
    TranspilationFailed(String),

    /// Backend execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Circuit exceeds backend capabilities.
    #[error("Circuit exceeds backend capabilities: {0}")]
    CircuitTooLarge(String),

    /// The backend does not support the requested feature.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid backend configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A result was requested in a form the execution did not produce.
    #[error("Result for circuit {index} has no {kind} data")]
    MissingResultData {
        /// Index of the circuit within the batch.
        index: usize,
        /// The missing result kind.
        kind: &'static str,
    },

    /// A gate reached execution with a free symbolic parameter.
    #[error("Gate '{gate}' has unbound parameter '{parameter}'")]
    UnboundParameter {
        /// Name of the gate.
        gate: String,
        /// Name of the unbound parameter.
        parameter: String,
    },

    /// Circuit-level error.
    #[error("Circuit error: {0}")]
    Ir(#[from] alsvid_ir::IrError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for backend operations.
pub type HalResult<T> = Result<T, HalError>;
