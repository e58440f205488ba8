//! Alsvid evaluation engine
//!
//! The execution side of the expression algebra:
//!
//! - [`CircuitSampler`] — extracts circuit leaves from a reduced tree,
//!   transpiles each distinct circuit once, binds every parameter set,
//!   executes the whole batch in a single backend call, and substitutes
//!   numeric leaves back into the tree shape.
//! - [`ExpectationValue`] — folds measurement ∘ state trees into numbers,
//!   with Matrix, Pauli, Snapshot and CVaR conversion modes.
//! - [`Gradient`] — parameter-shift and finite-difference derivatives as
//!   generic combination trees, batched through the sampler.
//!
//! # Example
//!
//! ```rust
//! use alsvid_adapter_sim::StatevectorBackend;
//! use alsvid_eval::{ExpectationMode, ExpectationValue};
//! use alsvid_expr::{consts, Expr, StateFn};
//! use alsvid_ir::{Circuit, QubitId};
//!
//! // ⟨H|0⟩⟨0|H ... an H|0⟩ state measured against 0.5·X − Z.
//! let observable = consts::X.clone() * 0.5 - consts::Z.clone();
//! let mut circuit = Circuit::with_size("plus", 1, 0);
//! circuit.h(QubitId(0)).unwrap();
//!
//! let mut expectation = ExpectationValue::new(
//!     observable,
//!     StatevectorBackend::new(),
//!     ExpectationMode::Pauli { grouping: true },
//! )
//! .unwrap();
//! expectation.set_state(Expr::State(StateFn::from_circuit(circuit)));
//!
//! let value = expectation.compute(None).unwrap()[0];
//! assert!((value.re - 0.5).abs() < 1e-10);
//! ```

pub mod error;
pub mod expectation;
pub mod gradient;
pub mod sampler;

pub use error::{EvalError, EvalResult};
pub use expectation::{ExpectationMode, ExpectationValue};
pub use gradient::{Gradient, GradientMethod};
pub use sampler::{CircuitSampler, EXPECTATION_SNAPSHOT_LABEL, ParameterBindings};
