//! Alsvid variational driver
//!
//! The hybrid quantum/classical optimization loop: an [`Ansatz`] builds a
//! parameterized trial state, an [`Optimizer`] proposes parameter vectors,
//! and the [`Vqe`] driver evaluates the operator's expectation through the
//! batched sampler until the optimizer converges.
//!
//! # Example
//!
//! ```rust
//! use alsvid_adapter_sim::StatevectorBackend;
//! use alsvid_expr::Expr;
//! use alsvid_vqe::{EfficientAnsatz, GradientDescent, Vqe};
//!
//! // Ground state of 0.5·X − Z is −√1.25 ≈ −1.118.
//! let hamiltonian = Expr::pauli_sum(&[(0.5, "X"), (-1.0, "Z")]).unwrap();
//! let mut vqe = Vqe::new(
//!     EfficientAnsatz::new(1, 1),
//!     GradientDescent::new(150).with_learning_rate(0.3),
//!     StatevectorBackend::new(),
//! )
//! .with_operator(hamiltonian)
//! .with_initial_point(vec![0.1; 4]);
//!
//! let outcome = vqe.run().unwrap();
//! assert!((outcome.optimal_value - (-1.118)).abs() < 0.05);
//! ```

pub mod ansatz;
pub mod driver;
pub mod error;
pub mod optimizer;

pub use ansatz::{Ansatz, EfficientAnsatz, parameter_names, parameter_symbols};
pub use driver::{DriverState, Eigenstate, EvaluationCallback, Vqe, VqeOutcome};
pub use error::{VqeError, VqeResult};
pub use optimizer::{GradientDescent, Optimizer, Optimum};
