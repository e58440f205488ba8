//! Alsvid circuit representation
//!
//! This crate provides the circuit-level data structures consumed by the
//! Alsvid expression algebra and execution engine: parameterized gates, a
//! flat ordered instruction list, and symbolic parameter expressions.
//!
//! Unlike a compiler IR there is no graph representation here. The engine
//! never reorders or analyzes circuit structure — it binds parameter values
//! and executes instructions front to back — so a circuit is exactly a
//! `Vec<Instruction>` plus register sizes.
//!
//! # Example: a parameterized ansatz circuit
//!
//! ```rust
//! use alsvid_ir::{Circuit, ParameterExpression, QubitId};
//! use std::f64::consts::PI;
//!
//! let mut circuit = Circuit::with_size("ansatz", 1, 0);
//! let a = ParameterExpression::symbol("a");
//! circuit.h(QubitId(0)).unwrap();
//! circuit.rz(a, QubitId(0)).unwrap();
//! circuit.rx(PI, QubitId(0)).unwrap();
//!
//! assert_eq!(circuit.parameters(), vec!["a".to_string()]);
//!
//! let bound = circuit.bind_parameters(&[("a".to_string(), PI / 4.0)].into_iter().collect());
//! assert!(!bound.is_parameterized());
//! ```
//!
//! # Conventions
//!
//! - Character `k` of a measurement bitstring is the state of qubit `k`;
//!   the basis index of a bitstring is `Σ_k bit_k · 2^k`.
//! - `Rz(θ) = diag(e^{−iθ/2}, e^{iθ/2})`.
//! - For multi-qubit gate matrices, operand 0 is the least-significant bit
//!   of the local basis index.

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use parameter::{BinaryOp, ParameterExpression};
pub use qubit::{ClbitId, QubitId};
