//! Alsvid operator/state expression algebra
//!
//! A lazy, composable symbolic representation of quantum operators and
//! states: sums, compositions, tensor products, coefficients and parameter
//! bindings form an immutable tree that is reduced, converted into
//! executable circuits, sampled, and finally folded into numbers.
//!
//! # The expression tree
//!
//! [`Expr`] is one closed tagged union:
//!
//! - [`PrimitiveOp`] — atomic operators (Pauli string, dense matrix,
//!   circuit unitary)
//! - [`StateFn`] — states and their measurement duals (amplitude dict,
//!   dense vector, preparation circuit, operator functional)
//! - [`ListOp`] — combination nodes (`Sum`, `Compose`, `Tensor`, `Generic`
//!   with a user-supplied reduction)
//! - [`CVarMeasurement`] — the conditional-value-at-risk measurement, a
//!   nonlinear aggregation over the lowest-α tail of an outcome
//!   distribution
//!
//! # Example: an expectation value, evaluated lazily
//!
//! ```rust
//! use alsvid_expr::{consts, Expr, StateFn};
//!
//! // ⟨+| (0.5·X − Z) |+⟩ = 0.5
//! let observable = consts::X.clone() * 0.5 - consts::Z.clone();
//! let tree = Expr::State(StateFn::measurement(observable))
//!     .compose(&consts::PLUS)
//!     .unwrap();
//! let value = tree.eval().unwrap();
//! assert!((value.re - 0.5).abs() < 1e-12);
//! ```
//!
//! # Reduction and conversion
//!
//! [`Expr::reduce`] canonicalizes a tree (flattens nested sums, merges
//! coefficient-multiples of identical subtrees, drops zero terms) and is
//! idempotent. The converters in [`convert`] rewrite trees towards
//! executable forms: dense matrices, diagonal measurements over rotated
//! circuits, and qubit-wise commuting groups.

pub mod consts;
pub mod convert;
pub mod cvar;
pub mod error;
pub mod expr;
pub mod list_op;
pub mod pauli;
pub mod primitive;
pub mod state_fn;

pub use convert::{AbelianGrouper, MatrixConverter, PauliBasisChange};
pub use cvar::CVarMeasurement;
pub use error::{ExprError, ExprResult};
pub use expr::Expr;
pub use list_op::{CombineFn, CombineRule, ListOp};
pub use pauli::{PauliAxis, PauliString};
pub use primitive::{Primitive, PrimitiveOp};
pub use state_fn::{LeafId, StateFn, StatePrimitive};
