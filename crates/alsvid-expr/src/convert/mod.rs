//! Tree converters.
//!
//! A converter rewrites an expression tree into an equivalent but more
//! executable form. Converters never mutate their input; each one is a
//! `traverse` plus a leaf-level rewrite.

pub mod basis_change;
pub mod grouping;
pub mod to_matrix;

pub use basis_change::PauliBasisChange;
pub use grouping::AbelianGrouper;
pub use to_matrix::MatrixConverter;
