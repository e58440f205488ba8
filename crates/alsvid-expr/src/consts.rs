//! The operator/state constant table.
//!
//! Built once at first use and immutable afterwards; clone an entry to use
//! it in a tree. `Z.clone() * 0.5 - X.clone()` reads the way the algebra is
//! meant to be written.

use ndarray::Array1;
use num_complex::Complex64;
use std::sync::LazyLock;

use crate::expr::Expr;
use crate::state_fn::StateFn;

/// The single-qubit Pauli-X operator.
pub static X: LazyLock<Expr> = LazyLock::new(|| Expr::pauli("X").expect("valid label"));

/// The single-qubit Pauli-Y operator.
pub static Y: LazyLock<Expr> = LazyLock::new(|| Expr::pauli("Y").expect("valid label"));

/// The single-qubit Pauli-Z operator.
pub static Z: LazyLock<Expr> = LazyLock::new(|| Expr::pauli("Z").expect("valid label"));

/// The single-qubit identity operator.
pub static I: LazyLock<Expr> = LazyLock::new(|| Expr::pauli("I").expect("valid label"));

/// The `|0⟩` state.
pub static ZERO: LazyLock<Expr> = LazyLock::new(|| Expr::State(StateFn::zero(1)));

/// The `|1⟩` state.
pub static ONE: LazyLock<Expr> = LazyLock::new(|| Expr::State(StateFn::one(1)));

/// The `|+⟩` state.
pub static PLUS: LazyLock<Expr> = LazyLock::new(|| {
    let s = 1.0 / 2.0_f64.sqrt();
    Expr::State(
        StateFn::from_vector(Array1::from_vec(vec![
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
        ]))
        .expect("power-of-two length"),
    )
});

/// The `|−⟩` state.
pub static MINUS: LazyLock<Expr> = LazyLock::new(|| {
    let s = 1.0 / 2.0_f64.sqrt();
    Expr::State(
        StateFn::from_vector(Array1::from_vec(vec![
            Complex64::new(s, 0.0),
            Complex64::new(-s, 0.0),
        ]))
        .expect("power-of-two length"),
    )
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_one_qubit() {
        for op in [&*X, &*Y, &*Z, &*I, &*ZERO, &*ONE, &*PLUS, &*MINUS] {
            assert_eq!(op.num_qubits(), 1);
        }
    }

    #[test]
    fn test_plus_is_x_eigenstate() {
        // ⟨+|X|+⟩ = 1.
        let measurement = StateFn::measurement(X.clone());
        let value = measurement.eval_with(&PLUS).unwrap();
        assert!((value.re - 1.0).abs() < 1e-12);
        assert!(value.im.abs() < 1e-12);
    }

    #[test]
    fn test_minus_is_negative_x_eigenstate() {
        let measurement = StateFn::measurement(X.clone());
        let value = measurement.eval_with(&MINUS).unwrap();
        assert!((value.re + 1.0).abs() < 1e-12);
    }
}
