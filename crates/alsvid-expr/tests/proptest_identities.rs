//! Property-based tests for the algebra identities.
//!
//! Random weighted Pauli sums exercise reduction idempotence, linearity of
//! matrix conversion, and tensor associativity.

use ndarray::Array2;
use num_complex::Complex64;
use proptest::prelude::*;

use alsvid_expr::{Expr, ListOp, PauliAxis, PauliString, PrimitiveOp};

fn arb_axis() -> impl Strategy<Value = PauliAxis> {
    prop_oneof![
        Just(PauliAxis::I),
        Just(PauliAxis::X),
        Just(PauliAxis::Y),
        Just(PauliAxis::Z),
    ]
}

fn arb_pauli(num_qubits: usize) -> impl Strategy<Value = PauliString> {
    prop::collection::vec(arb_axis(), num_qubits).prop_map(PauliString::from_axes)
}

/// A random weighted Pauli sum on `num_qubits` qubits.
fn arb_pauli_sum(num_qubits: usize) -> impl Strategy<Value = Expr> {
    prop::collection::vec((arb_pauli(num_qubits), -2.0..2.0f64), 1..6).prop_map(|terms| {
        let children: Vec<Expr> = terms
            .into_iter()
            .map(|(pauli, coeff)| {
                Expr::Primitive(PrimitiveOp::pauli(pauli).scaled(Complex64::new(coeff, 0.0)))
            })
            .collect();
        if children.len() == 1 {
            children.into_iter().next().expect("one term")
        } else {
            Expr::List(ListOp::summed(children))
        }
    })
}

fn matrices_close(a: &Array2<Complex64>, b: &Array2<Complex64>) -> bool {
    a.dim() == b.dim()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).norm() < 1e-9)
}

proptest! {
    /// `reduce` is idempotent.
    #[test]
    fn reduce_idempotent(op in arb_pauli_sum(2)) {
        let once = op.reduce();
        let twice = once.reduce();
        prop_assert_eq!(once, twice);
    }

    /// Reduction preserves the operator's matrix.
    #[test]
    fn reduce_preserves_matrix(op in arb_pauli_sum(2)) {
        let before = op.to_matrix().unwrap();
        let after = op.reduce().to_matrix();
        // A sum that cancels exactly to zero keeps a zero-coefficient
        // leaf, which still has a matrix.
        let after = after.unwrap();
        prop_assert!(matrices_close(&before, &after));
    }

    /// Matrix conversion distributes over addition.
    #[test]
    fn addition_is_linear_in_matrix_form(
        a in arb_pauli_sum(2),
        b in arb_pauli_sum(2),
    ) {
        let sum = a.try_add(&b).unwrap();
        let lhs = sum.to_matrix().unwrap();
        let rhs = a.to_matrix().unwrap() + b.to_matrix().unwrap();
        prop_assert!(matrices_close(&lhs, &rhs));
    }

    /// Doubling a coefficient equals adding the operator to itself.
    #[test]
    fn doubling_equals_self_addition(op in arb_pauli_sum(2)) {
        let doubled = (op.clone() * 2.0).reduce();
        let summed = op.try_add(&op).unwrap().reduce();
        prop_assert_eq!(doubled, summed);
    }

    /// Tensor products associate (to matrix tolerance).
    #[test]
    fn tensor_associative(
        a in arb_pauli_sum(1),
        b in arb_pauli_sum(1),
        c in arb_pauli_sum(1),
    ) {
        let left = a.tensor(&b).unwrap().tensor(&c).unwrap();
        let right = a.tensor(&b.tensor(&c).unwrap()).unwrap();
        let lm = left.to_matrix().unwrap();
        let rm = right.to_matrix().unwrap();
        prop_assert!(matrices_close(&lm, &rm));
    }
}
