//! Tests for parameter-shift and finite-difference gradients.
//!
//! Golden reference: H = 0.5·X − Z on `H; RZ(a); RX(b)` gives
//! ⟨H⟩ = 0.5·cos(a) − sin(a)·sin(b), so
//! d⟨H⟩/da = −0.5·sin(a) − cos(a)·sin(b) and d⟨H⟩/db = −sin(a)·cos(b).
//! At (a, b) = (π/4, π): (−0.5/√2, 1/√2) ≈ (−0.35355, 0.70711).

use std::f64::consts::PI;

use rustc_hash::FxHashMap;

use alsvid_adapter_sim::StatevectorBackend;
use alsvid_eval::{ExpectationMode, ExpectationValue, Gradient, GradientMethod};
use alsvid_expr::{Expr, StateFn};
use alsvid_ir::{Circuit, ParameterExpression, QubitId};

fn observable() -> Expr {
    Expr::pauli_sum(&[(0.5, "X"), (-1.0, "Z")]).unwrap()
}

fn ansatz_state() -> Expr {
    let mut circuit = Circuit::with_size("ansatz", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit
        .rz(ParameterExpression::symbol("a"), QubitId(0))
        .unwrap();
    circuit
        .rx(ParameterExpression::symbol("b"), QubitId(0))
        .unwrap();
    Expr::State(StateFn::from_circuit(circuit))
}

fn d_da(a: f64, b: f64) -> f64 {
    -0.5 * a.sin() - a.cos() * b.sin()
}

fn d_db(a: f64, b: f64) -> f64 {
    -a.sin() * b.cos()
}

fn methods() -> [GradientMethod; 2] {
    [
        GradientMethod::ParameterShift,
        GradientMethod::FiniteDiff { eps: 1e-5 },
    ]
}

// ---------------------------------------------------------------------------
// The gradient as an expression tree
// ---------------------------------------------------------------------------

#[test]
fn gradient_tree_evaluates_golden_value() {
    let composed = Expr::State(StateFn::measurement(observable()))
        .compose(&ansatz_state())
        .unwrap();

    for method in methods() {
        let tolerance = match method {
            GradientMethod::ParameterShift => 1e-10,
            GradientMethod::FiniteDiff { .. } => 1e-6,
        };
        let tree = Gradient::new(method).tree(&composed, "a");

        let values: FxHashMap<String, f64> =
            [("a".to_string(), PI / 4.0), ("b".to_string(), PI)]
                .into_iter()
                .collect();
        let value = tree.bind_parameters(&values).eval().unwrap().re;
        assert!(
            (value - (-0.5 / 2.0_f64.sqrt())).abs() < tolerance,
            "{method:?}: got {value}"
        );
    }
}

#[test]
fn gradient_tree_second_parameter() {
    let composed = Expr::State(StateFn::measurement(observable()))
        .compose(&ansatz_state())
        .unwrap();
    let tree = Gradient::new(GradientMethod::ParameterShift).tree(&composed, "b");

    let values: FxHashMap<String, f64> = [("a".to_string(), PI / 4.0), ("b".to_string(), PI)]
        .into_iter()
        .collect();
    let value = tree.bind_parameters(&values).eval().unwrap().re;
    assert!((value - 1.0 / 2.0_f64.sqrt()).abs() < 1e-10);
}

// ---------------------------------------------------------------------------
// Batched evaluation through the sampler
// ---------------------------------------------------------------------------

#[test]
fn batched_gradient_matches_analytic_values() {
    let names = vec!["a".to_string(), "b".to_string()];
    let points = [
        [PI / 4.0, PI],
        [PI / 4.0, PI / 4.0],
        [PI / 2.0, PI / 4.0],
        [0.3, 0.7],
    ];

    for method in methods() {
        let tolerance = match method {
            GradientMethod::ParameterShift => 1e-10,
            GradientMethod::FiniteDiff { .. } => 1e-6,
        };
        let mut engine = ExpectationValue::new(
            observable(),
            StatevectorBackend::new(),
            ExpectationMode::Pauli { grouping: true },
        )
        .unwrap();
        engine.set_state(ansatz_state());

        for [a, b] in points {
            let grad = Gradient::new(method)
                .evaluate(&mut engine, &names, &[a, b])
                .unwrap();
            assert!((grad[0] - d_da(a, b)).abs() < tolerance, "{method:?} d/da");
            assert!((grad[1] - d_db(a, b)).abs() < tolerance, "{method:?} d/db");
        }
    }
}

#[test]
fn known_reference_points_from_both_methods() {
    // The classic three-point table for this circuit.
    let cases = [
        ([PI / 4.0, PI], [-0.5 / 2.0_f64.sqrt(), 1.0 / 2.0_f64.sqrt()]),
        ([PI / 4.0, PI / 4.0], [-0.5 / 2.0_f64.sqrt() - 0.5, -0.5]),
        ([PI / 2.0, PI / 4.0], [-0.5, -1.0 / 2.0_f64.sqrt()]),
    ];
    let names = vec!["a".to_string(), "b".to_string()];

    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    engine.set_state(ansatz_state());

    for (point, expected) in cases {
        let grad = Gradient::new(GradientMethod::ParameterShift)
            .evaluate(&mut engine, &names, &point)
            .unwrap();
        assert!((grad[0] - expected[0]).abs() < 1e-10);
        assert!((grad[1] - expected[1]).abs() < 1e-10);
    }
}

#[test]
fn gradient_batch_is_one_backend_call_per_point() {
    // 2 parameters → 4 shifted evaluations, still a single convert/execute.
    let names = vec!["a".to_string(), "b".to_string()];
    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    engine.set_state(ansatz_state());

    let grad = Gradient::new(GradientMethod::ParameterShift)
        .evaluate(&mut engine, &names, &[0.2, 0.4])
        .unwrap();
    assert_eq!(grad.len(), 2);
}
