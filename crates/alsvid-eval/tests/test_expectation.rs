//! Tests for the expectation-value engines.
//!
//! Reference for the 1-qubit workhorse circuit `H; RZ(a); RX(b)` against
//! `0.5·X − Z`:  ⟨H⟩(a, b) = 0.5·cos(a) − sin(a)·sin(b).

use std::f64::consts::PI;

use alsvid_adapter_sim::{ShotBackend, StatevectorBackend};
use alsvid_eval::{EvalError, ExpectationMode, ExpectationValue, ParameterBindings};
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

fn reference(a: f64, b: f64) -> f64 {
    0.5 * a.cos() - a.sin() * b.sin()
}

fn bindings(a: f64, b: f64) -> ParameterBindings {
    [("a".to_string(), vec![a]), ("b".to_string(), vec![b])]
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Mode-by-mode golden values
// ---------------------------------------------------------------------------

#[test]
fn pauli_mode_on_statevector_backend() {
    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    engine.set_state(ansatz_state());

    for (a, b) in [(PI / 4.0, PI), (0.3, 0.7), (1.2, -0.4)] {
        let value = engine.compute(Some(&bindings(a, b))).unwrap()[0];
        assert!(
            (value.re - reference(a, b)).abs() < 1e-10,
            "mismatch at ({a}, {b})"
        );
    }
}

#[test]
fn matrix_mode_on_statevector_backend() {
    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Matrix,
    )
    .unwrap();
    engine.set_state(ansatz_state());

    let value = engine.compute(Some(&bindings(PI / 4.0, PI))).unwrap()[0];
    assert!((value.re - reference(PI / 4.0, PI)).abs() < 1e-10);
}

#[test]
fn snapshot_mode_on_statevector_backend() {
    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Snapshot,
    )
    .unwrap();
    engine.set_state(ansatz_state());

    let value = engine.compute(Some(&bindings(0.3, 0.7))).unwrap()[0];
    assert!((value.re - reference(0.3, 0.7)).abs() < 1e-10);
}

#[test]
fn pauli_mode_on_shot_backend_within_noise() {
    let mut engine = ExpectationValue::new(
        observable(),
        ShotBackend::with_seed(8192, 17),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    engine.set_state(ansatz_state());

    let (a, b) = (0.3, 0.7);
    let value = engine.compute(Some(&bindings(a, b))).unwrap()[0];
    // Sampling noise ~ 1/√shots.
    assert!((value.re - reference(a, b)).abs() < 0.05);
}

#[test]
fn grouping_and_ungrouped_agree() {
    let run = |grouping: bool| {
        let mut engine = ExpectationValue::new(
            observable(),
            StatevectorBackend::new(),
            ExpectationMode::Pauli { grouping },
        )
        .unwrap();
        engine.set_state(ansatz_state());
        engine.compute(Some(&bindings(0.9, 0.2))).unwrap()[0].re
    };
    assert!((run(true) - run(false)).abs() < 1e-10);
}

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

#[test]
fn batched_compute_returns_one_value_per_binding() {
    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    engine.set_state(ansatz_state());

    let a_values = vec![0.1, 0.5, 0.9];
    let b_values = vec![0.2, 0.4, 0.6];
    let params: ParameterBindings = [
        ("a".to_string(), a_values.clone()),
        ("b".to_string(), b_values.clone()),
    ]
    .into_iter()
    .collect();

    let values = engine.compute(Some(&params)).unwrap();
    assert_eq!(values.len(), 3);
    for ((value, a), b) in values.iter().zip(&a_values).zip(&b_values) {
        assert!((value.re - reference(*a, *b)).abs() < 1e-10);
    }
}

// ---------------------------------------------------------------------------
// CVaR mode
// ---------------------------------------------------------------------------

#[test]
fn cvar_alpha_one_matches_ordinary_expectation() {
    // A diagonal observable, so CVaR is defined without rotation.
    let diag = Expr::pauli_sum(&[(1.0, "Z")]).unwrap();
    let mut state_circuit = Circuit::with_size("tilt", 1, 0);
    state_circuit.ry(1.1, QubitId(0)).unwrap();
    let state = Expr::State(StateFn::from_circuit(state_circuit));

    let mut ordinary = ExpectationValue::new(
        diag.clone(),
        ShotBackend::with_seed(16384, 5),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    ordinary.set_state(state.clone());
    let expected = ordinary.compute(None).unwrap()[0].re;

    let mut cvar = ExpectationValue::new(
        diag,
        ShotBackend::with_seed(16384, 5),
        ExpectationMode::CVar { alpha: 1.0 },
    )
    .unwrap();
    cvar.set_state(state);
    let value = cvar.compute(None).unwrap()[0].re;

    assert!((value - expected).abs() < 0.03);
}

#[test]
fn cvar_small_alpha_tracks_minimum_eigenvalue() {
    // cos(1.1/2)² ≈ 0.73 mass on |0⟩ (h = +1), rest on |1⟩ (h = −1).
    let diag = Expr::pauli("Z").unwrap();
    let mut state_circuit = Circuit::with_size("tilt", 1, 0);
    state_circuit.ry(1.1, QubitId(0)).unwrap();
    let state = Expr::State(StateFn::from_circuit(state_circuit));

    let mut engine = ExpectationValue::new(
        diag,
        ShotBackend::with_seed(8192, 23),
        ExpectationMode::CVar { alpha: 0.01 },
    )
    .unwrap();
    engine.set_state(state);
    let value = engine.compute(None).unwrap()[0].re;
    assert!((value - (-1.0)).abs() < 1e-9);
}

#[test]
fn cvar_rejects_invalid_alpha_at_construction() {
    let result = ExpectationValue::new(
        Expr::pauli("Z").unwrap(),
        StatevectorBackend::new(),
        ExpectationMode::CVar { alpha: 1.5 },
    );
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Standard deviation
// ---------------------------------------------------------------------------

#[test]
fn stddev_is_zero_on_statevector_backend() {
    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    engine.set_state(ansatz_state());
    let stds = engine
        .compute_standard_deviation(Some(&bindings(0.4, 0.8)))
        .unwrap();
    assert_eq!(stds, vec![0.0]);
}

#[test]
fn stddev_is_finite_on_shot_backend() {
    let mut engine = ExpectationValue::new(
        observable(),
        ShotBackend::with_seed(1024, 3),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    engine.set_state(ansatz_state());
    let stds = engine
        .compute_standard_deviation(Some(&bindings(0.4, 0.8)))
        .unwrap();
    assert_eq!(stds.len(), 1);
    assert!(stds[0] > 0.0 && stds[0] < 0.2);
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn snapshot_mode_requires_capable_backend() {
    let result = ExpectationValue::new(
        observable(),
        ShotBackend::with_seed(128, 1),
        ExpectationMode::Snapshot,
    );
    assert!(matches!(result, Err(EvalError::Configuration(_))));
}

#[test]
fn compute_without_state_errors() {
    let mut engine = ExpectationValue::new(
        observable(),
        StatevectorBackend::new(),
        ExpectationMode::Pauli { grouping: true },
    )
    .unwrap();
    assert!(matches!(
        engine.compute(None),
        Err(EvalError::MissingState)
    ));
}
