//! Tests for the CVaR measurement semantics.

use num_complex::Complex64;
use rustc_hash::FxHashMap;

use alsvid_expr::{CVarMeasurement, Expr, ExprError, StateFn};

/// A state with amplitudes √p over the given (bitstring, probability)
/// outcomes, the form the sampler produces from counts.
fn sampled_state(outcomes: &[(&str, f64)]) -> Expr {
    let mut map = FxHashMap::default();
    for (bitstring, p) in outcomes {
        map.insert(bitstring.to_string(), Complex64::new(p.sqrt(), 0.0));
    }
    Expr::State(StateFn::from_dict(map).unwrap())
}

fn cvar_of(observable: Expr, alpha: f64, state: &Expr) -> f64 {
    CVarMeasurement::new(observable, alpha)
        .unwrap()
        .eval_with(state)
        .unwrap()
        .re
}

// ---------------------------------------------------------------------------
// Boundary behavior
// ---------------------------------------------------------------------------

#[test]
fn alpha_one_equals_ordinary_expectation() {
    let observable = Expr::pauli_sum(&[(1.0, "ZI"), (0.5, "IZ")]).unwrap();
    let state = sampled_state(&[("00", 0.4), ("10", 0.3), ("01", 0.2), ("11", 0.1)]);

    let ordinary = Expr::State(StateFn::measurement(observable.clone()))
        .eval_with(&state)
        .unwrap()
        .re;
    let cvar = cvar_of(observable, 1.0, &state);
    assert!((cvar - ordinary).abs() < 1e-10);
}

#[test]
fn alpha_near_zero_returns_minimum_eigenvalue() {
    // Eigenvalues: 00 → 1.5, 10 → -0.5, 01 → 0.5, 11 → -1.5.
    let observable = Expr::pauli_sum(&[(1.0, "ZI"), (0.5, "IZ")]).unwrap();
    let state = sampled_state(&[("00", 0.4), ("10", 0.3), ("01", 0.2), ("11", 0.1)]);

    let cvar = cvar_of(observable, 1e-9, &state);
    assert!((cvar - (-1.5)).abs() < 1e-6);
}

#[test]
fn intermediate_alpha_weights_the_tail() {
    // Z on a single qubit: |1⟩ has eigenvalue −1 with p = 0.25,
    // |0⟩ has +1 with p = 0.75. With α = 0.5 the tail holds all of the
    // −1 mass (0.25) and 0.25 of the +1 mass:
    // CVaR = (0.25·(−1) + 0.25·(+1)) / 0.5 = 0.
    let observable = Expr::pauli("Z").unwrap();
    let state = sampled_state(&[("0", 0.75), ("1", 0.25)]);
    let cvar = cvar_of(observable, 0.5, &state);
    assert!(cvar.abs() < 1e-10);
}

#[test]
fn cvar_is_monotone_in_alpha() {
    let observable = Expr::pauli_sum(&[(1.0, "ZI"), (0.5, "IZ")]).unwrap();
    let state = sampled_state(&[("00", 0.4), ("10", 0.3), ("01", 0.2), ("11", 0.1)]);

    let mut last = f64::NEG_INFINITY;
    for alpha in [0.1, 0.25, 0.5, 0.75, 1.0] {
        let value = cvar_of(observable.clone(), alpha, &state);
        assert!(value >= last - 1e-12, "CVaR must not decrease with alpha");
        last = value;
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn alpha_out_of_range_is_rejected() {
    let z = Expr::pauli("Z").unwrap();
    for alpha in [0.0, -0.5, 1.0001] {
        assert!(matches!(
            CVarMeasurement::new(z.clone(), alpha),
            Err(ExprError::InvalidAlpha(_))
        ));
    }
}

#[test]
fn adjoint_is_undefined() {
    let cvar = CVarMeasurement::new(Expr::pauli("Z").unwrap(), 0.3).unwrap();
    assert!(matches!(
        Expr::CVar(cvar).adjoint(),
        Err(ExprError::CVarAdjoint)
    ));
}

#[test]
fn width_mismatch_is_rejected() {
    let cvar = CVarMeasurement::new(Expr::pauli("ZZ").unwrap(), 0.5).unwrap();
    let state = sampled_state(&[("0", 1.0)]);
    assert!(matches!(
        cvar.eval_with(&state),
        Err(ExprError::QubitCountMismatch { .. })
    ));
}

#[test]
fn scaling_scales_the_result() {
    let observable = Expr::pauli("Z").unwrap();
    let state = sampled_state(&[("0", 0.5), ("1", 0.5)]);
    let base = CVarMeasurement::new(observable.clone(), 0.5).unwrap();
    let scaled = base.scaled(Complex64::new(3.0, 0.0));
    let a = base.eval_with(&state).unwrap().re;
    let b = scaled.eval_with(&state).unwrap().re;
    assert!((b - 3.0 * a).abs() < 1e-12);
}
