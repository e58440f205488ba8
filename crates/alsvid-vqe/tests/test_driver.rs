//! Tests for the variational driver loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alsvid_adapter_sim::{ShotBackend, StatevectorBackend};
use alsvid_eval::GradientMethod;
use alsvid_expr::Expr;
use alsvid_hal::{Backend, Capabilities, HalResult, RunResult};
use alsvid_ir::Circuit;
use alsvid_vqe::{
    DriverState, EfficientAnsatz, Eigenstate, GradientDescent, Optimizer, Optimum, Vqe, VqeError,
};

/// Counts backend calls; used to verify validation happens first.
struct CountingBackend {
    inner: StatevectorBackend,
    executes: Arc<AtomicUsize>,
}

impl CountingBackend {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let executes = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner: StatevectorBackend::new(),
                executes: Arc::clone(&executes),
            },
            executes,
        )
    }
}

impl Backend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn capabilities(&self) -> &Capabilities {
        self.inner.capabilities()
    }

    fn transpile(&self, circuits: &[Circuit]) -> HalResult<Vec<Circuit>> {
        self.inner.transpile(circuits)
    }

    fn execute(&self, circuits: &[Circuit], had_transpiled: bool) -> HalResult<RunResult> {
        self.executes.fetch_add(1, Ordering::Relaxed);
        self.inner.execute(circuits, had_transpiled)
    }
}

/// An optimizer whose capability flags are test-controlled.
struct FlaggedOptimizer {
    supports_bounds: bool,
    requires_bounds: bool,
    supports_initial_point: bool,
}

impl Optimizer for FlaggedOptimizer {
    fn supports_bounds(&self) -> bool {
        self.supports_bounds
    }

    fn requires_bounds(&self) -> bool {
        self.requires_bounds
    }

    fn supports_initial_point(&self) -> bool {
        self.supports_initial_point
    }

    fn optimize(
        &self,
        num_params: usize,
        cost: &mut (dyn FnMut(&[f64]) -> Vec<f64> + '_),
        _gradient: Option<&mut (dyn FnMut(&[f64]) -> Vec<f64> + '_)>,
        _bounds: &[Option<(f64, f64)>],
        initial_point: Option<&[f64]>,
    ) -> Optimum {
        let point: Vec<f64> =
            initial_point.map_or_else(|| vec![0.0; num_params], <[f64]>::to_vec);
        let value = cost(&point)[0];
        Optimum {
            point,
            value,
            evaluations: 1,
        }
    }
}

fn one_qubit_hamiltonian() -> Expr {
    Expr::pauli_sum(&[(0.5, "X"), (-1.0, "Z")]).unwrap()
}

// ---------------------------------------------------------------------------
// Validation before any backend call
// ---------------------------------------------------------------------------

#[test]
fn wrong_initial_point_length_fails_before_execution() {
    let (backend, executes) = CountingBackend::new();
    let mut vqe = Vqe::new(EfficientAnsatz::new(1, 1), GradientDescent::new(10), backend)
        .with_operator(one_qubit_hamiltonian())
        .with_initial_point(vec![0.1, 0.2, 0.3]); // ansatz has 4 parameters

    let result = vqe.run();
    assert!(matches!(
        result,
        Err(VqeError::InitialPointDimension { expected: 4, got: 3 })
    ));
    assert_eq!(executes.load(Ordering::Relaxed), 0, "no backend call made");
    assert_eq!(vqe.state(), DriverState::Failed);
}

#[test]
fn missing_operator_fails_immediately() {
    let (backend, executes) = CountingBackend::new();
    let mut vqe = Vqe::new(EfficientAnsatz::new(1, 1), GradientDescent::new(10), backend);
    assert!(matches!(vqe.run(), Err(VqeError::MissingOperator)));
    assert_eq!(executes.load(Ordering::Relaxed), 0);
    assert_eq!(vqe.state(), DriverState::Failed);
}

#[test]
fn ansatz_operator_width_mismatch_fails() {
    let mut vqe = Vqe::new(
        EfficientAnsatz::new(2, 1),
        GradientDescent::new(10),
        StatevectorBackend::new(),
    )
    .with_operator(one_qubit_hamiltonian());
    assert!(matches!(
        vqe.run(),
        Err(VqeError::AnsatzOperatorMismatch { ansatz: 2, operator: 1 })
    ));
}

#[test]
fn optimizer_requiring_bounds_rejects_unbounded_problem() {
    let (backend, executes) = CountingBackend::new();
    let optimizer = FlaggedOptimizer {
        supports_bounds: true,
        requires_bounds: true,
        supports_initial_point: true,
    };
    let mut vqe = Vqe::new(EfficientAnsatz::new(1, 1), optimizer, backend)
        .with_operator(one_qubit_hamiltonian());
    assert!(matches!(vqe.run(), Err(VqeError::BoundsRequired)));
    assert_eq!(executes.load(Ordering::Relaxed), 0);
}

#[test]
fn optimizer_without_initial_point_support_rejects_one() {
    let optimizer = FlaggedOptimizer {
        supports_bounds: false,
        requires_bounds: false,
        supports_initial_point: false,
    };
    let mut vqe = Vqe::new(EfficientAnsatz::new(1, 1), optimizer, StatevectorBackend::new())
        .with_operator(one_qubit_hamiltonian())
        .with_initial_point(vec![0.0; 4]);
    assert!(matches!(vqe.run(), Err(VqeError::InitialPointUnsupported)));
}

// ---------------------------------------------------------------------------
// End-to-end optimization
// ---------------------------------------------------------------------------

#[test]
fn converges_to_one_qubit_ground_energy() {
    // Ground energy of 0.5·X − Z is −√(0.25 + 1) = −√1.25.
    let mut vqe = Vqe::new(
        EfficientAnsatz::new(1, 1),
        GradientDescent::new(300).with_learning_rate(0.3),
        StatevectorBackend::new(),
    )
    .with_operator(one_qubit_hamiltonian())
    .with_gradient(GradientMethod::ParameterShift)
    .with_initial_point(vec![0.1; 4]);

    let outcome = vqe.run().unwrap();
    let exact = -(1.25_f64).sqrt();
    assert!(
        (outcome.optimal_value - exact).abs() < 0.01,
        "got {}, expected {exact}",
        outcome.optimal_value
    );
    assert!(outcome.cost_function_evals > 0);
    assert_eq!(vqe.state(), DriverState::Converged);

    match &outcome.eigenstate {
        Eigenstate::Vector(amplitudes) => assert_eq!(amplitudes.len(), 2),
        Eigenstate::Counts(_) => panic!("statevector backend reports a vector"),
    }
}

#[test]
fn converges_on_two_qubit_ising_model() {
    // H = −Z₀Z₁ − 0.5(X₀ + X₁), ground energy −√2.
    let hamiltonian = Expr::pauli_sum(&[(-1.0, "ZZ"), (-0.5, "XI"), (-0.5, "IX")]).unwrap();
    let mut vqe = Vqe::new(
        EfficientAnsatz::new(2, 1),
        GradientDescent::new(800).with_learning_rate(0.2),
        StatevectorBackend::new(),
    )
    .with_operator(hamiltonian)
    .with_gradient(GradientMethod::ParameterShift)
    .with_initial_point(vec![0.2; 8]);

    let outcome = vqe.run().unwrap();
    let exact = -(2.0_f64).sqrt();
    assert!(
        (outcome.optimal_value - exact).abs() < 0.05,
        "got {}, expected {exact}",
        outcome.optimal_value
    );
}

#[test]
fn shot_backend_run_reports_counts_eigenstate() {
    let mut vqe = Vqe::new(
        EfficientAnsatz::new(1, 1),
        GradientDescent::new(40).with_learning_rate(0.2),
        ShotBackend::with_seed(4096, 21),
    )
    .with_operator(one_qubit_hamiltonian())
    .with_initial_point(vec![0.1; 4]);

    let outcome = vqe.run().unwrap();
    match &outcome.eigenstate {
        Eigenstate::Counts(counts) => assert_eq!(counts.total(), 4096),
        Eigenstate::Vector(_) => panic!("shot backend reports counts"),
    }
    // Very loose: sampled optimization still has to head downhill.
    assert!(outcome.optimal_value < 0.5);
}

#[test]
fn aux_operators_are_evaluated_at_the_optimum() {
    let mut vqe = Vqe::new(
        EfficientAnsatz::new(1, 1),
        GradientDescent::new(300).with_learning_rate(0.3),
        StatevectorBackend::new(),
    )
    .with_operator(one_qubit_hamiltonian())
    .with_gradient(GradientMethod::ParameterShift)
    .with_aux_operator("z", Expr::pauli("Z").unwrap())
    .with_aux_operator("x", Expr::pauli("X").unwrap())
    .with_initial_point(vec![0.1; 4]);

    let outcome = vqe.run().unwrap();
    assert_eq!(outcome.aux_values.len(), 2);

    // At the ground state of 0.5X − Z: ⟨Z⟩ = 1/√1.25·1 = 2/√5,
    // ⟨X⟩ = −0.5·⟨Z⟩ by the Hellmann-Feynman relation for this H.
    let z = outcome.aux_values[0].1;
    let x = outcome.aux_values[1].1;
    assert!((z - 2.0 / 5.0_f64.sqrt()).abs() < 0.05);
    assert!((x + 1.0 / 5.0_f64.sqrt()).abs() < 0.05);
}

#[test]
fn callback_sees_monotone_counts() {
    use std::sync::Mutex;
    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(vec![]));
    let seen_in_cb = Arc::clone(&seen);

    let mut vqe = Vqe::new(
        EfficientAnsatz::new(1, 1),
        GradientDescent::new(5).with_learning_rate(0.1),
        StatevectorBackend::new(),
    )
    .with_operator(one_qubit_hamiltonian())
    .with_seed(2)
    .with_callback(Box::new(move |count, params, _mean, std| {
        assert_eq!(params.len(), 4);
        assert_eq!(std, 0.0);
        seen_in_cb.lock().unwrap().push(count);
    }));

    let outcome = vqe.run().unwrap();
    let counts = seen.lock().unwrap();
    assert!(!counts.is_empty());
    assert!(counts.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(*counts.last().unwrap(), outcome.cost_function_evals);
}

#[test]
fn driver_state_transitions() {
    let mut vqe = Vqe::new(
        EfficientAnsatz::new(1, 1),
        GradientDescent::new(5),
        StatevectorBackend::new(),
    )
    .with_operator(one_qubit_hamiltonian())
    .with_seed(1);
    assert_eq!(vqe.state(), DriverState::Configured);
    vqe.run().unwrap();
    assert_eq!(vqe.state(), DriverState::Converged);
}
