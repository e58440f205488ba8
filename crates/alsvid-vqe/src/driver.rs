//! The variational driver loop.
//!
//! Owns an ansatz, an optimizer, an operator and an expectation pipeline;
//! exposes a batched scalar cost function to the optimizer and reports the
//! best point found. The loop is synchronous: the only blocking point is
//! the sampler's batched backend call inside each cost evaluation.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::{Duration, Instant};

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use alsvid_eval::{
    ExpectationMode, ExpectationValue, Gradient, GradientMethod, ParameterBindings,
};
use alsvid_expr::{Expr, StateFn};
use alsvid_hal::{Backend, Counts};

use crate::ansatz::{Ansatz, parameter_names, parameter_symbols};
use crate::error::{VqeError, VqeResult};
use crate::optimizer::Optimizer;

/// Default bound interval for random initial points.
///
/// Rotation-gate parameters are 2π-periodic, so unbounded parameters draw
/// from ±2π.
const DEFAULT_BOUND: f64 = 2.0 * std::f64::consts::PI;

/// Lifecycle of one driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Components set; no run started.
    Configured,
    /// Optimization in progress.
    Running,
    /// Optimizer signalled termination; results recorded.
    Converged,
    /// Validation or evaluation failed; the loop never finishes.
    Failed,
}

/// The optimal state at the end of a run.
#[derive(Debug, Clone)]
pub enum Eigenstate {
    /// Full amplitude vector (statevector backends).
    Vector(Vec<Complex64>),
    /// Measured counts of the optimal circuit (shot backends).
    Counts(Counts),
}

/// The result of a variational optimization run.
#[derive(Debug, Clone)]
pub struct VqeOutcome {
    /// The optimal parameters.
    pub optimal_point: Vec<f64>,
    /// The cost at the optimal parameters.
    pub optimal_value: f64,
    /// Number of cost-function evaluations.
    pub cost_function_evals: usize,
    /// Wall-clock time spent inside the optimizer.
    pub optimizer_time: Duration,
    /// The optimal eigenstate.
    pub eigenstate: Eigenstate,
    /// Auxiliary operator expectations at the optimal state, by name.
    pub aux_values: Vec<(String, f64)>,
}

/// Callback invoked per cost evaluation: `(count, parameters, mean, std)`.
pub type EvaluationCallback = Box<dyn FnMut(usize, &[f64], f64, f64)>;

/// A variational quantum eigensolver.
///
/// ```text
/// Configured → Running → Converged | Failed
/// ```
///
/// All configuration validation happens before the first backend call.
pub struct Vqe<B: Backend> {
    ansatz: Box<dyn Ansatz>,
    optimizer: Box<dyn Optimizer>,
    backend: Arc<B>,
    operator: Option<Expr>,
    aux_operators: Vec<(String, Expr)>,
    mode: ExpectationMode,
    gradient_method: Option<GradientMethod>,
    initial_point: Option<Vec<f64>>,
    callback: Option<EvaluationCallback>,
    seed: Option<u64>,
    state: DriverState,
}

impl<B: Backend> Vqe<B> {
    /// Create a driver over an ansatz, an optimizer and a backend.
    pub fn new(
        ansatz: impl Ansatz + 'static,
        optimizer: impl Optimizer + 'static,
        backend: B,
    ) -> Self {
        Self {
            ansatz: Box::new(ansatz),
            optimizer: Box::new(optimizer),
            backend: Arc::new(backend),
            operator: None,
            aux_operators: vec![],
            mode: ExpectationMode::Pauli { grouping: true },
            gradient_method: None,
            initial_point: None,
            callback: None,
            seed: None,
            state: DriverState::Configured,
        }
    }

    /// Set the observable to minimize.
    #[must_use]
    pub fn with_operator(mut self, operator: Expr) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Add an auxiliary operator evaluated once at the optimal state.
    #[must_use]
    pub fn with_aux_operator(mut self, name: impl Into<String>, operator: Expr) -> Self {
        self.aux_operators.push((name.into(), operator));
        self
    }

    /// Set the expectation conversion mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExpectationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Supply an analytic gradient to gradient-capable optimizers.
    #[must_use]
    pub fn with_gradient(mut self, method: GradientMethod) -> Self {
        self.gradient_method = Some(method);
        self
    }

    /// Set the starting parameters.
    #[must_use]
    pub fn with_initial_point(mut self, point: Vec<f64>) -> Self {
        self.initial_point = Some(point);
        self
    }

    /// Observe every cost evaluation.
    #[must_use]
    pub fn with_callback(mut self, callback: EvaluationCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Seed the random initial-point draw.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The driver's lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    fn fail(&mut self, err: VqeError) -> VqeError {
        self.state = DriverState::Failed;
        err
    }

    /// Run the optimization to completion.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub fn run(&mut self) -> VqeResult<VqeOutcome> {
        let Some(operator) = self.operator.clone() else {
            return Err(self.fail(VqeError::MissingOperator));
        };
        if operator.num_qubits() != self.ansatz.num_qubits() {
            return Err(self.fail(VqeError::AnsatzOperatorMismatch {
                ansatz: self.ansatz.num_qubits(),
                operator: operator.num_qubits(),
            }));
        }

        let n = self.ansatz.num_parameters();
        let names = parameter_names(n);

        let bounds = self.ansatz.parameter_bounds();
        if bounds.len() != n {
            return Err(self.fail(VqeError::BoundsDimension {
                expected: n,
                got: bounds.len(),
            }));
        }

        let mut initial_point = self
            .initial_point
            .clone()
            .or_else(|| self.ansatz.preferred_init_points());
        if let Some(point) = &initial_point {
            if point.len() != n {
                return Err(self.fail(VqeError::InitialPointDimension {
                    expected: n,
                    got: point.len(),
                }));
            }
        }

        // Capability checks before any backend call.
        let problem_has_bounds = !bounds.is_empty() && bounds.iter().all(Option::is_some);
        if problem_has_bounds && !self.optimizer.supports_bounds() {
            return Err(self.fail(VqeError::BoundsUnsupported));
        }
        if !problem_has_bounds && self.optimizer.requires_bounds() {
            return Err(self.fail(VqeError::BoundsRequired));
        }
        if initial_point.is_some() && !self.optimizer.supports_initial_point() {
            return Err(self.fail(VqeError::InitialPointUnsupported));
        }
        if initial_point.is_none() && self.optimizer.requires_initial_point() {
            let mut rng = self
                .seed
                .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            initial_point = Some(
                bounds
                    .iter()
                    .map(|bound| {
                        let (low, high) = bound.unwrap_or((-DEFAULT_BOUND, DEFAULT_BOUND));
                        rng.gen_range(low..=high)
                    })
                    .collect(),
            );
        }

        self.state = DriverState::Running;

        let circuit = match self.ansatz.construct_circuit(&parameter_symbols(n)) {
            Ok(circuit) => circuit,
            Err(err) => return Err(self.fail(err.into())),
        };
        let mut engine = match ExpectationValue::new(
            operator.clone(),
            Arc::clone(&self.backend),
            self.mode,
        ) {
            Ok(engine) => engine,
            Err(err) => return Err(self.fail(err.into())),
        };
        engine.set_state(Expr::State(StateFn::from_circuit(circuit.clone())));

        let expectation = RefCell::new(engine);
        let error_slot: RefCell<Option<VqeError>> = RefCell::new(None);
        let eval_count = Cell::new(0usize);
        let mut callback = self.callback.take();

        let mut cost = |flat: &[f64]| -> Vec<f64> {
            let sets = if n == 0 { 1 } else { flat.len() / n };
            let mut bindings: ParameterBindings = names
                .iter()
                .map(|name| (name.clone(), Vec::with_capacity(sets)))
                .collect();
            for set in flat.chunks(n.max(1)) {
                for (j, name) in names.iter().enumerate() {
                    bindings
                        .get_mut(name)
                        .expect("binding list present")
                        .push(set[j]);
                }
            }

            let mut engine = expectation.borrow_mut();
            let means: Vec<f64> = match engine.compute(Some(&bindings)) {
                Ok(values) => values.iter().map(|v| v.re).collect(),
                Err(err) => {
                    *error_slot.borrow_mut() = Some(err.into());
                    return vec![f64::NAN; sets];
                }
            };

            if let Some(cb) = callback.as_mut() {
                let stds = match engine.compute_standard_deviation(Some(&bindings)) {
                    Ok(stds) => stds,
                    Err(err) => {
                        *error_slot.borrow_mut() = Some(err.into());
                        return vec![f64::NAN; sets];
                    }
                };
                for (i, set) in flat.chunks(n.max(1)).enumerate() {
                    eval_count.set(eval_count.get() + 1);
                    cb(eval_count.get(), set, means[i], stds[i]);
                }
            } else {
                eval_count.set(eval_count.get() + sets);
            }

            debug!(sets, "cost evaluation complete");
            means
        };

        let gradient_method = self.gradient_method;
        let mut gradient_fn = |point: &[f64]| -> Vec<f64> {
            let method = gradient_method.expect("gradient closure only built when a method is set");
            let mut engine = expectation.borrow_mut();
            match Gradient::new(method).evaluate(&mut engine, &names, point) {
                Ok(grad) => grad,
                Err(err) => {
                    *error_slot.borrow_mut() = Some(err.into());
                    vec![f64::NAN; n]
                }
            }
        };
        let gradient_ref: Option<&mut (dyn FnMut(&[f64]) -> Vec<f64>)> =
            if gradient_method.is_some() && self.optimizer.supports_gradient() {
                Some(&mut gradient_fn)
            } else {
                None
            };

        info!(
            num_params = n,
            has_initial_point = initial_point.is_some(),
            "starting optimizer"
        );
        let start = Instant::now();
        let optimum = self.optimizer.optimize(
            n,
            &mut cost,
            gradient_ref,
            &bounds,
            initial_point.as_deref(),
        );
        let optimizer_time = start.elapsed();

        drop(cost);
        drop(gradient_fn);
        self.callback = callback;

        if let Some(err) = error_slot.into_inner() {
            return Err(self.fail(err));
        }

        info!(
            optimal_value = optimum.value,
            evals = eval_count.get(),
            elapsed_ms = optimizer_time.as_millis() as u64,
            "optimization complete"
        );

        // Evaluate the optimal state and any auxiliary operators once more.
        let optimal_bindings: rustc_hash::FxHashMap<String, f64> = names
            .iter()
            .cloned()
            .zip(optimum.point.iter().copied())
            .collect();
        let optimal_circuit = circuit.bind_parameters(&optimal_bindings);

        let eigenstate = match self.optimal_eigenstate(&optimal_circuit) {
            Ok(eigenstate) => eigenstate,
            Err(err) => return Err(self.fail(err)),
        };

        let mut aux_values = Vec::with_capacity(self.aux_operators.len());
        for (name, aux) in self.aux_operators.clone() {
            let value = match self.eval_aux(&aux, &optimal_circuit) {
                Ok(value) => value,
                Err(err) => return Err(self.fail(err)),
            };
            aux_values.push((name, value));
        }

        self.state = DriverState::Converged;
        Ok(VqeOutcome {
            optimal_point: optimum.point,
            optimal_value: optimum.value,
            cost_function_evals: eval_count.get(),
            optimizer_time,
            eigenstate,
            aux_values,
        })
    }

    fn optimal_eigenstate(&self, optimal_circuit: &alsvid_ir::Circuit) -> VqeResult<Eigenstate> {
        if self.backend.capabilities().statevector {
            let transpiled = self.backend.transpile(std::slice::from_ref(optimal_circuit))?;
            let run = self.backend.execute(&transpiled, true)?;
            Ok(Eigenstate::Vector(run.statevector(0)?.to_vec()))
        } else {
            let mut measured = optimal_circuit.clone();
            measured.measure_all()?;
            let transpiled = self.backend.transpile(&[measured])?;
            let run = self.backend.execute(&transpiled, true)?;
            Ok(Eigenstate::Counts(run.counts(0)?.clone()))
        }
    }

    fn eval_aux(&self, operator: &Expr, optimal_circuit: &alsvid_ir::Circuit) -> VqeResult<f64> {
        let mut engine = ExpectationValue::auto(operator.clone(), Arc::clone(&self.backend))?;
        engine.set_state(Expr::State(StateFn::from_circuit(optimal_circuit.clone())));
        let value = engine.compute(None)?[0].re;
        // Discard numerically-zero values.
        Ok(if value.abs() < 1e-12 { 0.0 } else { value })
    }
}
