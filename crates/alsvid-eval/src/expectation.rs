//! Expectation-value engines.
//!
//! An [`ExpectationValue`] pairs an observable with a parameterized state
//! and a sampler, and folds sampled trees into numbers. The conversion of
//! the measurement ∘ state tree depends on the mode:
//!
//! - `Matrix` — dense operator, quadratic form over sampled amplitudes.
//! - `Pauli` — basis-change rewrite; works on shot backends.
//! - `Snapshot` — the backend computes the value itself via an
//!   expectation-snapshot instruction (fast path).
//! - `CVar` — diagonalizing rewrite plus a CVaR measurement.

use num_complex::Complex64;
use tracing::{debug, instrument};

use alsvid_expr::convert::grouping::pauli_terms;
use alsvid_expr::{
    CVarMeasurement, CombineRule, Expr, MatrixConverter, PauliBasisChange, StateFn,
    StatePrimitive,
};
use alsvid_hal::Backend;

use crate::error::{EvalError, EvalResult};
use crate::sampler::{CircuitSampler, EXPECTATION_SNAPSHOT_LABEL, ParameterBindings};

/// How the observable is converted for evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpectationMode {
    /// Dense matrix conversion; exact on statevector results.
    Matrix,
    /// Pauli basis change; the portable path for shot backends.
    Pauli {
        /// Share one rotated circuit per qubit-wise commuting group.
        grouping: bool,
    },
    /// Backend-computed expectation snapshots.
    Snapshot,
    /// Conditional value at risk over the outcome distribution.
    CVar {
        /// Confidence level in (0, 1].
        alpha: f64,
    },
}

/// An expectation-value pipeline over one observable.
pub struct ExpectationValue<B: Backend> {
    sampler: CircuitSampler<B>,
    mode: ExpectationMode,
    observable: Expr,
    state: Option<Expr>,
    /// The converted measurement ∘ state tree, built once per state so the
    /// sampler sees a stable tree identity across iterations.
    composed: Option<Expr>,
}

impl<B: Backend> ExpectationValue<B> {
    /// Create an engine with an explicit mode.
    pub fn new(observable: Expr, backend: B, mode: ExpectationMode) -> EvalResult<Self> {
        if let ExpectationMode::Snapshot = mode {
            if !backend.capabilities().expectation_snapshots {
                return Err(EvalError::Configuration(format!(
                    "backend '{}' does not support expectation snapshots",
                    backend.name()
                )));
            }
        }
        if let ExpectationMode::CVar { alpha } = mode {
            // Validate α here, at configuration time.
            CVarMeasurement::new(observable.clone(), alpha)?;
        }
        Ok(Self {
            sampler: CircuitSampler::new(backend),
            mode,
            observable,
            state: None,
            composed: None,
        })
    }

    /// Pick a mode from the backend's capabilities: snapshots when
    /// available, otherwise a Pauli basis change with grouping.
    pub fn auto(observable: Expr, backend: B) -> EvalResult<Self> {
        let mode = if backend.capabilities().expectation_snapshots
            && pauli_terms(&observable).is_some()
        {
            ExpectationMode::Snapshot
        } else {
            ExpectationMode::Pauli { grouping: true }
        };
        Self::new(observable, backend, mode)
    }

    /// The sampler (and through it, the backend).
    pub fn sampler(&self) -> &CircuitSampler<B> {
        &self.sampler
    }

    /// The conversion mode.
    pub fn mode(&self) -> ExpectationMode {
        self.mode
    }

    /// The observable.
    pub fn observable(&self) -> &Expr {
        &self.observable
    }

    /// Bind the state whose expectation is computed.
    ///
    /// Typically a parameterized circuit state built once; subsequent
    /// `compute` calls only change parameter values, which keeps the
    /// sampler's caches hot.
    pub fn set_state(&mut self, state: Expr) {
        self.state = Some(state);
        self.composed = None;
    }

    /// The bound state, if any.
    pub fn state(&self) -> Option<&Expr> {
        self.state.as_ref()
    }

    /// Compute `⟨ψ(θ)| O |ψ(θ)⟩` for each binding set.
    ///
    /// Without `params` a single value is returned.
    #[instrument(skip_all)]
    pub fn compute(&mut self, params: Option<&ParameterBindings>) -> EvalResult<Vec<Complex64>> {
        let tree = self.composed_tree()?.clone();
        let sampled = self.sampler.convert(&tree, params)?;
        let values = match (&sampled, params) {
            (Expr::List(l), Some(_)) if l.rule() == CombineRule::Generic => l
                .children()
                .iter()
                .map(|child| self.eval_tree(child))
                .collect::<EvalResult<Vec<_>>>()?,
            _ => vec![self.eval_tree(&sampled)?],
        };
        debug!(evaluations = values.len(), "expectation batch complete");
        Ok(values)
    }

    /// The standard deviation of the estimator for each binding set.
    ///
    /// Zero for deterministic results (statevector, snapshot, matrix) and
    /// for CVaR, which reports no error bars. For sampled counts this is
    /// `sqrt((Σ p_b·h_b² − μ²) / shots)` accumulated over measurement
    /// groups.
    pub fn compute_standard_deviation(
        &mut self,
        params: Option<&ParameterBindings>,
    ) -> EvalResult<Vec<f64>> {
        let deterministic = self.sampler.is_statevector()
            || matches!(
                self.mode,
                ExpectationMode::Snapshot | ExpectationMode::CVar { .. }
            );
        let tree = self.composed_tree()?.clone();
        let sampled = self.sampler.convert(&tree, params)?;
        let trees: Vec<&Expr> = match (&sampled, params) {
            (Expr::List(l), Some(_)) if l.rule() == CombineRule::Generic => {
                l.children().iter().collect()
            }
            _ => vec![&sampled],
        };
        if deterministic {
            return Ok(vec![0.0; trees.len()]);
        }
        let shots = self.sampler.backend().capabilities().shots.max(1) as f64;
        trees
            .into_iter()
            .map(|tree| {
                let mut variance = 0.0;
                sampled_variance(tree, &mut variance)?;
                Ok((variance / shots).sqrt())
            })
            .collect()
    }

    /// Build (once per state) the converted measurement ∘ state tree.
    fn composed_tree(&mut self) -> EvalResult<&Expr> {
        if self.composed.is_none() {
            let state = self.state.clone().ok_or(EvalError::MissingState)?;
            let composed = match self.mode {
                ExpectationMode::Matrix => {
                    let converted = MatrixConverter::new().convert(&self.observable)?;
                    Expr::State(StateFn::measurement(converted)).compose(&state)?
                }
                ExpectationMode::Pauli { grouping } => {
                    let raw = Expr::State(StateFn::measurement(self.observable.clone()))
                        .compose(&state)?;
                    PauliBasisChange::new()
                        .with_grouping(grouping)
                        .convert(&raw)?
                }
                ExpectationMode::CVar { alpha } => {
                    let raw = Expr::CVar(CVarMeasurement::new(self.observable.clone(), alpha)?)
                        .compose(&state)?;
                    PauliBasisChange::new().convert(&raw)?
                }
                ExpectationMode::Snapshot => snapshot_state(&self.observable, &state)?,
            };
            self.composed = Some(composed);
        }
        Ok(self.composed.as_ref().expect("composed cache populated"))
    }

    /// Fold one sampled tree to its scalar.
    fn eval_tree(&self, tree: &Expr) -> EvalResult<Complex64> {
        match self.mode {
            ExpectationMode::Snapshot => {
                // The sampled leaf is ⟨0…0|·value; pair it with |0…0⟩.
                let zero = Expr::State(StateFn::zero(tree.num_qubits()));
                Ok(tree.eval_with(&zero)?)
            }
            _ => Ok(tree.eval()?),
        }
    }
}

/// The snapshot-mode tree: the state circuit with an expectation-snapshot
/// instruction appended. No measurement wrapper — the backend reports the
/// value directly.
fn snapshot_state(observable: &Expr, state: &Expr) -> EvalResult<Expr> {
    let Some(terms) = pauli_terms(observable) else {
        return Err(EvalError::Configuration(
            "snapshot mode requires a Pauli-sum observable".into(),
        ));
    };
    let Expr::State(state_fn) = state else {
        return Err(EvalError::Configuration(
            "snapshot mode requires a circuit state".into(),
        ));
    };
    let StatePrimitive::Circuit { circuit, .. } = state_fn.primitive() else {
        return Err(EvalError::Configuration(
            "snapshot mode requires a circuit state".into(),
        ));
    };

    let labeled: Vec<(f64, String)> = terms
        .iter()
        .map(|(coeff, pauli)| (coeff.re, pauli.to_string()))
        .collect();
    let mut snapshotted = circuit.clone();
    snapshotted.snapshot_expectation(EXPECTATION_SNAPSHOT_LABEL, labeled)?;
    Ok(Expr::State(
        StateFn::from_circuit(snapshotted).scaled(state_fn.coeff()),
    ))
}

/// Accumulate `Σ p_b·h_b² − (Σ p_b·h_b)²` over every diagonal measurement
/// paired with a sampled dictionary in the tree.
fn sampled_variance(tree: &Expr, variance: &mut f64) -> EvalResult<()> {
    if let Expr::List(l) = tree {
        if l.rule() == CombineRule::Compose && l.children().len() == 2 {
            let measurement = &l.children()[0];
            let state = &l.children()[1];
            if let (Expr::State(m), Expr::State(s)) = (measurement, state) {
                if let (StatePrimitive::Operator(op), StatePrimitive::Dict(_)) =
                    (m.primitive(), s.primitive())
                {
                    let scale = (m.coeff() * l.coeff()).re;
                    let mut mean = 0.0;
                    let mut second_moment = 0.0;
                    for (bitstring, amp) in s.outcomes()? {
                        let p = (amp * amp.conj()).re;
                        let h = op.expectation_of_bitstring(&bitstring)?.re * scale;
                        mean += p * h;
                        second_moment += p * h * h;
                    }
                    *variance += second_moment - mean * mean;
                    return Ok(());
                }
            }
        }
        for child in l.children() {
            sampled_variance(child, variance)?;
        }
    }
    Ok(())
}
