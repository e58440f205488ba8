//! The circuit sampler: caching, batching, execution, substitution.
//!
//! Turns a reduced expression tree whose state leaves are circuits into one
//! whose leaves are numeric (amplitude dictionaries or vectors), with at
//! most one backend round trip per distinct parameter batch.
//!
//! Caches are keyed by tree identity: re-converting the same tree (the fast
//! path inside one optimization run, where only parameter values change)
//! reuses the reduced form, the extracted leaves and the transpiled
//! circuits, so the per-iteration cost is one bind + one execute.

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use alsvid_expr::{Expr, LeafId, ListOp, StateFn, StatePrimitive};
use alsvid_hal::{Backend, RunResult};
use alsvid_ir::Circuit;

use crate::error::{EvalError, EvalResult};

/// Snapshot label the sampler looks for on execution results.
pub const EXPECTATION_SNAPSHOT_LABEL: &str = "expectation_value";

/// One list of values per free parameter; list position `i` is binding set
/// `i`. All lists must have equal length.
pub type ParameterBindings = FxHashMap<String, Vec<f64>>;

/// A sampler for circuit-valued state leaves.
pub struct CircuitSampler<B: Backend> {
    backend: B,
    statevector: bool,
    /// The tree the caches below were built from.
    last_op: Option<Expr>,
    reduced: Option<Expr>,
    /// Extracted circuit leaves in traversal order.
    leaves: Option<Vec<(LeafId, StateFn)>>,
    transpiled: Option<Vec<Circuit>>,
    transpile_before_bind: bool,
}

impl<B: Backend> CircuitSampler<B> {
    /// Create a sampler; statevector mode follows the backend's
    /// capabilities.
    pub fn new(backend: B) -> Self {
        let statevector = backend.capabilities().statevector;
        Self {
            backend,
            statevector,
            last_op: None,
            reduced: None,
            leaves: None,
            transpiled: None,
            transpile_before_bind: true,
        }
    }

    /// Create a sampler with an explicit statevector setting.
    ///
    /// Requesting statevector mode on a backend that cannot report
    /// amplitudes is a configuration error here, at construction — not
    /// later at sampling time.
    pub fn with_statevector(backend: B, statevector: bool) -> EvalResult<Self> {
        if statevector && !backend.capabilities().statevector {
            return Err(EvalError::Configuration(format!(
                "statevector sampling requires a statevector backend, not '{}'",
                backend.name()
            )));
        }
        let mut sampler = Self::new(backend);
        sampler.statevector = statevector;
        Ok(sampler)
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the sampler reads amplitude vectors rather than counts.
    pub fn is_statevector(&self) -> bool {
        self.statevector
    }

    /// Convert circuit leaves into numeric leaves.
    ///
    /// With `params`, every circuit is bound to each of the `N` binding
    /// sets and the result is a generic `ListOp` over the `N` per-binding
    /// reconstructions; without, each circuit runs once and the single
    /// rebuilt tree is returned.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub fn convert(
        &mut self,
        operator: &Expr,
        params: Option<&ParameterBindings>,
    ) -> EvalResult<Expr> {
        if self.last_op.as_ref() != Some(operator) {
            debug!("expression identity changed, invalidating sampler caches");
            self.last_op = Some(operator.clone());
            self.reduced = None;
            self.leaves = None;
            self.transpiled = None;
            self.transpile_before_bind = true;
        }

        if self.reduced.is_none() {
            self.reduced = Some(operator.reduce());
        }
        let reduced = self.reduced.clone().expect("reduced cache populated");

        if self.leaves.is_none() {
            let mut leaves = Vec::new();
            extract_circuit_leaves(&reduced, &mut leaves);
            debug!(leaves = leaves.len(), "extracted circuit leaves");
            self.leaves = Some(leaves);
        }

        let num_bindings = match params {
            Some(map) => validate_bindings(map)?,
            None => 1,
        };
        let bindings = materialize_bindings(params, num_bindings);

        let sampled = self.sample_circuits(&bindings)?;

        if params.is_some() {
            let per_binding = (0..num_bindings)
                .map(|index| replace_circuit_leaves(&reduced, &sampled, index))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Expr::List(ListOp::generic(per_binding)))
        } else {
            replace_circuit_leaves(&reduced, &sampled, 0)
        }
    }

    /// Execute every cached circuit leaf under every binding, one backend
    /// call for the whole batch.
    fn sample_circuits(
        &mut self,
        bindings: &[FxHashMap<String, f64>],
    ) -> EvalResult<FxHashMap<LeafId, Vec<StateFn>>> {
        let leaves = self.leaves.as_ref().expect("leaf cache populated");
        if leaves.is_empty() {
            return Ok(FxHashMap::default());
        }

        if self.transpiled.is_none() {
            let circuits: Vec<Circuit> = leaves
                .iter()
                .map(|(_, leaf)| leaf_circuit(leaf, self.statevector))
                .collect::<EvalResult<_>>()?;
            match self.backend.transpile(&circuits) {
                Ok(transpiled) => {
                    self.transpiled = Some(transpiled);
                    self.transpile_before_bind = true;
                }
                Err(err) => {
                    // One fallback: submit raw circuits. Execution failures
                    // below are not retried.
                    warn!(%err, "transpilation failed, submitting raw circuits");
                    self.transpiled = Some(circuits);
                    self.transpile_before_bind = false;
                }
            }
        }
        let transpiled = self.transpiled.as_ref().expect("transpile cache populated");

        // Circuit-major order: all bindings of circuit 0, then circuit 1, …
        let ready: Vec<Circuit> = transpiled
            .iter()
            .flat_map(|circuit| {
                bindings
                    .iter()
                    .map(|binding| circuit.bind_parameters(binding))
            })
            .collect();

        debug!(
            circuits = transpiled.len(),
            bindings = bindings.len(),
            batch = ready.len(),
            "executing batch"
        );
        let results = self
            .backend
            .execute(&ready, self.transpile_before_bind)?;

        let reps = bindings.len();
        let mut sampled = FxHashMap::default();
        for (i, (leaf_id, leaf)) in leaves.iter().enumerate() {
            let mut per_binding = Vec::with_capacity(reps);
            for j in 0..reps {
                per_binding.push(numeric_leaf(&results, i * reps + j, leaf)?);
            }
            sampled.insert(*leaf_id, per_binding);
        }
        Ok(sampled)
    }
}

/// Check all binding lists have one common, non-zero length.
fn validate_bindings(params: &ParameterBindings) -> EvalResult<usize> {
    let mut expected = None;
    for (name, values) in params {
        match expected {
            None => expected = Some(values.len()),
            Some(len) if len != values.len() => {
                return Err(EvalError::BindingLengthMismatch {
                    parameter: name.clone(),
                    expected: len,
                    got: values.len(),
                });
            }
            _ => {}
        }
    }
    match expected {
        Some(0) | None => Err(EvalError::EmptyBindings),
        Some(len) => Ok(len),
    }
}

fn materialize_bindings(
    params: Option<&ParameterBindings>,
    num_bindings: usize,
) -> Vec<FxHashMap<String, f64>> {
    match params {
        None => vec![FxHashMap::default()],
        Some(map) => (0..num_bindings)
            .map(|i| {
                map.iter()
                    .map(|(name, values)| (name.clone(), values[i]))
                    .collect()
            })
            .collect(),
    }
}

/// Collect circuit-valued state leaves in traversal order, keyed by
/// identity. Duplicate ids (clones of the same leaf) are sampled once.
fn extract_circuit_leaves(expr: &Expr, out: &mut Vec<(LeafId, StateFn)>) {
    match expr {
        Expr::State(s) => {
            if let StatePrimitive::Circuit { id, .. } = s.primitive() {
                if !out.iter().any(|(existing, _)| existing == id) {
                    out.push((*id, s.clone()));
                }
            }
        }
        Expr::List(l) => {
            for child in l.children() {
                extract_circuit_leaves(child, out);
            }
        }
        Expr::Primitive(_) | Expr::CVar(_) => {}
    }
}

/// The executable circuit of a leaf: measured for shot backends, bare for
/// statevector backends.
fn leaf_circuit(leaf: &StateFn, statevector: bool) -> EvalResult<Circuit> {
    let StatePrimitive::Circuit { circuit, .. } = leaf.primitive() else {
        unreachable!("extract_circuit_leaves only collects circuit leaves");
    };
    if statevector {
        Ok(circuit.clone())
    } else {
        let mut measured = circuit.clone();
        measured.measure_all()?;
        Ok(measured)
    }
}

/// Build the numeric replacement for one (circuit, binding) pair.
///
/// Branch order is deliberate and tested: a backend-provided expectation
/// snapshot wins over the statevector, which wins over counts.
fn numeric_leaf(results: &RunResult, index: usize, leaf: &StateFn) -> EvalResult<StateFn> {
    if let Some(value) = results.expectation_snapshot(index, EXPECTATION_SNAPSHOT_LABEL)? {
        // ⟨0…0| scaled by the snapshot value; pairing it with |0…0⟩ later
        // yields the value itself.
        let bra = StateFn::zero(leaf.num_qubits()).adjoint()?;
        return Ok(bra.scaled(value * leaf.coeff()));
    }

    let circuit_result = results.circuit(index)?;
    match &circuit_result.data {
        alsvid_hal::ResultData::Statevector(amplitudes) => {
            let vector = ndarray::Array1::from_vec(amplitudes.clone()) * leaf.coeff();
            Ok(StateFn::from_vector(vector)?)
        }
        alsvid_hal::ResultData::Counts(counts) => {
            let shots = circuit_result.shots.max(1) as f64;
            // Square roots of frequencies: downstream composition expects
            // amplitude-like values, not probability-like ones.
            let mut amplitudes = FxHashMap::default();
            for (bitstring, count) in counts.iter() {
                let amplitude = (leaf.coeff() * (count as f64 / shots)).sqrt();
                amplitudes.insert(bitstring.to_string(), amplitude);
            }
            Ok(StateFn::from_dict(amplitudes)?)
        }
    }
}

/// Rebuild the tree with circuit leaves swapped for their sampled numeric
/// counterparts at binding position `index`.
fn replace_circuit_leaves(
    expr: &Expr,
    sampled: &FxHashMap<LeafId, Vec<StateFn>>,
    index: usize,
) -> EvalResult<Expr> {
    match expr {
        Expr::State(s) => match s.primitive() {
            StatePrimitive::Circuit { id, .. } => {
                let replacements = sampled.get(id).ok_or_else(|| {
                    EvalError::Configuration(format!("no sampled result for leaf {id:?}"))
                })?;
                Ok(Expr::State(replacements[index].clone()))
            }
            _ => Ok(expr.clone()),
        },
        Expr::List(l) => {
            let children = l
                .children()
                .iter()
                .map(|child| replace_circuit_leaves(child, sampled, index))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Expr::List(l.with_children(children)))
        }
        Expr::Primitive(_) | Expr::CVar(_) => Ok(expr.clone()),
    }
}
