//! The variational-form contract and a hardware-efficient implementation.

use alsvid_ir::{Circuit, IrResult, ParameterExpression, QubitId};

/// A parameterized trial-state builder.
///
/// The driver treats the ansatz as an opaque capability provider: it asks
/// for parameter count, bounds and preferred starting values, and builds
/// one circuit per optimization run with free symbols that the sampler
/// binds to concrete values.
pub trait Ansatz {
    /// Number of qubits of the trial state.
    fn num_qubits(&self) -> u32;

    /// Number of free parameters.
    fn num_parameters(&self) -> usize;

    /// Per-parameter bounds; `None` means unbounded.
    fn parameter_bounds(&self) -> Vec<Option<(f64, f64)>> {
        vec![None; self.num_parameters()]
    }

    /// A preferred starting point, if the form has one.
    fn preferred_init_points(&self) -> Option<Vec<f64>> {
        None
    }

    /// Build the trial circuit over the given parameter expressions.
    ///
    /// `params.len()` equals [`Ansatz::num_parameters`].
    fn construct_circuit(&self, params: &[ParameterExpression]) -> IrResult<Circuit>;
}

/// A hardware-efficient layered ansatz.
///
/// Each qubit gets Ry/Rz rotations, interleaved with linear CX
/// entanglement between repetitions:
///
/// ```text
/// [Ry Rz] — CX chain — [Ry Rz] — … — CX chain — [Ry Rz]
/// ```
///
/// Parameter count is `2 · num_qubits · (reps + 1)`.
#[derive(Debug, Clone)]
pub struct EfficientAnsatz {
    num_qubits: u32,
    reps: usize,
}

impl EfficientAnsatz {
    /// Create an ansatz with `reps` entangling repetitions.
    pub fn new(num_qubits: u32, reps: usize) -> Self {
        Self { num_qubits, reps }
    }
}

impl Ansatz for EfficientAnsatz {
    fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    fn num_parameters(&self) -> usize {
        2 * self.num_qubits as usize * (self.reps + 1)
    }

    fn construct_circuit(&self, params: &[ParameterExpression]) -> IrResult<Circuit> {
        let mut circuit = Circuit::with_size("efficient_ansatz", self.num_qubits, 0);
        let mut next = 0usize;
        let mut rotation_layer =
            |circuit: &mut Circuit, params: &[ParameterExpression]| -> IrResult<()> {
                for q in 0..self.num_qubits {
                    circuit.ry(params[next].clone(), QubitId(q))?;
                    circuit.rz(params[next + 1].clone(), QubitId(q))?;
                    next += 2;
                }
                Ok(())
            };

        rotation_layer(&mut circuit, params)?;
        for _ in 0..self.reps {
            for q in 0..self.num_qubits.saturating_sub(1) {
                circuit.cx(QubitId(q), QubitId(q + 1))?;
            }
            rotation_layer(&mut circuit, params)?;
        }
        Ok(circuit)
    }
}

/// Generate the standard parameter symbols `θ[0] … θ[n-1]` for an ansatz.
pub fn parameter_symbols(count: usize) -> Vec<ParameterExpression> {
    (0..count)
        .map(|i| ParameterExpression::symbol(format!("θ[{i}]")))
        .collect()
}

/// The names of the standard parameter symbols.
pub fn parameter_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("θ[{i}]")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_count() {
        let ansatz = EfficientAnsatz::new(3, 2);
        assert_eq!(ansatz.num_parameters(), 18);
    }

    #[test]
    fn test_circuit_uses_all_parameters() {
        let ansatz = EfficientAnsatz::new(2, 1);
        let params = parameter_symbols(ansatz.num_parameters());
        let circuit = ansatz.construct_circuit(&params).unwrap();
        assert_eq!(circuit.parameters().len(), ansatz.num_parameters());
        assert_eq!(circuit.num_qubits(), 2);
    }

    #[test]
    fn test_single_qubit_has_no_entanglers() {
        let ansatz = EfficientAnsatz::new(1, 3);
        let params = parameter_symbols(ansatz.num_parameters());
        let circuit = ansatz.construct_circuit(&params).unwrap();
        // 2 rotations per layer, 4 layers, no CX possible on one qubit.
        assert_eq!(circuit.len(), 8);
    }
}
