//! Statevector simulation engine.

use num_complex::Complex64;
use rand::Rng;
use rand::rngs::StdRng;

use alsvid_hal::{HalError, HalResult};
use alsvid_ir::{Instruction, InstructionKind, ParameterExpression, StandardGate};

/// A statevector representing a quantum state.
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The amplitude vector.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Apply an instruction to the statevector.
    ///
    /// Measurements and snapshots leave the state untouched; a gate with an
    /// unbound symbolic parameter is an execution error.
    pub fn apply(&mut self, instruction: &Instruction) -> HalResult<()> {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let qubits: Vec<_> = instruction.qubits.iter().map(|q| q.0 as usize).collect();
                self.apply_standard_gate(gate, &qubits)
            }
            InstructionKind::Measure | InstructionKind::ExpectationSnapshot { .. } => Ok(()),
        }
    }

    fn apply_standard_gate(&mut self, gate: &StandardGate, qubits: &[usize]) -> HalResult<()> {
        use std::f64::consts::PI;
        match gate {
            StandardGate::I => {}
            StandardGate::X => self.apply_x(qubits[0]),
            StandardGate::Y => self.apply_y(qubits[0]),
            StandardGate::Z => self.apply_z(qubits[0]),
            StandardGate::H => self.apply_h(qubits[0]),
            StandardGate::S => self.apply_phase(qubits[0], PI / 2.0),
            StandardGate::Sdg => self.apply_phase(qubits[0], -PI / 2.0),
            StandardGate::T => self.apply_phase(qubits[0], PI / 4.0),
            StandardGate::Tdg => self.apply_phase(qubits[0], -PI / 4.0),
            StandardGate::Rx(theta) => {
                let t = bound_value(gate, theta)?;
                self.apply_rx(qubits[0], t);
            }
            StandardGate::Ry(theta) => {
                let t = bound_value(gate, theta)?;
                self.apply_ry(qubits[0], t);
            }
            StandardGate::Rz(theta) => {
                let t = bound_value(gate, theta)?;
                self.apply_rz(qubits[0], t);
            }
            StandardGate::P(theta) => {
                let t = bound_value(gate, theta)?;
                self.apply_phase(qubits[0], t);
            }
            StandardGate::CX => self.apply_cx(qubits[0], qubits[1]),
            StandardGate::CY => self.apply_cy(qubits[0], qubits[1]),
            StandardGate::CZ => self.apply_cz(qubits[0], qubits[1]),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
            StandardGate::RZZ(theta) => {
                let t = bound_value(gate, theta)?;
                self.apply_rzz(qubits[0], qubits[1], t);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Single-qubit gate implementations
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_z(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    fn apply_h(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = sqrt2_inv * (a + b);
                self.amplitudes[j] = sqrt2_inv * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] *= phase;
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        let neg_i_s = Complex64::new(0.0, -s);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + neg_i_s * b;
                self.amplitudes[j] = neg_i_s * a + c * b;
            }
        }
    }

    fn apply_ry(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a - s * b;
                self.amplitudes[j] = s * a + c * b;
            }
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                self.amplitudes[i] *= phase_0;
            } else {
                self.amplitudes[i] *= phase_1;
            }
        }
    }

    // =========================================================================
    // Two-qubit gate implementations
    // =========================================================================

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cy(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask != 0) {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..(1 << self.num_qubits) {
            let b1 = (i & mask1) != 0;
            let b2 = (i & mask2) != 0;
            if b1 && !b2 {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_rzz(&mut self, q1: usize, q2: usize, theta: f64) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        let inner = Complex64::from_polar(1.0, theta / 2.0);
        let outer = Complex64::from_polar(1.0, -theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            let parity = ((i & mask1) != 0) != ((i & mask2) != 0);
            self.amplitudes[i] *= if parity { inner } else { outer };
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// The outcome probabilities |a_i|².
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Sample one measurement outcome.
    pub fn sample(&self, rng: &mut StdRng) -> usize {
        let r: f64 = rng.r#gen();
        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }
        // Fallback (shouldn't happen with normalized states)
        self.amplitudes.len() - 1
    }

    /// Convert a measurement outcome to a bitstring (char k = qubit k).
    pub fn outcome_to_bitstring(&self, outcome: usize) -> String {
        (0..self.num_qubits)
            .map(|k| if outcome >> k & 1 == 1 { '1' } else { '0' })
            .collect()
    }

    /// The expectation value `⟨ψ| Σ c·P |ψ⟩` of a weighted Pauli sum.
    ///
    /// Labels use char k = qubit k and must span all qubits.
    pub fn expectation_of_pauli_sum(&self, terms: &[(f64, String)]) -> HalResult<Complex64> {
        let mut total = Complex64::new(0.0, 0.0);
        for (coeff, label) in terms {
            total += Complex64::new(*coeff, 0.0) * self.expectation_of_pauli(label)?;
        }
        Ok(total)
    }

    fn expectation_of_pauli(&self, label: &str) -> HalResult<Complex64> {
        if label.len() != self.num_qubits {
            return Err(HalError::Unsupported(format!(
                "Pauli label '{label}' does not span {} qubits",
                self.num_qubits
            )));
        }
        // Apply P to a copy, then take the inner product with the original.
        let mut transformed = self.amplitudes.clone();
        for (k, ch) in label.chars().enumerate() {
            match ch {
                'I' => {}
                'X' => apply_x_to(&mut transformed, k),
                'Y' => apply_y_to(&mut transformed, k),
                'Z' => apply_z_to(&mut transformed, k),
                other => {
                    return Err(HalError::Unsupported(format!(
                        "invalid Pauli label character '{other}'"
                    )));
                }
            }
        }
        let mut acc = Complex64::new(0.0, 0.0);
        for (orig, t) in self.amplitudes.iter().zip(&transformed) {
            acc += orig.conj() * t;
        }
        Ok(acc)
    }
}

fn bound_value(gate: &StandardGate, theta: &ParameterExpression) -> HalResult<f64> {
    theta.as_f64().ok_or_else(|| HalError::UnboundParameter {
        gate: gate.name().to_string(),
        parameter: theta
            .symbols()
            .into_iter()
            .next()
            .unwrap_or_else(|| gate.name().to_string()),
    })
}

fn apply_x_to(amplitudes: &mut [Complex64], qubit: usize) {
    let mask = 1 << qubit;
    for i in 0..amplitudes.len() {
        if i & mask == 0 {
            amplitudes.swap(i, i | mask);
        }
    }
}

fn apply_y_to(amplitudes: &mut [Complex64], qubit: usize) {
    let mask = 1 << qubit;
    let i_val = Complex64::new(0.0, 1.0);
    for i in 0..amplitudes.len() {
        if i & mask == 0 {
            let j = i | mask;
            let tmp = amplitudes[i];
            amplitudes[i] = -i_val * amplitudes[j];
            amplitudes[j] = i_val * tmp;
        }
    }
}

fn apply_z_to(amplitudes: &mut [Complex64], qubit: usize) {
    let mask = 1 << qubit;
    for (i, amp) in amplitudes.iter_mut().enumerate() {
        if i & mask != 0 {
            *amp = -*amp;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{Circuit, QubitId};
    use rand::SeedableRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn run(circuit: &Circuit) -> Statevector {
        let mut sv = Statevector::new(circuit.num_qubits() as usize);
        for inst in circuit.instructions() {
            sv.apply(inst).unwrap();
        }
        sv
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(1.0, 0.0)));
        assert!(sv.amplitudes[1..].iter().all(|a| a.norm() < 1e-12));
    }

    #[test]
    fn test_bell_state() {
        let mut circuit = Circuit::with_size("bell", 2, 0);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        let sv = run(&circuit);

        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(sqrt2_inv, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(sqrt2_inv, 0.0)));
        assert!(sv.amplitudes[1].norm() < 1e-12);
        assert!(sv.amplitudes[2].norm() < 1e-12);
    }

    #[test]
    fn test_unbound_parameter_is_error() {
        let mut circuit = Circuit::with_size("p", 1, 0);
        circuit
            .rx(alsvid_ir::ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();
        let mut sv = Statevector::new(1);
        let result = sv.apply(&circuit.instructions()[0]);
        assert!(matches!(result, Err(HalError::UnboundParameter { .. })));
    }

    #[test]
    fn test_sample_deterministic_on_basis_state() {
        let mut circuit = Circuit::with_size("x", 1, 0);
        circuit.x(QubitId(0)).unwrap();
        let sv = run(&circuit);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(sv.sample(&mut rng), 1);
        }
    }

    #[test]
    fn test_bitstring_convention() {
        // Index 1 means qubit 0 is |1⟩, so char 0 of the bitstring is '1'.
        let sv = Statevector::new(2);
        assert_eq!(sv.outcome_to_bitstring(1), "10");
        assert_eq!(sv.outcome_to_bitstring(2), "01");
    }

    #[test]
    fn test_pauli_expectation_on_plus_state() {
        let mut circuit = Circuit::with_size("plus", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let sv = run(&circuit);
        let x = sv
            .expectation_of_pauli_sum(&[(1.0, "X".to_string())])
            .unwrap();
        let z = sv
            .expectation_of_pauli_sum(&[(1.0, "Z".to_string())])
            .unwrap();
        assert!((x.re - 1.0).abs() < 1e-10);
        assert!(z.norm() < 1e-10);
    }

    #[test]
    fn test_rzz_diagonal_phases() {
        use std::f64::consts::PI;
        let mut circuit = Circuit::with_size("rzz", 2, 0);
        circuit.x(QubitId(0)).unwrap();
        circuit.rzz(PI, QubitId(0), QubitId(1)).unwrap();
        let sv = run(&circuit);
        // |10⟩ has odd parity: phase e^{iπ/2} = i.
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 1.0)));
    }
}
