//! State functions and their measurement duals.
//!
//! A `StateFn` is either a ket (a vector-like object) or, with
//! `is_measurement` set, a bra (a functional that pairs with a ket to give a
//! scalar). The payload can be a sparse amplitude dictionary, a dense
//! vector, an unexecuted circuit, or an operator (whose measurement dual is
//! the expectation functional `⟨·|O|·⟩`).

use ndarray::Array1;
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use alsvid_ir::Circuit;

use crate::error::{ExprError, ExprResult};
use crate::expr::Expr;
use crate::primitive::{bitstring_index, circuit_statevector, index_bitstring};

/// Identity key of a circuit-valued state leaf.
///
/// Generated from a process-wide counter at construction. Clones share the
/// id; freshly built leaves get a new one. The sampler caches transpiled and
/// sampled artifacts under this key, so "the same tree sampled again" is an
/// exact, cheap check instead of a structural comparison on circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(u64);

impl LeafId {
    /// Allocate the next id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        LeafId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// The payload of a state function.
#[derive(Debug, Clone, PartialEq)]
pub enum StatePrimitive {
    /// Sparse amplitudes keyed by bitstring (char k = qubit k).
    Dict(FxHashMap<String, Complex64>),
    /// Dense amplitude vector.
    Vector(Array1<Complex64>),
    /// A circuit preparing the state from `|0…0⟩`; executed by the sampler.
    Circuit {
        /// The preparation circuit.
        circuit: Circuit,
        /// Identity key for sampler caches.
        id: LeafId,
    },
    /// An operator; the measurement dual is the functional `⟨ψ|O|ψ⟩`.
    Operator(Box<Expr>),
}

/// A state function or its measurement dual.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFn {
    primitive: StatePrimitive,
    coeff: Complex64,
    is_measurement: bool,
}

impl StateFn {
    const ONE: Complex64 = Complex64::new(1.0, 0.0);

    /// The computational basis state `|b⟩` for a bitstring.
    pub fn basis(bitstring: &str) -> ExprResult<Self> {
        if bitstring.is_empty() || !bitstring.chars().all(|c| c == '0' || c == '1') {
            return Err(ExprError::InvalidBitstring {
                len: bitstring.len(),
                num_qubits: bitstring.len() as u32,
            });
        }
        let mut map = FxHashMap::default();
        map.insert(bitstring.to_string(), Self::ONE);
        Ok(Self {
            primitive: StatePrimitive::Dict(map),
            coeff: Self::ONE,
            is_measurement: false,
        })
    }

    /// The all-zeros state `|0…0⟩` on `n` qubits.
    pub fn zero(n: u32) -> Self {
        Self::basis(&"0".repeat(n as usize)).expect("valid bitstring")
    }

    /// The all-ones state `|1…1⟩` on `n` qubits.
    pub fn one(n: u32) -> Self {
        Self::basis(&"1".repeat(n as usize)).expect("valid bitstring")
    }

    /// A sparse dictionary state.
    ///
    /// All keys must be bitstrings of equal length.
    pub fn from_dict(amplitudes: FxHashMap<String, Complex64>) -> ExprResult<Self> {
        let mut len = None;
        for key in amplitudes.keys() {
            if !key.chars().all(|c| c == '0' || c == '1') || key.is_empty() {
                return Err(ExprError::InvalidBitstring {
                    len: key.len(),
                    num_qubits: key.len() as u32,
                });
            }
            match len {
                None => len = Some(key.len()),
                Some(l) if l != key.len() => {
                    return Err(ExprError::InvalidBitstring {
                        len: key.len(),
                        num_qubits: l as u32,
                    });
                }
                _ => {}
            }
        }
        if len.is_none() {
            return Err(ExprError::InvalidConversion(
                "dictionary state must have at least one amplitude".into(),
            ));
        }
        Ok(Self {
            primitive: StatePrimitive::Dict(amplitudes),
            coeff: Self::ONE,
            is_measurement: false,
        })
    }

    /// A dense vector state. The length must be a power of two.
    pub fn from_vector(vector: Array1<Complex64>) -> ExprResult<Self> {
        if vector.is_empty() || !vector.len().is_power_of_two() {
            return Err(ExprError::InvalidConversion(format!(
                "state vector length must be a power of two, got {}",
                vector.len()
            )));
        }
        Ok(Self {
            primitive: StatePrimitive::Vector(vector),
            coeff: Self::ONE,
            is_measurement: false,
        })
    }

    /// A circuit-prepared state with a fresh identity key.
    pub fn from_circuit(circuit: Circuit) -> Self {
        Self {
            primitive: StatePrimitive::Circuit {
                circuit,
                id: LeafId::next(),
            },
            coeff: Self::ONE,
            is_measurement: false,
        }
    }

    /// The measurement functional `⟨ψ|O|ψ⟩` of an operator.
    pub fn measurement(operator: Expr) -> Self {
        Self {
            primitive: StatePrimitive::Operator(Box::new(operator)),
            coeff: Self::ONE,
            is_measurement: true,
        }
    }

    /// Rebuild with an explicit payload, coefficient and direction.
    pub(crate) fn raw(
        primitive: StatePrimitive,
        coeff: Complex64,
        is_measurement: bool,
    ) -> Self {
        Self {
            primitive,
            coeff,
            is_measurement,
        }
    }

    /// Return a copy scaled by `scalar`.
    #[must_use]
    pub fn scaled(&self, scalar: Complex64) -> Self {
        Self {
            primitive: self.primitive.clone(),
            coeff: self.coeff * scalar,
            is_measurement: self.is_measurement,
        }
    }

    pub(crate) fn with_coeff(&self, coeff: Complex64) -> Self {
        Self {
            primitive: self.primitive.clone(),
            coeff,
            is_measurement: self.is_measurement,
        }
    }

    /// The payload.
    pub fn primitive(&self) -> &StatePrimitive {
        &self.primitive
    }

    /// The coefficient.
    pub fn coeff(&self) -> Complex64 {
        self.coeff
    }

    /// Whether this is a measurement (bra) rather than a state (ket).
    pub fn is_measurement(&self) -> bool {
        self.is_measurement
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> u32 {
        match &self.primitive {
            StatePrimitive::Dict(map) => {
                map.keys().next().map_or(0, |k| k.len() as u32)
            }
            StatePrimitive::Vector(v) => v.len().trailing_zeros(),
            StatePrimitive::Circuit { circuit, .. } => circuit.num_qubits(),
            StatePrimitive::Operator(op) => op.num_qubits(),
        }
    }

    /// The adjoint: flips ket ↔ bra and conjugates amplitudes.
    pub fn adjoint(&self) -> ExprResult<Self> {
        let primitive = match &self.primitive {
            StatePrimitive::Dict(map) => StatePrimitive::Dict(
                map.iter().map(|(k, v)| (k.clone(), v.conj())).collect(),
            ),
            StatePrimitive::Vector(v) => StatePrimitive::Vector(v.mapv(|a| a.conj())),
            StatePrimitive::Circuit { circuit, .. } => StatePrimitive::Circuit {
                circuit: circuit.inverse()?,
                id: LeafId::next(),
            },
            StatePrimitive::Operator(op) => StatePrimitive::Operator(Box::new(op.adjoint()?)),
        };
        Ok(Self {
            primitive,
            coeff: self.coeff.conj(),
            is_measurement: !self.is_measurement,
        })
    }

    /// The amplitude of one bitstring, including the coefficient.
    ///
    /// The bitstring length must match the qubit count exactly.
    pub fn amplitude(&self, bitstring: &str) -> ExprResult<Complex64> {
        let idx = bitstring_index(bitstring, self.num_qubits())?;
        match &self.primitive {
            StatePrimitive::Dict(map) => Ok(map
                .get(bitstring)
                .copied()
                .unwrap_or(Complex64::new(0.0, 0.0))
                * self.coeff),
            StatePrimitive::Vector(v) => Ok(v[idx] * self.coeff),
            StatePrimitive::Circuit { .. } | StatePrimitive::Operator(_) => {
                Err(ExprError::InvalidConversion(
                    "amplitude of an unsampled circuit or operator state".into(),
                ))
            }
        }
    }

    /// The dense vector form, including the coefficient.
    ///
    /// Circuit leaves are simulated directly (exponential; meant for small
    /// widths — the sampler is the scalable path).
    pub fn to_vector(&self) -> ExprResult<Array1<Complex64>> {
        match &self.primitive {
            StatePrimitive::Dict(map) => {
                let n = self.num_qubits();
                let mut v = Array1::zeros(1usize << n);
                for (key, amp) in map {
                    v[bitstring_index(key, n)?] = *amp;
                }
                Ok(v * self.coeff)
            }
            StatePrimitive::Vector(v) => Ok(v.clone() * self.coeff),
            StatePrimitive::Circuit { circuit, .. } => {
                Ok(circuit_statevector(circuit)? * self.coeff)
            }
            StatePrimitive::Operator(_) => Err(ExprError::InvalidConversion(
                "an operator state function has no vector form".into(),
            )),
        }
    }

    /// The outcome list `(bitstring, amplitude)` including the coefficient.
    ///
    /// Defined for dictionary and vector payloads; circuit and operator
    /// states must be sampled first.
    pub fn outcomes(&self) -> ExprResult<Vec<(String, Complex64)>> {
        match &self.primitive {
            StatePrimitive::Dict(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), *v * self.coeff))
                .collect()),
            StatePrimitive::Vector(v) => {
                let n = self.num_qubits();
                Ok(v.iter()
                    .enumerate()
                    .filter(|(_, amp)| amp.norm_sqr() > 0.0)
                    .map(|(i, amp)| (index_bitstring(i, n), *amp * self.coeff))
                    .collect())
            }
            StatePrimitive::Circuit { .. } | StatePrimitive::Operator(_) => {
                Err(ExprError::InvalidConversion(
                    "outcome distribution of an unsampled circuit or operator state".into(),
                ))
            }
        }
    }

    /// Pair this measurement with a state, producing a scalar.
    ///
    /// Dict/vector measurements are the linear pairing `Σ_b m_b · s_b`
    /// (conjugation happens in `adjoint`, not here). Operator measurements
    /// are the quadratic form `ψ†Oψ`, with a diagonal fast path that never
    /// materializes a matrix.
    pub fn eval_with(&self, front: &Expr) -> ExprResult<Complex64> {
        if !self.is_measurement {
            return Err(ExprError::EvalNotScalar("a non-measurement state function"));
        }
        let state = match front {
            Expr::State(s) if !s.is_measurement() => s,
            _ => {
                return Err(ExprError::EvalNotScalar(
                    "a measurement against a non-state operand",
                ));
            }
        };
        if self.num_qubits() != state.num_qubits() {
            return Err(ExprError::QubitCountMismatch {
                op: "evaluate",
                left: self.num_qubits(),
                right: state.num_qubits(),
            });
        }

        match &self.primitive {
            StatePrimitive::Dict(map) => {
                let mut acc = Complex64::new(0.0, 0.0);
                for (key, m) in map {
                    acc += m * state.amplitude(key)?;
                }
                Ok(acc * self.coeff)
            }
            StatePrimitive::Vector(mv) => {
                let sv = state.to_vector()?;
                let mut acc = Complex64::new(0.0, 0.0);
                for (m, s) in mv.iter().zip(sv.iter()) {
                    acc += m * s;
                }
                Ok(acc * self.coeff)
            }
            StatePrimitive::Operator(op) => {
                let has_outcomes = matches!(
                    state.primitive(),
                    StatePrimitive::Dict(_) | StatePrimitive::Vector(_)
                );
                let value = if op.is_diagonal_operator() && has_outcomes {
                    let mut acc = Complex64::new(0.0, 0.0);
                    for (key, amp) in state.outcomes()? {
                        acc += amp * amp.conj() * op.expectation_of_bitstring(&key)?;
                    }
                    acc
                } else {
                    let v = state.to_vector()?;
                    let m = op.to_matrix()?;
                    let mv = m.dot(&v);
                    v.iter().zip(mv.iter()).map(|(a, b)| a.conj() * b).sum()
                };
                Ok(value * self.coeff)
            }
            StatePrimitive::Circuit { .. } => Err(ExprError::InvalidConversion(
                "sample circuit measurements before evaluation".into(),
            )),
        }
    }
}

impl fmt::Display for StateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_measurement {
            "Measurement"
        } else {
            "StateFn"
        };
        let body = match &self.primitive {
            StatePrimitive::Dict(map) => format!("Dict[{}]", map.len()),
            StatePrimitive::Vector(v) => format!("Vector[{}]", v.len()),
            StatePrimitive::Circuit { circuit, .. } => format!("Circuit({})", circuit.name()),
            StatePrimitive::Operator(op) => format!("Operator({op})"),
        };
        if self.coeff == Self::ONE {
            write!(f, "{kind}({body})")
        } else {
            write!(f, "{} * {kind}({body})", self.coeff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn test_zero_state() {
        let z = StateFn::zero(2);
        assert_eq!(z.num_qubits(), 2);
        assert!(approx(z.amplitude("00").unwrap(), Complex64::new(1.0, 0.0)));
        assert!(approx(z.amplitude("10").unwrap(), Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_amplitude_wrong_length_errors() {
        let z = StateFn::zero(2);
        assert!(matches!(
            z.amplitude("000"),
            Err(ExprError::InvalidBitstring { .. })
        ));
    }

    #[test]
    fn test_dict_keys_must_match_length() {
        let mut map = FxHashMap::default();
        map.insert("0".to_string(), Complex64::new(1.0, 0.0));
        map.insert("01".to_string(), Complex64::new(1.0, 0.0));
        assert!(StateFn::from_dict(map).is_err());
    }

    #[test]
    fn test_adjoint_flips_direction_and_conjugates() {
        let mut map = FxHashMap::default();
        map.insert("0".to_string(), Complex64::new(0.0, 1.0));
        let s = StateFn::from_dict(map).unwrap();
        let adj = s.adjoint().unwrap();
        assert!(adj.is_measurement());
        assert!(approx(adj.amplitude("0").unwrap(), Complex64::new(0.0, -1.0)));
    }

    #[test]
    fn test_linear_pairing() {
        // ⟨1| against (|0⟩ + |1⟩)/√2 gives 1/√2.
        let bra = StateFn::one(1).adjoint().unwrap();
        let s = 1.0 / 2.0_f64.sqrt();
        let ket = StateFn::from_vector(Array1::from_vec(vec![
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
        ]))
        .unwrap();
        let value = bra.eval_with(&Expr::State(ket)).unwrap();
        assert!(approx(value, Complex64::new(s, 0.0)));
    }

    #[test]
    fn test_clone_preserves_leaf_id() {
        let circuit = Circuit::with_size("c", 1, 0);
        let a = StateFn::from_circuit(circuit.clone());
        let b = a.clone();
        let c = StateFn::from_circuit(circuit);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
