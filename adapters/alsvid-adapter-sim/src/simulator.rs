//! Simulator backend implementations.

use std::sync::Mutex;
use std::time::Instant;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use alsvid_hal::{
    Backend, BackendConfig, BackendFactory, Capabilities, CircuitResult, Counts, HalError,
    HalResult, RunResult,
};
use alsvid_ir::{Circuit, InstructionKind};

use crate::statevector::Statevector;

const DEFAULT_MAX_QUBITS: u32 = 20;
const DEFAULT_SHOTS: u32 = 1024;

/// Run one circuit, collecting expectation snapshots along the way.
fn simulate(circuit: &Circuit) -> HalResult<(Statevector, Vec<(String, Complex64)>)> {
    let mut sv = Statevector::new(circuit.num_qubits() as usize);
    let mut snapshots = Vec::new();
    for inst in circuit.instructions() {
        if let InstructionKind::ExpectationSnapshot { label, terms } = &inst.kind {
            let value = sv.expectation_of_pauli_sum(terms)?;
            snapshots.push((label.clone(), value));
        } else {
            sv.apply(inst)?;
        }
    }
    Ok((sv, snapshots))
}

fn check_width(circuit: &Circuit, max_qubits: u32) -> HalResult<()> {
    if circuit.num_qubits() > max_qubits {
        return Err(HalError::CircuitTooLarge(format!(
            "circuit '{}' has {} qubits but the simulator supports {}",
            circuit.name(),
            circuit.num_qubits(),
            max_qubits
        )));
    }
    Ok(())
}

/// Deterministic statevector backend.
///
/// Executes each circuit once and reports the full amplitude vector,
/// honoring expectation-snapshot instructions. Supports circuits up to
/// ~20 qubits (limited by memory).
pub struct StatevectorBackend {
    config: BackendConfig,
    capabilities: Capabilities,
}

impl StatevectorBackend {
    /// Create a backend with default settings.
    pub fn new() -> Self {
        Self::with_max_qubits(DEFAULT_MAX_QUBITS)
    }

    /// Create a backend with a custom qubit limit.
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self {
            config: BackendConfig::new("statevector_sim"),
            capabilities: Capabilities::statevector_sim(max_qubits),
        }
    }
}

impl Default for StatevectorBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for StatevectorBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn transpile(&self, circuits: &[Circuit]) -> HalResult<Vec<Circuit>> {
        // Every standard gate is native here.
        Ok(circuits.to_vec())
    }

    fn execute(&self, circuits: &[Circuit], _had_transpiled: bool) -> HalResult<RunResult> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(circuits.len());
        for circuit in circuits {
            check_width(circuit, self.capabilities.num_qubits)?;
            let (sv, snapshots) = simulate(circuit)?;
            let mut result = CircuitResult::statevector(sv.amplitudes().to_vec());
            for (label, value) in snapshots {
                result = result.with_snapshot(label, value);
            }
            results.push(result);
        }
        let elapsed = start.elapsed();
        debug!(
            circuits = circuits.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "statevector batch complete"
        );
        Ok(RunResult::new(results).with_execution_time(elapsed.as_millis() as u64))
    }
}

impl BackendFactory for StatevectorBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let max_qubits = config
            .extra
            .get("max_qubits")
            .and_then(serde_json::Value::as_u64)
            .map_or(DEFAULT_MAX_QUBITS, |v| v as u32);
        Ok(Self {
            config,
            capabilities: Capabilities::statevector_sim(max_qubits),
        })
    }
}

/// Shot-sampling backend.
///
/// Simulates each circuit once and samples the final distribution `shots`
/// times. Stochastic unless seeded with [`ShotBackend::with_seed`].
pub struct ShotBackend {
    config: BackendConfig,
    capabilities: Capabilities,
    rng: Mutex<StdRng>,
}

impl ShotBackend {
    /// Create a backend drawing entropy from the OS.
    pub fn new(shots: u32) -> Self {
        Self {
            config: BackendConfig::new("shot_sim"),
            capabilities: Capabilities::shot_sim(DEFAULT_MAX_QUBITS, shots),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a deterministic backend from a seed.
    pub fn with_seed(shots: u32, seed: u64) -> Self {
        Self {
            config: BackendConfig::new("shot_sim"),
            capabilities: Capabilities::shot_sim(DEFAULT_MAX_QUBITS, shots),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Backend for ShotBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn transpile(&self, circuits: &[Circuit]) -> HalResult<Vec<Circuit>> {
        Ok(circuits.to_vec())
    }

    fn execute(&self, circuits: &[Circuit], _had_transpiled: bool) -> HalResult<RunResult> {
        let start = Instant::now();
        let shots = self.capabilities.shots;
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut results = Vec::with_capacity(circuits.len());
        for circuit in circuits {
            check_width(circuit, self.capabilities.num_qubits)?;
            let (sv, _) = simulate(circuit)?;
            let mut counts = Counts::new();
            for _ in 0..shots {
                let outcome = sv.sample(&mut rng);
                counts.insert(sv.outcome_to_bitstring(outcome), 1);
            }
            results.push(CircuitResult::counts(counts, shots));
        }
        let elapsed = start.elapsed();
        debug!(
            circuits = circuits.len(),
            shots,
            elapsed_ms = elapsed.as_millis() as u64,
            "shot batch complete"
        );
        Ok(RunResult::new(results).with_execution_time(elapsed.as_millis() as u64))
    }
}

impl BackendFactory for ShotBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let shots = config
            .extra
            .get("shots")
            .and_then(serde_json::Value::as_u64)
            .map_or(DEFAULT_SHOTS, |v| v as u32);
        let seed = config.extra.get("seed").and_then(serde_json::Value::as_u64);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            capabilities: Capabilities::shot_sim(DEFAULT_MAX_QUBITS, shots),
            rng: Mutex::new(rng),
        })
    }
}
