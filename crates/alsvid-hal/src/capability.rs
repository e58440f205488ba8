//! Backend capability descriptions.

use serde::{Deserialize, Serialize};

/// What a backend can do.
///
/// Cached at backend construction; callers read it synchronously to decide
/// how to post-process results before ever submitting a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Maximum number of qubits.
    pub num_qubits: u32,
    /// Whether execution reports full amplitude vectors.
    pub statevector: bool,
    /// Whether execution honors expectation-snapshot instructions.
    pub expectation_snapshots: bool,
    /// Shots per circuit for sampled execution.
    pub shots: u32,
    /// Whether this backend is a simulator.
    pub is_simulator: bool,
}

impl Capabilities {
    /// Capabilities of a statevector simulator.
    ///
    /// Statevector backends are deterministic and support snapshots; the
    /// shot count is only used when a caller explicitly asks for sampling.
    pub fn statevector_sim(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            statevector: true,
            expectation_snapshots: true,
            shots: 1,
            is_simulator: true,
        }
    }

    /// Capabilities of a shot-sampling simulator.
    pub fn shot_sim(num_qubits: u32, shots: u32) -> Self {
        Self {
            num_qubits,
            statevector: false,
            expectation_snapshots: false,
            shots,
            is_simulator: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statevector_sim_capabilities() {
        let caps = Capabilities::statevector_sim(20);
        assert!(caps.statevector);
        assert!(caps.expectation_snapshots);
        assert!(caps.is_simulator);
        assert_eq!(caps.num_qubits, 20);
    }

    #[test]
    fn test_shot_sim_capabilities() {
        let caps = Capabilities::shot_sim(20, 1024);
        assert!(!caps.statevector);
        assert_eq!(caps.shots, 1024);
    }
}
