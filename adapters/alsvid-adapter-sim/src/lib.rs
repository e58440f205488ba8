//! Alsvid local simulator backends
//!
//! Two [`alsvid_hal::Backend`] implementations over one statevector engine:
//!
//! - [`StatevectorBackend`] — deterministic; reports full amplitude vectors
//!   and honors expectation-snapshot instructions.
//! - [`ShotBackend`] — samples measurement counts; seedable for
//!   reproducible tests.
//!
//! # Example
//!
//! ```rust
//! use alsvid_adapter_sim::StatevectorBackend;
//! use alsvid_hal::Backend;
//! use alsvid_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 0);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! let backend = StatevectorBackend::new();
//! let run = backend.execute(&[circuit], true).unwrap();
//! let amplitudes = run.statevector(0).unwrap();
//! assert!((amplitudes[0].norm_sqr() - 0.5).abs() < 1e-10);
//! ```

pub mod simulator;
pub mod statevector;

pub use simulator::{ShotBackend, StatevectorBackend};
pub use statevector::Statevector;
