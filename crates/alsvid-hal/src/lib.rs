//! Alsvid execution-backend contract
//!
//! A unified, synchronous interface between the evaluation engine and
//! whatever executes circuits: local simulators, remote services, or
//! hardware adapters.
//!
//! # Overview
//!
//! - A common [`Backend`] trait: `capabilities`/`transpile`/`execute`
//! - [`Capabilities`] describing what post-processing the results allow
//! - Unified result handling via [`RunResult`], [`CircuitResult`] and
//!   [`Counts`]
//!
//! The engine calls `execute` once per batch — the single external
//! blocking point of an optimization iteration — and branches on the
//! result kind: expectation snapshot, statevector, or counts.
//!
//! # Implementing a backend
//!
//! ```ignore
//! use alsvid_hal::{Backend, Capabilities, HalResult, RunResult};
//! use alsvid_ir::Circuit;
//!
//! struct MyBackend {
//!     capabilities: Capabilities,
//! }
//!
//! impl Backend for MyBackend {
//!     fn name(&self) -> &str { "my_backend" }
//!
//!     // Sync, infallible — capabilities cached at construction.
//!     fn capabilities(&self) -> &Capabilities {
//!         &self.capabilities
//!     }
//!
//!     fn transpile(&self, circuits: &[Circuit]) -> HalResult<Vec<Circuit>> {
//!         Ok(circuits.to_vec())
//!     }
//!
//!     fn execute(&self, circuits: &[Circuit], had_transpiled: bool) -> HalResult<RunResult> {
//!         // Run the batch and collect per-circuit results.
//!         # todo!()
//!     }
//! }
//! ```

pub mod backend;
pub mod capability;
pub mod error;
pub mod result;

pub use backend::{Backend, BackendConfig, BackendFactory};
pub use capability::Capabilities;
pub use error::{HalError, HalResult};
pub use result::{CircuitResult, Counts, ResultData, RunResult};
