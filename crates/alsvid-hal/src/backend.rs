//! Backend trait and configuration.
//!
//! The contract is deliberately synchronous and minimal: the evaluation
//! engine is single-threaded and makes exactly one blocking `execute` call
//! per batch. Batching — not concurrency — is what amortizes the round
//! trip.
//!
//! ```text
//!   capabilities() ──→ transpile() ──→ execute()
//!    (sync, &ref)       (per tree)     (one call per batch)
//! ```
//!
//! ## Contract
//!
//! - `capabilities()` MUST be synchronous and infallible; implementations
//!   cache capabilities at construction and return a reference.
//! - `transpile()` is called at most once per distinct expression tree; its
//!   output is cached and re-bound by the caller. A failing transpilation
//!   makes the caller fall back to submitting raw circuits once.
//! - `execute()` receives the full concrete batch. Errors are surfaced to
//!   the caller unchanged; there is no retry layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use alsvid_ir::Circuit;

use crate::capability::Capabilities;
use crate::error::HalResult;
use crate::result::RunResult;

/// Trait for execution backends.
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    ///
    /// Synchronous and infallible; cached at construction time.
    fn capabilities(&self) -> &Capabilities;

    /// Transpile circuits for this backend.
    ///
    /// Simulators typically return the circuits unchanged.
    fn transpile(&self, circuits: &[Circuit]) -> HalResult<Vec<Circuit>>;

    /// Execute a batch of concrete circuits in one call.
    ///
    /// `had_transpiled` reports whether the batch went through
    /// [`Backend::transpile`]; backends that require their own compilation
    /// step can act on it.
    fn execute(&self, circuits: &[Circuit], had_transpiled: bool) -> HalResult<RunResult>;
}

impl<T: Backend + ?Sized> Backend for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn capabilities(&self) -> &Capabilities {
        (**self).capabilities()
    }

    fn transpile(&self, circuits: &[Circuit]) -> HalResult<Vec<Circuit>> {
        (**self).transpile(circuits)
    }

    fn execute(&self, circuits: &[Circuit], had_transpiled: bool) -> HalResult<RunResult> {
        (**self).execute(circuits, had_transpiled)
    }
}

/// Configuration for a backend instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend.
    pub name: String,
    /// Additional configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Add extra configuration.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Trait for creating backends from configuration.
pub trait BackendFactory: Backend + Sized {
    /// Create a backend from configuration.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}
