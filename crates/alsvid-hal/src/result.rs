//! Execution results: counts, statevectors and snapshots.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Measurement counts keyed by bitstring (char k = qubit k).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    counts: FxHashMap<String, u64>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` observations of `bitstring`, accumulating.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.counts.entry(bitstring.into()).or_insert(0) += count;
    }

    /// The count for one bitstring (0 if never observed).
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Total number of observations.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// The most frequent outcome, if any.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(bitstring, count)| (bitstring.as_str(), *count))
    }

    /// Iterate over `(bitstring, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        let mut counts = Counts::new();
        for (bitstring, count) in iter {
            counts.insert(bitstring, count);
        }
        counts
    }
}

/// The primary data one executed circuit produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultData {
    /// Full amplitude vector (statevector backends).
    Statevector(Vec<Complex64>),
    /// Sampled measurement counts (shot backends).
    Counts(Counts),
}

/// The result of one circuit within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitResult {
    /// The primary result data.
    pub data: ResultData,
    /// Shots used to produce the data (1 for statevector results).
    pub shots: u32,
    /// Precomputed expectation values, keyed by snapshot label.
    pub snapshots: FxHashMap<String, Complex64>,
}

impl CircuitResult {
    /// A statevector result.
    pub fn statevector(amplitudes: Vec<Complex64>) -> Self {
        Self {
            data: ResultData::Statevector(amplitudes),
            shots: 1,
            snapshots: FxHashMap::default(),
        }
    }

    /// A counts result.
    pub fn counts(counts: Counts, shots: u32) -> Self {
        Self {
            data: ResultData::Counts(counts),
            shots,
            snapshots: FxHashMap::default(),
        }
    }

    /// Attach a precomputed expectation value.
    #[must_use]
    pub fn with_snapshot(mut self, label: impl Into<String>, value: Complex64) -> Self {
        self.snapshots.insert(label.into(), value);
        self
    }
}

/// The result of one batched execution call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    results: Vec<CircuitResult>,
    /// Wall-clock execution time in milliseconds, if measured.
    pub execution_time_ms: Option<u64>,
}

impl RunResult {
    /// Create a run result from per-circuit results.
    pub fn new(results: Vec<CircuitResult>) -> Self {
        Self {
            results,
            execution_time_ms: None,
        }
    }

    /// Attach the execution time.
    #[must_use]
    pub fn with_execution_time(mut self, millis: u64) -> Self {
        self.execution_time_ms = Some(millis);
        self
    }

    /// Number of circuit results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The raw result for circuit `index`.
    pub fn circuit(&self, index: usize) -> HalResult<&CircuitResult> {
        self.results.get(index).ok_or(HalError::MissingResultData {
            index,
            kind: "any",
        })
    }

    /// The amplitude vector of circuit `index`.
    pub fn statevector(&self, index: usize) -> HalResult<&[Complex64]> {
        match &self.circuit(index)?.data {
            ResultData::Statevector(amplitudes) => Ok(amplitudes),
            ResultData::Counts(_) => Err(HalError::MissingResultData {
                index,
                kind: "statevector",
            }),
        }
    }

    /// The measurement counts of circuit `index`.
    pub fn counts(&self, index: usize) -> HalResult<&Counts> {
        match &self.circuit(index)?.data {
            ResultData::Counts(counts) => Ok(counts),
            ResultData::Statevector(_) => Err(HalError::MissingResultData {
                index,
                kind: "counts",
            }),
        }
    }

    /// The expectation snapshot of circuit `index` under `label`, if the
    /// backend produced one.
    pub fn expectation_snapshot(&self, index: usize, label: &str) -> HalResult<Option<Complex64>> {
        Ok(self.circuit(index)?.snapshots.get(label).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate() {
        let mut counts = Counts::new();
        counts.insert("00", 1);
        counts.insert("00", 2);
        counts.insert("11", 5);
        assert_eq!(counts.get("00"), 3);
        assert_eq!(counts.total(), 8);
        assert_eq!(counts.most_frequent(), Some(("11", 5)));
    }

    #[test]
    fn test_missing_statevector_errors() {
        let run = RunResult::new(vec![CircuitResult::counts(Counts::new(), 100)]);
        assert!(matches!(
            run.statevector(0),
            Err(HalError::MissingResultData { kind: "statevector", .. })
        ));
        assert!(run.counts(0).is_ok());
    }

    #[test]
    fn test_out_of_range_index_errors() {
        let run = RunResult::new(vec![]);
        assert!(run.circuit(0).is_err());
    }

    #[test]
    fn test_snapshot_lookup() {
        let result = CircuitResult::statevector(vec![Complex64::new(1.0, 0.0)])
            .with_snapshot("energy", Complex64::new(-1.25, 0.0));
        let run = RunResult::new(vec![result]);
        assert_eq!(
            run.expectation_snapshot(0, "energy").unwrap(),
            Some(Complex64::new(-1.25, 0.0))
        );
        assert_eq!(run.expectation_snapshot(0, "other").unwrap(), None);
    }
}
