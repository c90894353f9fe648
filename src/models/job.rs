//! Job descriptors

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of one (solver, benchmark set, benchmark) execution.
///
/// Artifacts, records and table cells are all addressed by this key, never
/// by position or completion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    pub solver: String,
    pub set: String,
    pub benchmark: String,
}

impl JobKey {
    pub fn new(solver: impl Into<String>, set: impl Into<String>, benchmark: impl Into<String>) -> Self {
        Self {
            solver: solver.into(),
            set: set.into(),
            benchmark: benchmark.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.solver, self.set, self.benchmark)
    }
}

/// A resolved job: its key plus the concrete input file the solver reads.
/// Immutable once produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub key: JobKey,
    pub input: PathBuf,
}

impl Job {
    pub fn new(key: JobKey, input: PathBuf) -> Self {
        Self { key, input }
    }

    pub fn solver(&self) -> &str {
        &self.key.solver
    }

    pub fn set(&self) -> &str {
        &self.key.set
    }

    pub fn benchmark(&self) -> &str {
        &self.key.benchmark
    }
}

/// A job the resolver could not produce because its input is absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedJob {
    pub key: JobKey,
    pub expected: PathBuf,
}
