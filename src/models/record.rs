//! Verdict types and normalized per-(benchmark, solver) records

use std::fmt;

use serde::{Deserialize, Serialize};

use super::execution::ExitClass;

/// Solver-agnostic answer for one benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Satisfiable, possibly with a model
    Sat,
    /// Unsatisfiable
    Unsat,
    /// Solver gave up or ran out of time
    Unknown,
    /// Solver reported an error or crashed
    Error,
    /// No artifact pair, or the output could not be interpreted
    Missing,
}

impl Verdict {
    /// Text used in tables and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Sat => "sat",
            Verdict::Unsat => "unsat",
            Verdict::Unknown => "unknown",
            Verdict::Error => "error",
            Verdict::Missing => "missing",
        }
    }

    /// Check if the verdict decides the instance
    pub fn is_definitive(&self) -> bool {
        matches!(self, Verdict::Sat | Verdict::Unsat)
    }

    /// Parse a solver's verdict token
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "sat" => Some(Verdict::Sat),
            "unsat" => Some(Verdict::Unsat),
            "unknown" => Some(Verdict::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of collected data for a (benchmark, solver) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub benchmark: String,
    pub solver: String,
    /// Wall-clock seconds, absent when the time artifact is missing or bad
    pub elapsed: Option<f64>,
    /// Peak RSS in KB
    pub memory_kb: Option<u64>,
    pub verdict: Verdict,
    /// Witness text for `sat` answers that carried a model
    pub model: Option<String>,
    /// Exit classification recorded by the executor
    pub status: Option<ExitClass>,
}

impl NormalizedRecord {
    /// Placeholder for a pair with no artifacts
    pub fn missing(benchmark: impl Into<String>, solver: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.into(),
            solver: solver.into(),
            elapsed: None,
            memory_kb: None,
            verdict: Verdict::Missing,
            model: None,
            status: None,
        }
    }
}
