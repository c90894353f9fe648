//! Comparison tables and derived report rows

use serde::{Deserialize, Serialize};

use super::record::{NormalizedRecord, Verdict};

/// One benchmark row: exactly one cell per requested solver, in solver order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub benchmark: String,
    pub cells: Vec<NormalizedRecord>,
}

/// Wide table for one benchmark set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub set: String,
    pub solvers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ComparisonTable {
    /// Number of data columns excluding the benchmark name
    pub fn data_columns(&self) -> usize {
        self.solvers.len() * crate::constants::columns::SOLVER_FIELDS.len()
    }

    /// Cell for a solver in a given row
    pub fn cell(&self, row: usize, solver: &str) -> Option<&NormalizedRecord> {
        let column = self.solvers.iter().position(|s| s == solver)?;
        self.rows.get(row).and_then(|r| r.cells.get(column))
    }

    /// Every record of one solver, in canonical row order
    pub fn column(&self, solver: &str) -> Vec<&NormalizedRecord> {
        match self.solvers.iter().position(|s| s == solver) {
            Some(column) => self.rows.iter().map(|r| &r.cells[column]).collect(),
            None => Vec::new(),
        }
    }
}

/// One point of a solver's cumulative-time curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// 1-based position in ascending time order
    pub rank: usize,
    pub elapsed: f64,
    pub cumulative: f64,
}

/// Cumulative-time series for one solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeSeries {
    pub solver: String,
    pub points: Vec<SeriesPoint>,
}

/// Per-solver verdict counts for one benchmark set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSummary {
    pub solver: String,
    pub sat: usize,
    pub unsat: usize,
    pub unknown: usize,
    pub error: usize,
    pub missing: usize,
    /// Benchmarks where this solver's answer contradicts another solver's
    pub conflicts: usize,
    /// Sum of recorded wall-clock times
    pub total_time: f64,
}

impl SolverSummary {
    pub fn solved(&self) -> usize {
        self.sat + self.unsat
    }
}

/// Fastest definitive answer for one benchmark across all solvers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualBest {
    pub benchmark: String,
    /// `None` when no solver decided the benchmark
    pub solver: Option<String>,
    pub verdict: Verdict,
    pub elapsed: Option<f64>,
}

/// Benchmark on which solvers disagree about satisfiability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictConflict {
    pub benchmark: String,
    pub sat: Vec<String>,
    pub unsat: Vec<String>,
}
