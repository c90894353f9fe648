//! Cross-solver aggregation
//!
//! Records are joined by `(solver, benchmark)` key onto the canonical
//! benchmark order. Completion order and per-solver coverage never change
//! the shape of a table: absent pairs become `missing` cells.

use std::collections::HashMap;

use crate::models::{
    ComparisonTable, CumulativeSeries, NormalizedRecord, SeriesPoint, SolverSummary, TableRow,
    Verdict, VerdictConflict, VirtualBest,
};

/// Everything reported for one benchmark set
#[derive(Debug, Clone, PartialEq)]
pub struct SetReport {
    pub table: ComparisonTable,
    pub series: Vec<CumulativeSeries>,
    pub summaries: Vec<SolverSummary>,
    pub virtual_best: Vec<VirtualBest>,
    pub conflicts: Vec<VerdictConflict>,
}

impl SetReport {
    pub fn build(
        set: &str,
        solvers: &[String],
        benchmarks: &[String],
        records: Vec<NormalizedRecord>,
    ) -> Self {
        let table = build_table(set, solvers, benchmarks, records);
        let conflicts = find_conflicts(&table);
        for conflict in &conflicts {
            tracing::warn!(
                set,
                benchmark = %conflict.benchmark,
                sat = %conflict.sat.join(","),
                unsat = %conflict.unsat.join(","),
                "Solvers disagree on satisfiability"
            );
        }

        Self {
            series: cumulative_series(&table),
            summaries: summarize(&table, &conflicts),
            virtual_best: virtual_best(&table),
            table,
            conflicts,
        }
    }
}

/// Join records onto the canonical benchmark order.
///
/// Records for benchmarks or solvers outside the request are ignored; when
/// a key repeats, the last record wins.
pub fn build_table(
    set: &str,
    solvers: &[String],
    benchmarks: &[String],
    records: Vec<NormalizedRecord>,
) -> ComparisonTable {
    let mut by_key: HashMap<(String, String), NormalizedRecord> = records
        .into_iter()
        .map(|r| ((r.solver.clone(), r.benchmark.clone()), r))
        .collect();

    let rows = benchmarks
        .iter()
        .map(|benchmark| TableRow {
            benchmark: benchmark.clone(),
            cells: solvers
                .iter()
                .map(|solver| {
                    by_key
                        .remove(&(solver.clone(), benchmark.clone()))
                        .unwrap_or_else(|| NormalizedRecord::missing(benchmark, solver))
                })
                .collect(),
        })
        .collect();

    ComparisonTable {
        set: set.to_string(),
        solvers: solvers.to_vec(),
        rows,
    }
}

/// Per-solver running sum of elapsed time, ascending by elapsed time.
/// Ties are broken by benchmark name.
pub fn cumulative_series(table: &ComparisonTable) -> Vec<CumulativeSeries> {
    table
        .solvers
        .iter()
        .map(|solver| {
            let mut timed: Vec<(&str, f64)> = table
                .column(solver)
                .into_iter()
                .filter_map(|r| r.elapsed.map(|t| (r.benchmark.as_str(), t)))
                .collect();
            timed.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

            let mut cumulative = 0.0;
            let points = timed
                .into_iter()
                .enumerate()
                .map(|(i, (_, elapsed))| {
                    cumulative += elapsed;
                    SeriesPoint {
                        rank: i + 1,
                        elapsed,
                        cumulative,
                    }
                })
                .collect();

            CumulativeSeries {
                solver: solver.clone(),
                points,
            }
        })
        .collect()
}

/// Verdict counts and total time per solver
pub fn summarize(table: &ComparisonTable, conflicts: &[VerdictConflict]) -> Vec<SolverSummary> {
    table
        .solvers
        .iter()
        .map(|solver| {
            let mut summary = SolverSummary {
                solver: solver.clone(),
                sat: 0,
                unsat: 0,
                unknown: 0,
                error: 0,
                missing: 0,
                conflicts: conflicts
                    .iter()
                    .filter(|c| c.sat.contains(solver) || c.unsat.contains(solver))
                    .count(),
                total_time: 0.0,
            };
            for record in table.column(solver) {
                match record.verdict {
                    Verdict::Sat => summary.sat += 1,
                    Verdict::Unsat => summary.unsat += 1,
                    Verdict::Unknown => summary.unknown += 1,
                    Verdict::Error => summary.error += 1,
                    Verdict::Missing => summary.missing += 1,
                }
                summary.total_time += record.elapsed.unwrap_or(0.0);
            }
            summary
        })
        .collect()
}

/// Fastest timed definitive answer per benchmark.
///
/// Ties go to the solver listed first. Without a definitive answer the row
/// carries the first non-missing verdict and no solver.
pub fn virtual_best(table: &ComparisonTable) -> Vec<VirtualBest> {
    table
        .rows
        .iter()
        .map(|row| {
            let best = row
                .cells
                .iter()
                .filter(|c| c.verdict.is_definitive())
                .filter_map(|c| c.elapsed.map(|t| (c, t)))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((cell, elapsed)) => VirtualBest {
                    benchmark: row.benchmark.clone(),
                    solver: Some(cell.solver.clone()),
                    verdict: cell.verdict,
                    elapsed: Some(elapsed),
                },
                None => VirtualBest {
                    benchmark: row.benchmark.clone(),
                    solver: None,
                    verdict: row
                        .cells
                        .iter()
                        .map(|c| c.verdict)
                        .find(|v| *v != Verdict::Missing)
                        .unwrap_or(Verdict::Missing),
                    elapsed: None,
                },
            }
        })
        .collect()
}

/// Benchmarks answered `sat` by some solvers and `unsat` by others
pub fn find_conflicts(table: &ComparisonTable) -> Vec<VerdictConflict> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let solvers_with = |verdict: Verdict| -> Vec<String> {
                row.cells
                    .iter()
                    .filter(|c| c.verdict == verdict)
                    .map(|c| c.solver.clone())
                    .collect()
            };
            let sat = solvers_with(Verdict::Sat);
            let unsat = solvers_with(Verdict::Unsat);
            (!sat.is_empty() && !unsat.is_empty()).then(|| VerdictConflict {
                benchmark: row.benchmark.clone(),
                sat,
                unsat,
            })
        })
        .collect()
}
