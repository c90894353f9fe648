//! CSV rendering and report output
//!
//! Each file is rendered completely in memory and written with one atomic
//! rename. Rendering depends only on the records, so identical artifacts
//! always produce byte-identical tables.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use super::aggregator::SetReport;
use crate::constants::columns;
use crate::models::{ComparisonTable, CumulativeSeries, NormalizedRecord, RunManifest, SolverSummary, VirtualBest};
use crate::utils::fs::write_atomic;

/// Writes per-set report files into the tables directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, set: &str) -> PathBuf {
        self.dir.join(format!("{set}.csv"))
    }

    pub fn series_path(&self, set: &str) -> PathBuf {
        self.dir.join(format!("{set}-series.csv"))
    }

    pub fn summary_path(&self, set: &str) -> PathBuf {
        self.dir.join(format!("{set}-summary.csv"))
    }

    pub fn virtual_best_path(&self, set: &str) -> PathBuf {
        self.dir.join(format!("{set}-virtual-best.csv"))
    }

    /// Write every file for one set, returning the paths written
    pub fn write(&self, report: &SetReport) -> io::Result<Vec<PathBuf>> {
        let set = report.table.set.as_str();
        let files = [
            (self.table_path(set), render_table(&report.table)),
            (self.series_path(set), render_series(&report.series)),
            (self.summary_path(set), render_summary(&report.summaries)),
            (
                self.virtual_best_path(set),
                render_virtual_best(&report.virtual_best),
            ),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (path, contents) in files {
            write_atomic(&path, contents.as_bytes())?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Persist a run manifest as `<dir>/<run_id>.json`
pub fn write_run_manifest(dir: &Path, manifest: &RunManifest) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}.json", manifest.run_id));
    let mut contents = serde_json::to_vec_pretty(manifest)?;
    contents.push(b'\n');
    write_atomic(&path, &contents)?;
    Ok(path)
}

/// Wide comparison table: `benchmark`, then four columns per solver
pub fn render_table(table: &ComparisonTable) -> String {
    let mut header = vec![Cow::Borrowed(columns::BENCHMARK)];
    for solver in &table.solvers {
        for field in columns::SOLVER_FIELDS {
            header.push(Cow::Owned(format!("{solver}_{field}")));
        }
    }

    let mut out = String::new();
    push_row(&mut out, header.iter().map(|h| escape(h)));
    for row in &table.rows {
        let mut cells = vec![escape(&row.benchmark)];
        for record in &row.cells {
            cells.extend(record_cells(record));
        }
        push_row(&mut out, cells.into_iter());
    }
    out
}

fn record_cells(record: &NormalizedRecord) -> [Cow<'_, str>; 4] {
    [
        Cow::Owned(seconds(record.elapsed)),
        Cow::Owned(record.memory_kb.map(|kb| kb.to_string()).unwrap_or_default()),
        Cow::Borrowed(record.verdict.as_str()),
        match record.model.as_deref() {
            None => Cow::Borrowed(""),
            // Keeps an empty witness distinguishable from no witness
            Some("") => Cow::Borrowed("\"\""),
            Some(model) => escape(model),
        },
    ]
}

/// Cumulative series for plotting: `solver,rank,time,cumulative`
pub fn render_series(series: &[CumulativeSeries]) -> String {
    let mut out = String::from("solver,rank,time,cumulative\n");
    for s in series {
        for point in &s.points {
            push_row(
                &mut out,
                [
                    escape(&s.solver),
                    Cow::Owned(point.rank.to_string()),
                    Cow::Owned(format!("{:.3}", point.elapsed)),
                    Cow::Owned(format!("{:.3}", point.cumulative)),
                ]
                .into_iter(),
            );
        }
    }
    out
}

/// Per-solver verdict counts
pub fn render_summary(summaries: &[SolverSummary]) -> String {
    let mut out =
        String::from("solver,sat,unsat,unknown,error,missing,solved,conflicts,total_time\n");
    for s in summaries {
        push_row(
            &mut out,
            [
                escape(&s.solver),
                Cow::Owned(s.sat.to_string()),
                Cow::Owned(s.unsat.to_string()),
                Cow::Owned(s.unknown.to_string()),
                Cow::Owned(s.error.to_string()),
                Cow::Owned(s.missing.to_string()),
                Cow::Owned(s.solved().to_string()),
                Cow::Owned(s.conflicts.to_string()),
                Cow::Owned(format!("{:.3}", s.total_time)),
            ]
            .into_iter(),
        );
    }
    out
}

/// Fastest definitive answer per benchmark
pub fn render_virtual_best(rows: &[VirtualBest]) -> String {
    let mut out = String::from("benchmark,solver,result,time\n");
    for row in rows {
        push_row(
            &mut out,
            [
                escape(&row.benchmark),
                row.solver.as_deref().map(escape).unwrap_or_default(),
                Cow::Borrowed(row.verdict.as_str()),
                Cow::Owned(seconds(row.elapsed)),
            ]
            .into_iter(),
        );
    }
    out
}

fn seconds(value: Option<f64>) -> String {
    value.map(|t| format!("{t:.3}")).unwrap_or_default()
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = Cow<'a, str>>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&cell);
    }
    out.push('\n');
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::aggregator::build_table;
    use crate::models::{SeriesPoint, Verdict};

    fn record(solver: &str, verdict: Verdict, elapsed: Option<f64>, model: Option<&str>) -> NormalizedRecord {
        NormalizedRecord {
            benchmark: "instance00022".to_string(),
            solver: solver.to_string(),
            elapsed,
            memory_kb: elapsed.map(|_| 2048),
            verdict,
            model: model.map(str::to_string),
            status: None,
        }
    }

    #[test]
    fn test_render_table() {
        let table = build_table(
            "woorpje",
            &["a-str".to_string(), "cvc5".to_string()],
            &["instance00022".to_string(), "instance00023".to_string()],
            vec![
                record("a-str", Verdict::Sat, Some(0.1234), Some("")),
                record("cvc5", Verdict::Sat, Some(2.0), Some("X=a, b; Y=\"q\"")),
            ],
        );
        let csv = render_table(&table);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "benchmark,a-str_time,a-str_memory_kb,a-str_result,a-str_model,\
             cvc5_time,cvc5_memory_kb,cvc5_result,cvc5_model"
        );
        assert_eq!(
            lines[1],
            r#"instance00022,0.123,2048,sat,"",2.000,2048,sat,"X=a, b; Y=""q""""#
        );
        assert_eq!(lines[2], "instance00023,,,missing,,,,missing,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_render_series_and_summary() {
        let series = vec![CumulativeSeries {
            solver: "z3".to_string(),
            points: vec![
                SeriesPoint { rank: 1, elapsed: 0.5, cumulative: 0.5 },
                SeriesPoint { rank: 2, elapsed: 1.25, cumulative: 1.75 },
            ],
        }];
        assert_eq!(
            render_series(&series),
            "solver,rank,time,cumulative\nz3,1,0.500,0.500\nz3,2,1.250,1.750\n"
        );

        let summary = SolverSummary {
            solver: "z3".to_string(),
            sat: 3,
            unsat: 1,
            unknown: 0,
            error: 2,
            missing: 1,
            conflicts: 0,
            total_time: 10.0,
        };
        assert!(render_summary(&[summary]).ends_with("z3,3,1,0,2,1,4,0,10.000\n"));
    }

    #[test]
    fn test_write_is_atomic_and_complete() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("tables"));
        let report = SetReport::build(
            "kaluza",
            &["cvc5".to_string()],
            &["k1".to_string()],
            Vec::new(),
        );

        let written = writer.write(&report).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.is_file()));
        assert_eq!(
            std::fs::read_to_string(writer.table_path("kaluza")).unwrap(),
            "benchmark,cvc5_time,cvc5_memory_kb,cvc5_result,cvc5_model\nk1,,,missing,\n"
        );
    }
}
