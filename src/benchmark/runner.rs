//! Batch runner - Orchestrates the benchmarking process
//!
//! `run` resolves the selection, executes every job, then collects and
//! aggregates; `report` skips execution and rebuilds tables from the
//! artifacts already on disk.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::aggregator::SetReport;
use super::artifacts::ArtifactStore;
use super::collector::Collector;
use super::executor::SolverExecutor;
use super::memory::ProcMeminfo;
use super::report::{write_run_manifest, ReportWriter};
use super::resolver::{self, Resolution};
use super::scheduler::{Scheduler, SchedulerPolicy};
use crate::config::Config;
use crate::error::{HarnessError, HarnessResult};
use crate::manifest::{BenchmarkSetSpec, Manifest, SolverSpec};
use crate::models::{Job, RunLimits, RunManifest};
use crate::utils::{format_duration, hash_file, now_utc};

/// What a batch produced
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Present for batches that executed jobs
    pub run_id: Option<Uuid>,
    pub reports: Vec<SetReport>,
    /// Every table file written
    pub tables: Vec<PathBuf>,
    pub run_manifest: Option<PathBuf>,
    pub executed: usize,
    pub skipped: usize,
}

/// Drives resolve → execute → collect → aggregate → write
pub struct BatchRunner {
    config: Config,
    manifest: Arc<Manifest>,
}

impl BatchRunner {
    /// Create a new batch runner
    pub fn new(config: Config, manifest: Manifest) -> Self {
        Self {
            config,
            manifest: Arc::new(manifest),
        }
    }

    fn store(&self) -> ArtifactStore {
        ArtifactStore::new(self.config.storage.artifacts_dir())
    }

    fn select(
        &self,
        solvers: &str,
        sets: &str,
    ) -> HarnessResult<(Vec<&SolverSpec>, Vec<&BenchmarkSetSpec>)> {
        Ok((
            self.manifest.select_solvers(solvers)?,
            self.manifest.select_sets(sets)?,
        ))
    }

    /// Execute a selection and write its reports.
    ///
    /// Fails only on configuration errors (before any job runs) or when the
    /// tables cannot be written. Individual job failures end up in the data.
    pub async fn run(&self, solvers: &str, sets: &str) -> HarnessResult<BatchOutcome> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", %run_id);

        async {
            let started_at = now_utc();
            let (solver_specs, set_specs) = self.select(solvers, sets)?;
            let resolution = resolver::resolve(&solver_specs, &set_specs)?;

            let mut run = RunManifest::new(
                run_id,
                started_at,
                RunLimits::from(&self.config.execution),
            );
            run.solvers = solver_specs.iter().map(|s| s.id.clone()).collect();
            run.sets = set_specs.iter().map(|s| s.id.clone()).collect();
            run.skipped = resolution.skipped.clone();
            run.inputs = fingerprint(&resolution.jobs).await;

            let store = self.store();
            let executor = SolverExecutor::new(
                Arc::clone(&self.manifest),
                store.clone(),
                &self.config.execution,
            );
            let scheduler = Scheduler::new(
                Arc::new(executor),
                Arc::new(ProcMeminfo::new()),
                SchedulerPolicy::from(&self.config.execution),
            );
            let completed = scheduler.run(resolution.jobs.clone()).await;
            for (_, result) in &completed {
                run.count(result.exit);
            }

            let reports = self.aggregate(&solver_specs, &resolution, &store);
            let tables = self.write_reports(&reports)?;

            run.finished_at = now_utc();
            let run_manifest = match write_run_manifest(&self.config.storage.runs_dir(), &run) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to write run manifest");
                    None
                }
            };

            tracing::info!(
                executed = run.executed(),
                skipped = run.skipped.len(),
                ok = run.exit_counts.get("ok").copied().unwrap_or(0),
                elapsed = %format_duration(run.finished_at - started_at),
                "Batch complete"
            );

            Ok::<_, HarnessError>(BatchOutcome {
                run_id: Some(run_id),
                reports,
                tables,
                run_manifest,
                executed: completed.len(),
                skipped: resolution.skipped.len(),
            })
        }
        .instrument(span)
        .await
    }

    /// Rebuild reports from existing artifacts without executing anything
    pub fn report(&self, solvers: &str, sets: &str) -> HarnessResult<BatchOutcome> {
        let (solver_specs, set_specs) = self.select(solvers, sets)?;
        let resolution = resolver::resolve(&solver_specs, &set_specs)?;

        let reports = self.aggregate(&solver_specs, &resolution, &self.store());
        let tables = self.write_reports(&reports)?;

        Ok(BatchOutcome {
            run_id: None,
            reports,
            tables,
            run_manifest: None,
            executed: 0,
            skipped: resolution.skipped.len(),
        })
    }

    /// Collect every resolved job and build one report per set.
    ///
    /// Skipped jobs are not collected, so stale artifacts from an earlier
    /// layout never leak into the tables.
    fn aggregate(
        &self,
        solvers: &[&SolverSpec],
        resolution: &Resolution,
        store: &ArtifactStore,
    ) -> Vec<SetReport> {
        let collector = Collector::new(store.clone());
        let solver_ids: Vec<String> = solvers.iter().map(|s| s.id.clone()).collect();

        resolution
            .lists
            .iter()
            .map(|list| {
                let records = resolution
                    .jobs_in(&list.set)
                    .filter_map(|job| {
                        let solver = solvers.iter().find(|s| s.id == job.solver())?;
                        Some(collector.collect(solver, &job.key))
                    })
                    .collect();
                SetReport::build(&list.set, &solver_ids, &list.names, records)
            })
            .collect()
    }

    fn write_reports(&self, reports: &[SetReport]) -> HarnessResult<Vec<PathBuf>> {
        let writer = ReportWriter::new(self.config.storage.tables_dir());
        let mut written = Vec::new();
        for report in reports {
            let paths = writer.write(report).inspect_err(|e| {
                tracing::error!(set = %report.table.set, error = %e, "Failed to write tables");
            })?;
            tracing::info!(
                set = %report.table.set,
                rows = report.table.rows.len(),
                path = %writer.table_path(&report.table.set).display(),
                "Tables written"
            );
            written.extend(paths);
        }
        Ok(written)
    }
}

/// SHA-256 of every distinct job input, computed off the async runtime
async fn fingerprint(jobs: &[Job]) -> BTreeMap<String, String> {
    let mut paths: Vec<PathBuf> = jobs.iter().map(|j| j.input.clone()).collect();
    paths.sort();
    paths.dedup();

    let hashed = tokio::task::spawn_blocking(move || {
        paths
            .into_iter()
            .filter_map(|path| match hash_file(&path) {
                Ok(hash) => Some((path.display().to_string(), hash)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not fingerprint input");
                    None
                }
            })
            .collect()
    })
    .await;

    hashed.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Input fingerprinting failed");
        BTreeMap::new()
    })
}
