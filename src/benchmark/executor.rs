//! Resource-bounded execution of a single job
//!
//! Every job ends with exactly one log artifact and one time artifact, no
//! matter how the solver terminated. Failures are never returned as errors:
//! they are classified into [`ExitClass`] and recorded like any other run.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use nix::sys::wait::WaitStatus;
use tempfile::NamedTempFile;
use tracing::Instrument;

use super::artifacts::ArtifactStore;
use super::limits::{self, ProcessLimits};
use super::scheduler::JobRunner;
use crate::config::ExecutionConfig;
use crate::constants::{placeholders, MAX_PARSED_LOG_BYTES};
use crate::manifest::{InputMode, Manifest, SolverSpec};
use crate::models::{ExecutionResult, ExitClass, Job, Telemetry};
use crate::utils::fs::{publish, read_prefix, write_atomic};

/// Runs registered solvers under wall-clock, memory and affinity limits
pub struct SolverExecutor {
    manifest: Arc<Manifest>,
    store: ArtifactStore,
    timeout: Duration,
    memory_limit_bytes: u64,
}

impl SolverExecutor {
    /// Create a new executor
    pub fn new(manifest: Arc<Manifest>, store: ArtifactStore, execution: &ExecutionConfig) -> Self {
        Self {
            manifest,
            store,
            timeout: execution.timeout(),
            memory_limit_bytes: execution.memory_limit_bytes(),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run one job to completion.
    ///
    /// `Err` means no solver process was ever started; the log artifact has
    /// not been written in that case.
    async fn execute(&self, job: &Job, core: Option<usize>) -> Result<ExecutionResult> {
        let solver = self
            .manifest
            .solver(job.solver())
            .ok_or_else(|| anyhow!("solver '{}' is not registered", job.solver()))?;

        let dir = self
            .store
            .prepare(&job.key)
            .with_context(|| format!("creating artifact directory for {}", job.key))?;
        let input = self.stage_input(solver, job)?;

        // stdout and stderr share one file description, so their writes
        // interleave in order instead of overwriting each other
        let log = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempfile_in(&dir)
            .context("creating log file")?;

        let mut command = Command::new(&solver.program);
        command
            .args(render_args(
                &solver.args,
                &input,
                self.timeout.as_secs(),
                job.benchmark(),
            ))
            .envs(&solver.env)
            .stdout(Stdio::from(log.as_file().try_clone()?))
            .stderr(Stdio::from(log.as_file().try_clone()?));
        match solver.input {
            InputMode::Stdin => {
                let stdin = File::open(&input)
                    .with_context(|| format!("opening {}", input.display()))?;
                command.stdin(Stdio::from(stdin));
            }
            InputMode::Path | InputMode::Json => {
                command.stdin(Stdio::null());
            }
        }
        ProcessLimits {
            address_space_bytes: self.memory_limit_bytes,
            core,
        }
        .apply(&mut command);

        let started = Instant::now();
        let child = command
            .spawn()
            .with_context(|| format!("spawning '{}'", solver.program))?;
        let pid = i32::try_from(child.id()).context("child pid out of range")?;
        // Reaped through wait4 below; the std handle is never waited on
        drop(child);

        let mut reaper = tokio::task::spawn_blocking(move || limits::reap(pid));
        let (joined, timed_out, wall) = match tokio::time::timeout(self.timeout, &mut reaper).await
        {
            Ok(joined) => (joined, false, started.elapsed()),
            Err(_) => {
                let wall = started.elapsed();
                tracing::debug!(pid, "Wall-clock limit reached, killing process group");
                if let Err(e) = limits::kill_tree(pid) {
                    tracing::warn!(pid, error = %e, "Failed to kill timed-out process group");
                }
                (reaper.await, true, wall)
            }
        };
        // Descendants that outlived the solver would keep writing to the log
        if let Err(e) = limits::kill_tree(pid) {
            tracing::debug!(pid, error = %e, "Process group sweep failed");
        }
        let reaped = joined
            .map_err(|e| anyhow!("reaper task failed: {e}"))?
            .context("waiting for solver")?;

        let (exit, exit_code, signal) = classify(reaped.status, timed_out);
        let output = read_prefix(log.path(), MAX_PARSED_LOG_BYTES).unwrap_or_default();
        self.persist_log(job, log);

        Ok(ExecutionResult {
            telemetry: Telemetry {
                real: wall.as_secs_f64(),
                user: reaped.user,
                sys: reaped.sys,
                max_rss_kb: reaped.max_rss_kb,
            },
            exit,
            exit_code,
            signal,
            output,
            finished_at: Utc::now(),
        })
    }

    /// Path handed to the solver; JSON-mode inputs are wrapped first
    fn stage_input(&self, solver: &SolverSpec, job: &Job) -> Result<PathBuf> {
        match solver.input {
            InputMode::Path | InputMode::Stdin => Ok(job.input.clone()),
            InputMode::Json => {
                let contents = std::fs::read_to_string(&job.input)
                    .with_context(|| format!("reading {}", job.input.display()))?;
                let document = serde_json::json!({
                    "benchmark": job.benchmark(),
                    "input": contents,
                });
                let staged = self.store.staged_input_path(&job.key);
                write_atomic(&staged, serde_json::to_string(&document)?.as_bytes())
                    .with_context(|| format!("staging {}", staged.display()))?;
                Ok(staged)
            }
        }
    }

    fn persist_log(&self, job: &Job, log: NamedTempFile) {
        let path = self.store.log_path(&job.key);
        if let Err(e) = publish(log, &path) {
            tracing::error!(path = %path.display(), error = %e, "Failed to write log artifact");
        }
    }
}

#[async_trait]
impl JobRunner for SolverExecutor {
    async fn run(&self, job: &Job, core: Option<usize>) -> ExecutionResult {
        let span = tracing::info_span!(
            "job",
            solver = job.solver(),
            set = job.set(),
            benchmark = job.benchmark()
        );

        async {
            let result = match self.execute(job, core).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "Solver could not be started");
                    let result = ExecutionResult::failed_to_start(format!("{e:#}\n"));
                    if let Err(e) = self.store.write_log(&job.key, &result.output) {
                        tracing::error!(error = %e, "Failed to write log artifact");
                    }
                    result
                }
            };

            if let Err(e) = self.store.write_time(&job.key, &result) {
                tracing::error!(error = %e, "Failed to write time artifact");
            }

            tracing::info!(
                status = %result.exit,
                wall_secs = result.telemetry.real,
                max_rss_kb = result.telemetry.max_rss_kb,
                "Job finished"
            );
            result
        }
        .instrument(span)
        .await
    }
}

/// Substitute `{input}`, `{timeout}` and `{benchmark}` in argument templates
pub fn render_args(args: &[String], input: &Path, timeout_secs: u64, benchmark: &str) -> Vec<String> {
    let input = input.to_string_lossy();
    let timeout = timeout_secs.to_string();
    args.iter()
        .map(|arg| {
            arg.replace(placeholders::INPUT, &input)
                .replace(placeholders::TIMEOUT, &timeout)
                .replace(placeholders::BENCHMARK, benchmark)
        })
        .collect()
}

/// Map a wait status onto the exit classes, with exit code or signal
fn classify(status: WaitStatus, timed_out: bool) -> (ExitClass, Option<i32>, Option<i32>) {
    let (class, code, signal) = match status {
        WaitStatus::Exited(_, 0) => (ExitClass::Ok, Some(0), None),
        WaitStatus::Exited(_, code) => (ExitClass::Error, Some(code), None),
        WaitStatus::Signaled(_, signal, _) => (ExitClass::Killed, None, Some(signal as i32)),
        _ => (ExitClass::Error, None, None),
    };
    if timed_out {
        (ExitClass::Timeout, code, signal)
    } else {
        (class, code, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{BenchmarkLayout, BenchmarkSetSpec};
    use crate::models::JobKey;
    use crate::benchmark::dialects::OutputDialect;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sh_solver(id: &str, script: &str, input: InputMode) -> SolverSpec {
        SolverSpec {
            id: id.to_string(),
            program: "/bin/sh".to_string(),
            args: vec![
                "-c".to_string(),
                script.to_string(),
                "sh".to_string(),
                "{input}".to_string(),
            ],
            input,
            dialect: OutputDialect::Smtlib,
            layout: BenchmarkLayout::default(),
            env: BTreeMap::new(),
        }
    }

    struct Fixture {
        dir: TempDir,
        executor: SolverExecutor,
    }

    fn fixture(solvers: Vec<SolverSpec>, timeout_secs: u64) -> Fixture {
        fixture_with_memory(solvers, timeout_secs, 1024)
    }

    fn fixture_with_memory(solvers: Vec<SolverSpec>, timeout_secs: u64, memory_limit_mb: u64) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b1.smt2"), "(check-sat)\n").unwrap();
        let manifest = Manifest {
            solvers,
            benchmark_sets: vec![BenchmarkSetSpec {
                id: "set".to_string(),
                root: dir.path().to_path_buf(),
                list: dir.path().join("files.txt"),
            }],
        };
        let execution = ExecutionConfig {
            timeout_secs,
            memory_limit_mb,
            workers: 1,
            min_free_memory_mb: 0,
            pin_cores: false,
        };
        let store = ArtifactStore::new(dir.path().join("artifacts"));
        let executor = SolverExecutor::new(Arc::new(manifest), store, &execution);
        Fixture { dir, executor }
    }

    impl Fixture {
        fn job(&self, solver: &str) -> Job {
            Job::new(
                JobKey::new(solver, "set", "b1"),
                self.dir.path().join("b1.smt2"),
            )
        }

        fn assert_artifacts(&self, job: &Job) {
            assert!(self.executor.store().log_path(&job.key).is_file());
            assert!(self.executor.store().time_path(&job.key).is_file());
        }
    }

    #[test]
    fn test_render_args() {
        let args = vec![
            "--tlimit={timeout}000".to_string(),
            "{input}".to_string(),
            "--name={benchmark}".to_string(),
        ];
        assert_eq!(
            render_args(&args, Path::new("/b/x.smt2"), 120, "x"),
            vec!["--tlimit=120000", "/b/x.smt2", "--name=x"]
        );
    }

    #[test]
    fn test_classify() {
        let pid = Pid::from_raw(1);
        assert_eq!(classify(WaitStatus::Exited(pid, 0), false), (ExitClass::Ok, Some(0), None));
        assert_eq!(classify(WaitStatus::Exited(pid, 1), false).0, ExitClass::Error);
        assert_eq!(
            classify(WaitStatus::Signaled(pid, Signal::SIGSEGV, false), false),
            (ExitClass::Killed, None, Some(11))
        );
        assert_eq!(
            classify(WaitStatus::Signaled(pid, Signal::SIGKILL, false), true).0,
            ExitClass::Timeout
        );
    }

    #[tokio::test]
    async fn test_clean_exit_captures_output() {
        let f = fixture(
            vec![sh_solver("ok", "echo sat; echo '(define-fun X () String \"a\")' >&2", InputMode::Path)],
            10,
        );
        let job = f.job("ok");
        let result = f.executor.run(&job, None).await;

        assert_eq!(result.exit, ExitClass::Ok);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.output.starts_with("sat\n"));
        assert!(result.output.contains("define-fun"));
        f.assert_artifacts(&job);
        let log = std::fs::read_to_string(f.executor.store().log_path(&job.key)).unwrap();
        assert_eq!(log, result.output);
    }

    #[tokio::test]
    async fn test_timeout_kills_and_still_records() {
        let f = fixture(vec![sh_solver("slow", "sleep 30", InputMode::Path)], 1);
        let job = f.job("slow");
        let started = Instant::now();
        let result = f.executor.run(&job, None).await;

        assert_eq!(result.exit, ExitClass::Timeout);
        assert!(result.telemetry.real >= 1.0);
        assert!(started.elapsed() < Duration::from_secs(10));
        f.assert_artifacts(&job);
        let time = f.executor.store().read_time(&job.key).unwrap().unwrap();
        assert_eq!(time.status, Some(ExitClass::Timeout));
        assert!(time.real.is_some());
    }

    #[tokio::test]
    async fn test_crash_and_nonzero_exit() {
        let f = fixture(
            vec![
                sh_solver("crash", "kill -SEGV $$", InputMode::Path),
                sh_solver("fail", "echo oops >&2; exit 2", InputMode::Path),
            ],
            10,
        );
        let crashed = f.executor.run(&f.job("crash"), None).await;
        assert_eq!(crashed.exit, ExitClass::Killed);
        assert_eq!(crashed.signal, Some(11));

        let failed = f.executor.run(&f.job("fail"), None).await;
        assert_eq!(failed.exit, ExitClass::Error);
        assert_eq!(failed.exit_code, Some(2));
        f.assert_artifacts(&f.job("crash"));
        f.assert_artifacts(&f.job("fail"));
    }

    #[tokio::test]
    async fn test_unstartable_solver_still_writes_both_artifacts() {
        let mut solver = sh_solver("ghost", "", InputMode::Path);
        solver.program = "/definitely/not/a/solver".to_string();
        let f = fixture(vec![solver], 10);
        let job = f.job("ghost");
        let result = f.executor.run(&job, None).await;

        assert_eq!(result.exit, ExitClass::Error);
        assert_eq!(result.telemetry, Telemetry::default());
        f.assert_artifacts(&job);
    }

    #[tokio::test]
    async fn test_input_modes() {
        let f = fixture(
            vec![
                sh_solver("json", "cat \"$1\"", InputMode::Json),
                sh_solver("stdin", "cat", InputMode::Stdin),
            ],
            10,
        );
        let wrapped = f.executor.run(&f.job("json"), None).await;
        let document: serde_json::Value = serde_json::from_str(&wrapped.output).unwrap();
        assert_eq!(document["benchmark"], "b1");
        assert_eq!(document["input"], "(check-sat)\n");

        let piped = f.executor.run(&f.job("stdin"), None).await;
        assert_eq!(piped.output, "(check-sat)\n");
    }

    #[tokio::test]
    async fn test_memory_ceiling_ends_job_with_both_artifacts() {
        let f = fixture_with_memory(
            vec![sh_solver(
                "hog",
                "x=$(head -c 400000000 /dev/zero | tr '\\0' a); echo sat",
                InputMode::Path,
            )],
            30,
            64,
        );
        let job = f.job("hog");
        let result = f.executor.run(&job, None).await;

        assert!(
            matches!(result.exit, ExitClass::Killed | ExitClass::Error),
            "{:?}",
            result.exit
        );
        assert!(!result.output.contains("sat"));
        f.assert_artifacts(&job);
        let time = f.executor.store().read_time(&job.key).unwrap().unwrap();
        assert_eq!(time.status, Some(result.exit));
        assert!(time.real.is_some());
    }

    #[tokio::test]
    async fn test_job_runs_on_the_given_core() {
        let core = *crate::benchmark::limits::allowed_cores().last().unwrap();
        let f = fixture(
            vec![sh_solver("pinned", "grep Cpus_allowed_list /proc/self/status", InputMode::Path)],
            10,
        );
        let result = f.executor.run(&f.job("pinned"), Some(core)).await;

        assert_eq!(result.exit, ExitClass::Ok);
        assert_eq!(
            result.output.split_whitespace().nth(1),
            Some(core.to_string().as_str())
        );
    }
}
