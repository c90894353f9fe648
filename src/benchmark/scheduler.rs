//! Bounded worker pool with a free-memory admission gate
//!
//! Each worker owns a slot and pulls jobs from a shared queue until it is
//! drained. Job outcomes never stop a worker: failures arrive as
//! [`ExecutionResult`]s and even a panicking runner only costs its own job.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};

use super::limits::allowed_cores;
use super::memory::MemoryProbe;
use crate::config::ExecutionConfig;
use crate::constants::MEMORY_POLL_INTERVAL_MS;
use crate::models::{ExecutionResult, Job};

/// Executes one job; the scheduler's only view of the executor
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run `job`, optionally pinned to `core`. Must not fail: every outcome
    /// is an [`ExecutionResult`].
    async fn run(&self, job: &Job, core: Option<usize>) -> ExecutionResult;
}

/// Pool sizing and admission policy
#[derive(Debug, Clone)]
pub struct SchedulerPolicy {
    pub workers: usize,
    /// Admission floor in KB; 0 disables the gate
    pub min_free_memory_kb: u64,
    pub pin_cores: bool,
    pub poll_interval: Duration,
}

impl From<&ExecutionConfig> for SchedulerPolicy {
    fn from(execution: &ExecutionConfig) -> Self {
        Self {
            workers: execution.workers,
            min_free_memory_kb: execution.min_free_memory_kb(),
            pin_cores: execution.pin_cores,
            poll_interval: Duration::from_millis(MEMORY_POLL_INTERVAL_MS),
        }
    }
}

/// Fan-out/fan-in job scheduler
pub struct Scheduler<R, P> {
    runner: Arc<R>,
    probe: Arc<P>,
    policy: SchedulerPolicy,
}

impl<R, P> Scheduler<R, P>
where
    R: JobRunner + 'static,
    P: MemoryProbe + 'static,
{
    pub fn new(runner: Arc<R>, probe: Arc<P>, policy: SchedulerPolicy) -> Self {
        Self {
            runner,
            probe,
            policy,
        }
    }

    /// Run every job exactly once and return each outcome.
    ///
    /// Completion order is arbitrary; callers key results by job.
    pub async fn run(&self, jobs: Vec<Job>) -> Vec<(Job, ExecutionResult)> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let workers = self.policy.workers.clamp(1, jobs.len());
        let cores = if self.policy.pin_cores && workers > 1 {
            allowed_cores()
        } else {
            Vec::new()
        };
        tracing::info!(
            jobs = jobs.len(),
            workers,
            pinned = !cores.is_empty(),
            "Dispatching jobs"
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let active = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handles: Vec<_> = (0..workers)
            .map(|slot| {
                let worker = Worker {
                    slot,
                    core: (!cores.is_empty()).then(|| cores[slot % cores.len()]),
                    runner: Arc::clone(&self.runner),
                    probe: Arc::clone(&self.probe),
                    policy: self.policy.clone(),
                    queue: Arc::clone(&queue),
                    active: Arc::clone(&active),
                    tx: tx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(tx);

        for (slot, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                tracing::error!(slot, error = %e, "Worker terminated abnormally");
            }
        }

        let mut completed = Vec::new();
        while let Some(done) = rx.recv().await {
            completed.push(done);
        }
        completed
    }
}

struct Worker<R, P> {
    slot: usize,
    core: Option<usize>,
    runner: Arc<R>,
    probe: Arc<P>,
    policy: SchedulerPolicy,
    queue: Arc<Mutex<VecDeque<Job>>>,
    active: Arc<AtomicUsize>,
    tx: mpsc::UnboundedSender<(Job, ExecutionResult)>,
}

impl<R: JobRunner, P: MemoryProbe> Worker<R, P> {
    async fn run(self) {
        loop {
            let Some(job) = self.queue.lock().await.pop_front() else {
                break;
            };
            self.admit().await;
            let outcome = AssertUnwindSafe(self.runner.run(&job, self.core))
                .catch_unwind()
                .await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let result = outcome.unwrap_or_else(|_| {
                tracing::error!(slot = self.slot, job = %job.key, "Job runner panicked");
                ExecutionResult::failed_to_start("job runner panicked")
            });
            if self.tx.send((job, result)).is_err() {
                break;
            }
        }
        tracing::debug!(slot = self.slot, "Worker drained");
    }

    /// Claim a running slot, waiting while free memory is under the floor
    /// and siblings are running.
    ///
    /// Under the floor a job is only admitted into an empty pool, claimed
    /// atomically, so an unattainable floor degrades to sequential execution
    /// instead of a deadlock. An unreadable probe admits.
    async fn admit(&self) {
        let floor = self.policy.min_free_memory_kb;
        loop {
            let available = if floor == 0 {
                None
            } else {
                match self.probe.available_kb() {
                    Ok(kb) => Some(kb),
                    Err(e) => {
                        tracing::debug!(error = %e, "Memory probe unavailable, admitting");
                        None
                    }
                }
            };
            match available {
                Some(available) if available < floor => {
                    if self
                        .active
                        .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        return;
                    }
                    tracing::debug!(
                        slot = self.slot,
                        available_kb = available,
                        floor_kb = floor,
                        running = self.active.load(Ordering::SeqCst),
                        "Waiting for memory headroom"
                    );
                    tokio::time::sleep(self.policy.poll_interval).await;
                }
                _ => {
                    self.active.fetch_add(1, Ordering::SeqCst);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExitClass, JobKey};
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicU64;

    fn jobs(n: usize) -> Vec<Job> {
        (0..n)
            .map(|i| {
                Job::new(
                    JobKey::new("fake", "set", format!("b{i:02}")),
                    PathBuf::from(format!("/b/b{i:02}.smt2")),
                )
            })
            .collect()
    }

    fn policy(workers: usize, floor_kb: u64) -> SchedulerPolicy {
        SchedulerPolicy {
            workers,
            min_free_memory_kb: floor_kb,
            pin_cores: false,
            poll_interval: Duration::from_millis(5),
        }
    }

    /// Fails every third job, panics on `b05`, tracks peak concurrency
    #[derive(Default)]
    struct FakeRunner {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl JobRunner for FakeRunner {
        async fn run(&self, job: &Job, _core: Option<usize>) -> ExecutionResult {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if job.benchmark() == "b05" {
                panic!("runner bug");
            }
            let index: usize = job.benchmark()[1..].parse().unwrap();
            let mut result = ExecutionResult::failed_to_start("");
            if index % 3 != 0 {
                result.exit = ExitClass::Ok;
            }
            result
        }
    }

    struct FixedProbe(AtomicU64);

    impl MemoryProbe for FixedProbe {
        fn available_kb(&self) -> io::Result<u64> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    struct BrokenProbe;

    impl MemoryProbe for BrokenProbe {
        fn available_kb(&self) -> io::Result<u64> {
            Err(io::Error::other("no /proc"))
        }
    }

    #[tokio::test]
    async fn test_every_job_completes_despite_failures() {
        let runner = Arc::new(FakeRunner::default());
        let probe = Arc::new(FixedProbe(AtomicU64::new(u64::MAX)));
        let scheduler = Scheduler::new(Arc::clone(&runner), probe, policy(4, 0));

        let mut done = scheduler.run(jobs(12)).await;
        assert_eq!(done.len(), 12);
        done.sort_by(|a, b| a.0.key.cmp(&b.0.key));
        assert_eq!(done[0].1.exit, ExitClass::Error);
        assert_eq!(done[1].1.exit, ExitClass::Ok);
        assert_eq!(done[5].1.exit, ExitClass::Error);
        assert!(runner.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_low_memory_serializes_but_never_deadlocks() {
        let runner = Arc::new(FakeRunner::default());
        let probe = Arc::new(FixedProbe(AtomicU64::new(1)));
        let scheduler = Scheduler::new(Arc::clone(&runner), probe, policy(4, 1024 * 1024));

        let done = scheduler.run(jobs(6)).await;
        assert_eq!(done.len(), 6);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreadable_probe_admits() {
        let runner = Arc::new(FakeRunner::default());
        let scheduler = Scheduler::new(runner, Arc::new(BrokenProbe), policy(2, 1024));
        assert_eq!(scheduler.run(jobs(4)).await.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_job_list() {
        let runner = Arc::new(FakeRunner::default());
        let scheduler = Scheduler::new(runner, Arc::new(BrokenProbe), policy(2, 0));
        assert!(scheduler.run(Vec::new()).await.is_empty());
    }
}
