//! Artifact collection and normalization
//!
//! Turns each job's log/time pair into a [`NormalizedRecord`]. Nothing here
//! fails: unreadable or malformed artifacts degrade the affected field only.

use std::io;

use super::artifacts::{ArtifactStore, TimeRecord};
use crate::constants::MAX_PARSED_LOG_BYTES;
use crate::manifest::SolverSpec;
use crate::models::{ExitClass, JobKey, NormalizedRecord, Verdict};
use crate::utils::fs::read_prefix;

/// Reads artifacts back into canonical records
#[derive(Debug, Clone)]
pub struct Collector {
    store: ArtifactStore,
}

impl Collector {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Normalize the artifacts of one job
    pub fn collect(&self, solver: &SolverSpec, key: &JobKey) -> NormalizedRecord {
        let time = match self.store.read_time(key) {
            Ok(time) => time,
            Err(e) => {
                tracing::warn!(job = %key, error = %e, "Unreadable time artifact");
                Some(TimeRecord::default())
            }
        };
        let log = match read_prefix(&self.store.log_path(key), MAX_PARSED_LOG_BYTES) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(job = %key, error = %e, "Unreadable log artifact");
                Some(String::new())
            }
        };

        if time.is_none() && log.is_none() {
            return NormalizedRecord::missing(&key.benchmark, &key.solver);
        }
        let time = time.unwrap_or_default();
        let parsed = solver.dialect.parse(log.as_deref().unwrap_or_default());

        let verdict = match parsed.verdict {
            Some(verdict) => verdict,
            None => fallback_verdict(time.status),
        };
        if verdict == Verdict::Missing {
            tracing::debug!(job = %key, "No verdict recognized in solver output");
        }

        NormalizedRecord {
            benchmark: key.benchmark.clone(),
            solver: key.solver.clone(),
            elapsed: time.real,
            memory_kb: time.max_rss_kb,
            verdict,
            model: parsed.model,
            status: time.status,
        }
    }
}

/// Verdict for output that carried no recognizable answer
fn fallback_verdict(status: Option<ExitClass>) -> Verdict {
    match status {
        Some(ExitClass::Timeout) => Verdict::Unknown,
        Some(ExitClass::Killed | ExitClass::Error) => Verdict::Error,
        Some(ExitClass::Ok) | None => Verdict::Missing,
    }
}
