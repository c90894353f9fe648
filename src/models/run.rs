//! Run manifest: provenance for one batch

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution::ExitClass;
use super::job::SkippedJob;
use crate::config::ExecutionConfig;

/// Limits a batch ran under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLimits {
    pub timeout_secs: u64,
    pub memory_limit_mb: u64,
    pub workers: usize,
    pub min_free_memory_mb: u64,
    pub pin_cores: bool,
}

impl From<&ExecutionConfig> for RunLimits {
    fn from(execution: &ExecutionConfig) -> Self {
        Self {
            timeout_secs: execution.timeout_secs,
            memory_limit_mb: execution.memory_limit_mb,
            workers: execution.workers,
            min_free_memory_mb: execution.min_free_memory_mb,
            pin_cores: execution.pin_cores,
        }
    }
}

/// Written once per `run` under `<results>/runs/<run_id>.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub solvers: Vec<String>,
    pub sets: Vec<String>,
    pub limits: RunLimits,
    /// Jobs per exit class, every class present
    pub exit_counts: BTreeMap<String, usize>,
    pub skipped: Vec<SkippedJob>,
    /// SHA-256 of every input file handed to a solver, keyed by path
    pub inputs: BTreeMap<String, String>,
}

impl RunManifest {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>, limits: RunLimits) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            solvers: Vec::new(),
            sets: Vec::new(),
            limits,
            exit_counts: ExitClass::ALL
                .iter()
                .map(|class| (class.as_str().to_string(), 0))
                .collect(),
            skipped: Vec::new(),
            inputs: BTreeMap::new(),
        }
    }

    pub fn count(&mut self, class: ExitClass) {
        *self.exit_counts.entry(class.as_str().to_string()).or_default() += 1;
    }

    /// Total number of executed jobs
    pub fn executed(&self) -> usize {
        self.exit_counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_counts_cover_every_class() {
        let mut manifest = RunManifest::new(
            Uuid::new_v4(),
            Utc::now(),
            RunLimits::from(&ExecutionConfig::default()),
        );
        manifest.count(ExitClass::Timeout);
        manifest.count(ExitClass::Timeout);
        manifest.count(ExitClass::Ok);

        assert_eq!(manifest.exit_counts.len(), 4);
        assert_eq!(manifest.exit_counts["timeout"], 2);
        assert_eq!(manifest.exit_counts["killed"], 0);
        assert_eq!(manifest.executed(), 3);
    }
}
