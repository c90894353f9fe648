//! Execution results and exit classification

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a job's process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitClass {
    /// Exited with status zero
    Ok,
    /// Killed by the harness after exceeding the wall-clock limit
    Timeout,
    /// Terminated by a signal the harness did not send (OOM, crash, rlimit)
    Killed,
    /// Nonzero exit, or the process could not be started
    Error,
}

impl ExitClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitClass::Ok => "ok",
            ExitClass::Timeout => "timeout",
            ExitClass::Killed => "killed",
            ExitClass::Error => "error",
        }
    }

    pub const ALL: [ExitClass; 4] = [
        ExitClass::Ok,
        ExitClass::Timeout,
        ExitClass::Killed,
        ExitClass::Error,
    ];
}

impl fmt::Display for ExitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExitClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ok" => Ok(ExitClass::Ok),
            "timeout" => Ok(ExitClass::Timeout),
            "killed" => Ok(ExitClass::Killed),
            "error" => Ok(ExitClass::Error),
            _ => Err(()),
        }
    }
}

/// Resource usage observed for one child process
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Wall-clock seconds
    pub real: f64,
    /// User CPU seconds
    pub user: f64,
    /// System CPU seconds
    pub sys: f64,
    /// Peak resident set size in KB
    pub max_rss_kb: u64,
}

/// Outcome of executing exactly one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub telemetry: Telemetry,
    pub exit: ExitClass,
    /// Exit status for processes that exited normally
    pub exit_code: Option<i32>,
    /// Terminating signal for processes that did not
    pub signal: Option<i32>,
    /// Captured solver output (stdout and stderr), possibly truncated
    pub output: String,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// A job that never produced a process (spawn or staging failure)
    pub fn failed_to_start(message: impl Into<String>) -> Self {
        Self {
            telemetry: Telemetry::default(),
            exit: ExitClass::Error,
            exit_code: None,
            signal: None,
            output: message.into(),
            finished_at: Utc::now(),
        }
    }
}
