//! Per-job artifact storage
//!
//! Every job owns exactly two files addressed by its key:
//!
//! ```text
//! <results>/artifacts/<solver>/<set>/<benchmark>.log
//! <results>/artifacts/<solver>/<set>/<benchmark>.time
//! ```
//!
//! Both are replaced atomically, so a rerun overwrites the previous attempt
//! and a crash mid-write never leaves a half-written file behind.

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::constants::{time_keys, LOG_EXTENSION, STAGED_INPUT_EXTENSION, TIME_EXTENSION};
use crate::models::{ExecutionResult, ExitClass, JobKey};
use crate::utils::{fs::write_atomic, time::parse_datetime};

/// Key-addressed artifact directory tree
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory shared by all jobs of one solver on one benchmark set
    pub fn job_dir(&self, key: &JobKey) -> PathBuf {
        self.root.join(&key.solver).join(&key.set)
    }

    pub fn log_path(&self, key: &JobKey) -> PathBuf {
        self.file(key, LOG_EXTENSION)
    }

    pub fn time_path(&self, key: &JobKey) -> PathBuf {
        self.file(key, TIME_EXTENSION)
    }

    /// Where JSON-wrapped input for this job is staged
    pub fn staged_input_path(&self, key: &JobKey) -> PathBuf {
        self.file(key, STAGED_INPUT_EXTENSION)
    }

    fn file(&self, key: &JobKey, extension: &str) -> PathBuf {
        self.job_dir(key)
            .join(format!("{}.{}", key.benchmark, extension))
    }

    /// Create the job's directory
    pub fn prepare(&self, key: &JobKey) -> io::Result<PathBuf> {
        let dir = self.job_dir(key);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn write_log(&self, key: &JobKey, text: &str) -> io::Result<()> {
        write_atomic(&self.log_path(key), text.as_bytes())
    }

    pub fn write_time(&self, key: &JobKey, result: &ExecutionResult) -> io::Result<()> {
        write_atomic(&self.time_path(key), TimeRecord::render(result).as_bytes())
    }

    /// Parsed time artifact, `None` when the file does not exist
    pub fn read_time(&self, key: &JobKey) -> io::Result<Option<TimeRecord>> {
        match std::fs::read_to_string(self.time_path(key)) {
            Ok(text) => Ok(Some(TimeRecord::parse(&text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Contents of a time artifact.
///
/// Each field is parsed independently: a malformed or absent line only
/// clears its own field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeRecord {
    pub real: Option<f64>,
    pub user: Option<f64>,
    pub sys: Option<f64>,
    pub max_rss_kb: Option<u64>,
    pub status: Option<ExitClass>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TimeRecord {
    /// Serialize an execution result as `key=value` lines
    pub fn render(result: &ExecutionResult) -> String {
        let t = &result.telemetry;
        let mut out = format!(
            "{}={:.6}\n{}={:.6}\n{}={:.6}\n{}={}\n{}={}\n",
            time_keys::REAL,
            t.real,
            time_keys::USER,
            t.user,
            time_keys::SYS,
            t.sys,
            time_keys::MAX_RSS_KB,
            t.max_rss_kb,
            time_keys::STATUS,
            result.exit,
        );
        if let Some(code) = result.exit_code {
            out.push_str(&format!("{}={}\n", time_keys::EXIT_CODE, code));
        }
        if let Some(signal) = result.signal {
            out.push_str(&format!("{}={}\n", time_keys::SIGNAL, signal));
        }
        out.push_str(&format!(
            "{}={}\n",
            time_keys::FINISHED_AT,
            result.finished_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        out
    }

    /// Parse `key=value` lines; other delimiters and unknown keys are ignored
    pub fn parse(text: &str) -> Self {
        let mut record = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                time_keys::REAL => record.real = seconds(value),
                time_keys::USER => record.user = seconds(value),
                time_keys::SYS => record.sys = seconds(value),
                time_keys::MAX_RSS_KB => record.max_rss_kb = value.parse().ok(),
                time_keys::STATUS => record.status = value.parse().ok(),
                time_keys::EXIT_CODE => record.exit_code = value.parse().ok(),
                time_keys::SIGNAL => record.signal = value.parse().ok(),
                time_keys::FINISHED_AT => record.finished_at = parse_datetime(value),
                _ => {}
            }
        }
        record
    }
}

fn seconds(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Telemetry;

    fn result(exit: ExitClass) -> ExecutionResult {
        ExecutionResult {
            telemetry: Telemetry {
                real: 1.5,
                user: 1.25,
                sys: 0.125,
                max_rss_kb: 20480,
            },
            exit,
            exit_code: None,
            signal: Some(9),
            output: String::new(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_paths_are_keyed() {
        let store = ArtifactStore::new("/r/artifacts");
        let key = JobKey::new("cvc5", "woorpje", "instance00022");
        assert_eq!(
            store.log_path(&key),
            PathBuf::from("/r/artifacts/cvc5/woorpje/instance00022.log")
        );
        assert_eq!(
            store.time_path(&key),
            PathBuf::from("/r/artifacts/cvc5/woorpje/instance00022.time")
        );
        assert_eq!(
            store.staged_input_path(&key),
            PathBuf::from("/r/artifacts/cvc5/woorpje/instance00022.input.json")
        );
    }

    #[test]
    fn test_rendered_record_parses_back() {
        let rendered = TimeRecord::render(&result(ExitClass::Timeout));
        let parsed = TimeRecord::parse(&rendered);
        assert_eq!(parsed.real, Some(1.5));
        assert_eq!(parsed.sys, Some(0.125));
        assert_eq!(parsed.max_rss_kb, Some(20480));
        assert_eq!(parsed.status, Some(ExitClass::Timeout));
        assert_eq!(parsed.signal, Some(9));
        assert_eq!(parsed.exit_code, None);
        assert!(parsed.finished_at.is_some());
    }

    #[test]
    fn test_malformed_fields_are_isolated() {
        let parsed = TimeRecord::parse("real: 3.2\nuser=abc\nsys=0.5\nmax_rss_kb=-1\nflavor=x\n");
        assert_eq!(parsed.real, None);
        assert_eq!(parsed.user, None);
        assert_eq!(parsed.sys, Some(0.5));
        assert_eq!(parsed.max_rss_kb, None);
        assert_eq!(parsed.status, None);
    }

    #[test]
    fn test_read_time_distinguishes_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let key = JobKey::new("z3", "kaluza", "b1");
        assert_eq!(store.read_time(&key).unwrap(), None);

        store.prepare(&key).unwrap();
        store.write_time(&key, &result(ExitClass::Ok)).unwrap();
        let parsed = store.read_time(&key).unwrap().unwrap();
        assert_eq!(parsed.status, Some(ExitClass::Ok));
    }
}
