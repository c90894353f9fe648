//! Harness configuration management
//!
//! Configuration is loaded from environment variables (and an optional
//! `.env` file) at startup, then selectively overridden by CLI flags. All
//! values are validated before any job runs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MANIFEST, DEFAULT_MEMORY_LIMIT_MB, DEFAULT_MIN_FREE_MEMORY_MB, DEFAULT_RESULTS_DIR,
    DEFAULT_TIMEOUT_SECS,
};

/// Main harness configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub execution: ExecutionConfig,
    pub logging: LogConfig,
}

/// Where the registry lives and where results go
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub manifest_path: PathBuf,
    pub results_dir: PathBuf,
}

/// Per-job limits and pool sizing
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Wall-clock limit per job in seconds
    pub timeout_secs: u64,
    /// Virtual-memory ceiling per job in megabytes
    pub memory_limit_mb: u64,
    /// Number of concurrent worker slots
    pub workers: usize,
    /// Free-memory floor for admitting a job (0 disables the gate)
    pub min_free_memory_mb: u64,
    /// Pin each worker's jobs to one core when running concurrently
    pub pin_cores: bool,
}

/// Tracing output configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub rust_log: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// CLI-provided values that take precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub manifest_path: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub memory_limit_mb: Option<u64>,
    pub workers: Option<usize>,
    pub min_free_memory_mb: Option<u64>,
    pub no_pin: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            storage: StorageConfig::from_env()?,
            execution: ExecutionConfig::from_env()?,
            logging: LogConfig::from_env()?,
        })
    }

    /// Apply CLI overrides, then re-validate
    pub fn apply(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(path) = &overrides.manifest_path {
            self.storage.manifest_path = path.clone();
        }
        if let Some(dir) = &overrides.results_dir {
            self.storage.results_dir = dir.clone();
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.execution.timeout_secs = timeout;
        }
        if let Some(limit) = overrides.memory_limit_mb {
            self.execution.memory_limit_mb = limit;
        }
        if let Some(workers) = overrides.workers {
            self.execution.workers = workers;
        }
        if let Some(floor) = overrides.min_free_memory_mb {
            self.execution.min_free_memory_mb = floor;
        }
        if overrides.no_pin {
            self.execution.pin_cores = false;
        }

        self.execution.validate()?;
        Ok(self)
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            manifest_path: PathBuf::from(
                env::var("STRBENCH_MANIFEST").unwrap_or_else(|_| DEFAULT_MANIFEST.to_string()),
            ),
            results_dir: PathBuf::from(
                env::var("STRBENCH_RESULTS_DIR").unwrap_or_else(|_| DEFAULT_RESULTS_DIR.to_string()),
            ),
        })
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.results_dir.join(crate::constants::ARTIFACTS_DIR)
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.results_dir.join(crate::constants::TABLES_DIR)
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.results_dir.join(crate::constants::RUNS_DIR)
    }
}

impl ExecutionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            timeout_secs: parse_var("STRBENCH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            memory_limit_mb: parse_var("STRBENCH_MEMORY_LIMIT_MB", DEFAULT_MEMORY_LIMIT_MB)?,
            workers: parse_var("STRBENCH_WORKERS", default_workers())?,
            min_free_memory_mb: parse_var(
                "STRBENCH_MIN_FREE_MEMORY_MB",
                DEFAULT_MIN_FREE_MEMORY_MB,
            )?,
            pin_cores: parse_var("STRBENCH_PIN_CORES", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("STRBENCH_TIMEOUT_SECS".to_string()));
        }
        if self.memory_limit_mb == 0 {
            return Err(ConfigError::InvalidValue("STRBENCH_MEMORY_LIMIT_MB".to_string()));
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue("STRBENCH_WORKERS".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb * 1024 * 1024
    }

    pub fn min_free_memory_kb(&self) -> u64 {
        self.min_free_memory_mb * 1024
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
            workers: default_workers(),
            min_free_memory_mb: DEFAULT_MIN_FREE_MEMORY_MB,
            pin_cores: true,
        }
    }
}

impl LogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let format = match env::var("STRBENCH_LOG_FORMAT") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STRBENCH_LOG_FORMAT".to_string()))?,
            Err(_) => LogFormat::Pretty,
        };

        Ok(Self {
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "strbench=info".to_string()),
            format,
        })
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            storage: StorageConfig {
                manifest_path: PathBuf::from(DEFAULT_MANIFEST),
                results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            },
            execution: ExecutionConfig::default(),
            logging: LogConfig {
                rust_log: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    #[test]
    fn test_default_values() {
        let execution = ExecutionConfig::default();
        assert_eq!(execution.timeout_secs, 120);
        assert_eq!(execution.memory_limit_bytes(), 1536 * 1024 * 1024);
        assert!(execution.workers >= 1);
        assert_eq!(execution.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = Overrides {
            timeout_secs: Some(5),
            workers: Some(3),
            results_dir: Some(PathBuf::from("/tmp/out")),
            no_pin: true,
            ..Default::default()
        };
        let config = base().apply(&overrides).unwrap();
        assert_eq!(config.execution.timeout_secs, 5);
        assert_eq!(config.execution.workers, 3);
        assert!(!config.execution.pin_cores);
        assert_eq!(config.storage.tables_dir(), PathBuf::from("/tmp/out/tables"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let overrides = Overrides {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            base().apply(&overrides),
            Err(ConfigError::InvalidValue(var)) if var == "STRBENCH_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
