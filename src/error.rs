//! Custom error types and handling
//!
//! Only configuration problems and fatal I/O surface as errors. Per-job
//! execution failures and artifact parse failures are absorbed into the
//! data model (`ExitClass`, `Verdict::Missing`) and never reach this type.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Harness-wide error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    // Configuration errors
    #[error("Unknown solver: {0}")]
    UnknownSolver(String),

    #[error("Unknown benchmark set: {0}")]
    UnknownBenchmarkSet(String),

    #[error("Missing filename list for benchmark set '{set}': {}", path.display())]
    MissingFilenameList { set: String, path: PathBuf },

    #[error("Invalid benchmark name '{name}' in filename list for set '{set}'")]
    InvalidBenchmarkName { set: String, name: String },

    #[error("Invalid manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Empty selection: {0}")]
    EmptySelection(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Environment errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HarnessError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSolver(_) => "UNKNOWN_SOLVER",
            Self::UnknownBenchmarkSet(_) => "UNKNOWN_BENCHMARK_SET",
            Self::MissingFilenameList { .. } => "MISSING_FILENAME_LIST",
            Self::InvalidBenchmarkName { .. } => "INVALID_BENCHMARK_NAME",
            Self::InvalidManifest { .. } => "INVALID_MANIFEST",
            Self::EmptySelection(_) => "EMPTY_SELECTION",
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error belongs to the configuration class, which must
    /// abort a batch before any job runs
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownSolver(_)
                | Self::UnknownBenchmarkSet(_)
                | Self::MissingFilenameList { .. }
                | Self::InvalidBenchmarkName { .. }
                | Self::InvalidManifest { .. }
                | Self::EmptySelection(_)
                | Self::Config(_)
        )
    }
}

/// Result type alias using HarnessError
pub type HarnessResult<T> = Result<T, HarnessError>;
