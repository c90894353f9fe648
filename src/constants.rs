//! Harness-wide constants
//!
//! Defaults for limits, storage layout and report naming. Constants are
//! grouped by their purpose for better organization.

// =============================================================================
// EXECUTION DEFAULTS
// =============================================================================

/// Default wall-clock limit per job in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default virtual-memory ceiling per job in megabytes (1.5 GiB)
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 1536;

/// Default free-memory floor for admitting a new job, in megabytes
pub const DEFAULT_MIN_FREE_MEMORY_MB: u64 = 1024;

/// How often a blocked worker re-reads free memory
pub const MEMORY_POLL_INTERVAL_MS: u64 = 500;

/// Only this many bytes of a log are read back for verdict parsing
pub const MAX_PARSED_LOG_BYTES: u64 = 1024 * 1024;

// =============================================================================
// SELECTORS
// =============================================================================

/// Sentinel selecting every registered solver or benchmark set
pub const SELECT_ALL: &str = "all";

// =============================================================================
// STORAGE LAYOUT
// =============================================================================

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = "harness.json";

/// Default results root
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Per-job artifact subdirectory under the results root
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Comparison tables subdirectory under the results root
pub const TABLES_DIR: &str = "tables";

/// Run manifests subdirectory under the results root
pub const RUNS_DIR: &str = "runs";

/// Free-text solver output artifact extension
pub const LOG_EXTENSION: &str = "log";

/// key=value telemetry artifact extension
pub const TIME_EXTENSION: &str = "time";

/// Staged JSON-wrapped input extension
pub const STAGED_INPUT_EXTENSION: &str = "input.json";

// =============================================================================
// TIME ARTIFACT KEYS
// =============================================================================

pub mod time_keys {
    pub const REAL: &str = "real";
    pub const USER: &str = "user";
    pub const SYS: &str = "sys";
    pub const MAX_RSS_KB: &str = "max_rss_kb";
    pub const STATUS: &str = "status";
    pub const EXIT_CODE: &str = "exit_code";
    pub const SIGNAL: &str = "signal";
    pub const FINISHED_AT: &str = "finished_at";
}

// =============================================================================
// COMMAND TEMPLATE PLACEHOLDERS
// =============================================================================

pub mod placeholders {
    /// Path of the (possibly staged) benchmark input
    pub const INPUT: &str = "{input}";
    /// Timeout in whole seconds
    pub const TIMEOUT: &str = "{timeout}";
    /// Benchmark base name
    pub const BENCHMARK: &str = "{benchmark}";
}

// =============================================================================
// TABLE COLUMNS
// =============================================================================

pub mod columns {
    pub const BENCHMARK: &str = "benchmark";
    pub const TIME: &str = "time";
    pub const MEMORY_KB: &str = "memory_kb";
    pub const RESULT: &str = "result";
    pub const MODEL: &str = "model";

    /// Per-solver column group, in table order
    pub const SOLVER_FIELDS: [&str; 4] = [TIME, MEMORY_KB, RESULT, MODEL];
}
