//! strbench - Benchmark harness for string-constraint solvers
//!
//! Runs external solvers over curated benchmark sets under per-job resource
//! limits and merges their heterogeneous output into comparison tables.
//!
//! # Architecture
//!
//! - **Manifest**: registry of solvers and benchmark sets
//! - **Benchmark**: resolver, executor, scheduler, collector and aggregator
//! - **Models**: jobs, execution results, normalized records and tables
//!
//! Configuration errors are the only fatal class. A job that times out,
//! crashes or exits nonzero is recorded and the batch carries on.

pub mod benchmark;
pub mod config;
pub mod constants;
pub mod error;
pub mod manifest;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use benchmark::{BatchOutcome, BatchRunner};
pub use config::Config;
pub use error::{HarnessError, HarnessResult};
pub use manifest::Manifest;
