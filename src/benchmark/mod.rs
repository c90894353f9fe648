//! Benchmark execution engine
//!
//! The pipeline runs leaf to root:
//!
//! 1. **Resolver** (`resolver.rs`): expands solver × benchmark-set selections
//!    into concrete jobs, skipping inputs a solver does not have.
//! 2. **Executor** (`executor.rs`, `limits.rs`, `artifacts.rs`): runs one job
//!    under wall-clock, address-space and affinity limits and always leaves a
//!    log/time artifact pair behind.
//! 3. **Scheduler** (`scheduler.rs`, `memory.rs`): bounded worker pool gated
//!    on free system memory.
//! 4. **Collector** (`collector.rs`, `dialects.rs`, `sexpr.rs`): reads the
//!    artifacts back into solver-agnostic records.
//! 5. **Aggregator** (`aggregator.rs`, `report.rs`): joins records by key into
//!    comparison tables and writes them atomically.
//!
//! [`BatchRunner`] wires the stages together.

pub mod aggregator;
pub mod artifacts;
pub mod collector;
pub mod dialects;
pub mod executor;
pub mod limits;
pub mod memory;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod scheduler;
pub mod sexpr;

pub use aggregator::SetReport;
pub use artifacts::{ArtifactStore, TimeRecord};
pub use collector::Collector;
pub use dialects::{OutputDialect, ParsedOutput};
pub use executor::SolverExecutor;
pub use memory::{MemoryProbe, ProcMeminfo};
pub use report::ReportWriter;
pub use resolver::{BenchmarkList, Resolution};
pub use runner::{BatchOutcome, BatchRunner};
pub use scheduler::{JobRunner, Scheduler, SchedulerPolicy};
