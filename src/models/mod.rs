//! Domain models
//!
//! Jobs flow from the resolver to the executor, execution results are
//! persisted as artifacts, and normalized records feed the comparison tables.

pub mod execution;
pub mod job;
pub mod record;
pub mod run;
pub mod table;

pub use execution::*;
pub use job::*;
pub use record::*;
pub use run::*;
pub use table::*;
