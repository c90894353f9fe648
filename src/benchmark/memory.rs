//! System free-memory probe used by the admission gate

use std::io;

use procfs::Current;

/// Source of the system's currently available memory
pub trait MemoryProbe: Send + Sync {
    /// Available memory in KB
    fn available_kb(&self) -> io::Result<u64>;
}

/// Reads `MemAvailable` from `/proc/meminfo`, falling back to `MemFree` on
/// kernels that do not report it
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcMeminfo;

impl ProcMeminfo {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryProbe for ProcMeminfo {
    fn available_kb(&self) -> io::Result<u64> {
        let meminfo = procfs::Meminfo::current().map_err(io::Error::other)?;
        // procfs reports bytes
        Ok(meminfo.mem_available.unwrap_or(meminfo.mem_free) / 1024)
    }
}
