//! Process-level resource limits and reaping
//!
//! Limits are applied in the forked child before `exec`, so they bind the
//! solver and everything it spawns. The child is reaped with `wait4` to get
//! its own `rusage`, which is the only telemetry source that survives a kill.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;

use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::WaitStatus;
use nix::unistd::{setsid, Pid};

/// Limits for one child process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLimits {
    /// `RLIMIT_AS` ceiling in bytes
    pub address_space_bytes: u64,
    /// CPU the child is pinned to
    pub core: Option<usize>,
}

impl ProcessLimits {
    /// Install the limits on a command.
    ///
    /// The child becomes leader of a new session, so its process group id is
    /// its pid and the whole tree can be signalled with [`kill_tree`].
    pub fn apply(self, command: &mut Command) {
        let limits = self;
        // SAFETY: the hook only issues async-signal-safe syscalls
        // (setsid, setrlimit, sched_setaffinity) and does not allocate.
        unsafe {
            command.pre_exec(move || {
                setsid().map_err(io::Error::from)?;
                setrlimit(
                    Resource::RLIMIT_AS,
                    limits.address_space_bytes,
                    limits.address_space_bytes,
                )
                .map_err(io::Error::from)?;
                setrlimit(Resource::RLIMIT_CORE, 0, 0).map_err(io::Error::from)?;
                if let Some(core) = limits.core {
                    let mut set = CpuSet::new();
                    // Pinning is best effort: a core outside the allowed set
                    // must not keep the solver from starting
                    if set.set(core).is_ok() {
                        let _ = sched_setaffinity(Pid::from_raw(0), &set);
                    }
                }
                Ok(())
            });
        }
    }
}

/// CPUs this process may run on, in ascending order
pub fn allowed_cores() -> Vec<usize> {
    match sched_getaffinity(Pid::from_raw(0)) {
        Ok(set) => (0..CpuSet::count())
            .filter(|&cpu| set.is_set(cpu).unwrap_or(false))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// How a reaped child ended, with its resource usage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reaped {
    pub status: WaitStatus,
    /// User CPU seconds
    pub user: f64,
    /// System CPU seconds
    pub sys: f64,
    /// Peak resident set size in KB
    pub max_rss_kb: u64,
}

/// Block until `pid` terminates and collect its `rusage`
pub fn reap(pid: i32) -> io::Result<Reaped> {
    let mut raw_status: libc::c_int = 0;
    // SAFETY: rusage is plain old data; an all-zero value is valid
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    loop {
        // SAFETY: both out-pointers reference live locals
        let rc = unsafe { libc::wait4(pid, &mut raw_status, 0, &mut usage) };
        if rc != -1 {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }

    let status = WaitStatus::from_raw(Pid::from_raw(pid), raw_status).map_err(io::Error::from)?;
    Ok(Reaped {
        status,
        user: timeval_secs(usage.ru_utime),
        sys: timeval_secs(usage.ru_stime),
        max_rss_kb: u64::try_from(usage.ru_maxrss).unwrap_or(0),
    })
}

/// SIGKILL every process in the group led by `pid`.
///
/// A group that already vanished is not an error.
pub fn kill_tree(pid: i32) -> io::Result<()> {
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

fn timeval_secs(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}
