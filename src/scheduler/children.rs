//! Live child process tracking
//!
//! Every job runs as the leader of its own process group. Workers register
//! the group while the job runs so an interrupt can terminate the whole
//! batch, including whatever the pipeline itself spawned.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    pids: HashSet<u32>,
    /// Set once the batch is being torn down; late spawns are killed at once
    closed: bool,
}

/// Shared set of running job processes
#[derive(Debug, Clone, Default)]
pub struct ChildRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a started child; returns false if the registry was already closed
    pub(crate) fn register(&self, pid: u32) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            signal_group(pid);
            return false;
        }
        inner.pids.insert(pid);
        true
    }

    pub(crate) fn unregister(&self, pid: u32) {
        self.lock().pids.remove(&pid);
    }

    /// Process ids of the jobs running right now
    pub fn pids(&self) -> Vec<u32> {
        let mut pids: Vec<_> = self.lock().pids.iter().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pids.is_empty()
    }

    /// Send SIGTERM to every running job's process group and refuse new ones
    ///
    /// Returns the number of groups signalled.
    pub fn terminate_all(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        for &pid in &inner.pids {
            signal_group(pid);
        }
        inner.pids.len()
    }
}

#[cfg(unix)]
fn signal_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGTERM) {
        // ESRCH: the job exited between the lookup and the signal
        debug!(pid, "killpg failed: {}", e);
    }
}

#[cfg(not(unix))]
fn signal_group(pid: u32) {
    debug!(pid, "Process group signals are unavailable on this platform");
}
