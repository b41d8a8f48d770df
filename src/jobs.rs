//! Outstanding background processes.
//!
//! The table is only touched from the main loop. Each cycle the interpreter
//! calls [`JobTable::reap`], which polls every tracked pid with `WNOHANG` and
//! untracks the ones that have terminated.

use crate::command::ExitStatus;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;
use std::fmt;
use tracing::{debug, warn};

/// A background job that has terminated and was removed from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    pub pid: Pid,
    pub status: ExitStatus,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background pid {} is done: {}", self.pid, self.status)
    }
}

#[derive(Debug, Default)]
pub struct JobTable {
    pids: Vec<Pid>,
}

enum Poll {
    Running,
    Done(ExitStatus),
    /// `waitpid` refused the pid (typically `ECHILD`); it can never be reaped.
    Gone,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly launched background child.
    pub fn track(&mut self, pid: Pid) {
        debug!(%pid, "tracking background job");
        self.pids.push(pid);
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    /// Poll every tracked job without blocking and drop the finished ones.
    ///
    /// Returns one report per terminated job. An empty table makes no system
    /// calls.
    pub fn reap(&mut self) -> Vec<JobReport> {
        let mut reports = Vec::new();
        self.pids.retain(|&pid| match poll(pid) {
            Poll::Running => true,
            Poll::Done(status) => {
                reports.push(JobReport { pid, status });
                false
            }
            Poll::Gone => false,
        });
        reports
    }

    /// Like [`JobTable::reap`], restricted to a single tracked pid.
    pub fn reap_pid(&mut self, pid: Pid) -> Option<JobReport> {
        let index = self.pids.iter().position(|&p| p == pid)?;
        match poll(pid) {
            Poll::Running => None,
            Poll::Done(status) => {
                self.pids.remove(index);
                Some(JobReport { pid, status })
            }
            Poll::Gone => {
                self.pids.remove(index);
                None
            }
        }
    }

    /// Send SIGTERM to every tracked job. Best effort; nothing is awaited.
    pub fn terminate_all(&self) {
        for &pid in &self.pids {
            match signal::kill(pid, Signal::SIGTERM) {
                Ok(()) => debug!(%pid, "sent SIGTERM to background job"),
                Err(err) => warn!(%pid, %err, "failed to signal background job"),
            }
        }
    }
}

fn poll(pid: Pid) -> Poll {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => {
                return match ExitStatus::from_wait(status) {
                    Some(status) => {
                        debug!(%pid, %status, "background job finished");
                        Poll::Done(status)
                    }
                    None => Poll::Running,
                };
            }
            Err(Errno::EINTR) => continue,
            Err(err) => {
                warn!(%pid, %err, "dropping unwaitable background job");
                return Poll::Gone;
            }
        }
    }
}
