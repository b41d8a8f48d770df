use crate::command::ExitStatus;
use crate::jobs::JobTable;
use crate::signals::ForegroundMode;
use nix::unistd::{Pid, getpid};

/// Everything the interpreter remembers between cycles.
///
/// Only `foreground_only` may change outside the main loop (from the SIGTSTP
/// handler); the rest is mutated by the loop alone.
#[derive(Debug)]
pub struct ShellState {
    /// Outcome of the most recent foreground external command.
    pub last_status: ExitStatus,
    pub foreground_only: ForegroundMode,
    pub jobs: JobTable,
    /// Set by `exit`; the loop stops after the current cycle.
    pub should_exit: bool,
    shell_pid: Pid,
    shell_pid_text: String,
}

impl ShellState {
    pub fn new(foreground_only: ForegroundMode) -> Self {
        let shell_pid = getpid();
        Self {
            last_status: ExitStatus::default(),
            foreground_only,
            jobs: JobTable::new(),
            should_exit: false,
            shell_pid,
            shell_pid_text: shell_pid.to_string(),
        }
    }

    pub fn shell_pid(&self) -> Pid {
        self.shell_pid
    }

    /// The interpreter's pid as substituted for `$$`.
    pub fn shell_pid_text(&self) -> &str {
        &self.shell_pid_text
    }
}
