//! Fork/exec of external programs.
//!
//! The child resets its signal dispositions, rebinds its standard channels and
//! replaces itself with the target program. The parent either blocks on that
//! one child (foreground) or tracks it in the job table (background).

use crate::command::{Command, ExitStatus};
use crate::redirect;
use crate::signals;
use crate::state::ShellState;
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, execvp, fork};
use std::ffi::{CString, NulError};
use std::io::{self, Write};
use std::process;
use tracing::{debug, info, warn};

/// Exit status of a child whose program could not be executed.
pub const EXEC_FAILURE: i32 = 2;

/// Exit status of the interpreter when it can no longer fork.
pub const FORK_FAILURE: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The interpreter cannot create processes anymore. Fatal.
    #[error("fork(): {0}")]
    Fork(#[source] nix::Error),
    /// Waiting on a foreground child failed; its status is unknown.
    #[error("waitpid({pid}): {source}")]
    Wait { pid: Pid, source: nix::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LaunchError {
    /// Whether the interpreter must stop after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LaunchError::Wait { .. })
    }
}

/// Run `cmd` as a child process.
///
/// Foreground: blocks until the child terminates and records its status in
/// `state.last_status`, printing the signal number if it was killed.
/// Background: prints the child's pid, tracks it and returns immediately.
pub fn launch(cmd: &Command, state: &mut ShellState, out: &mut dyn Write) -> Result<(), LaunchError> {
    let argv = to_c_strings(&cmd.argv);

    out.flush()?;
    io::stdout().flush()?;

    // SAFETY: the interpreter is single-threaded; the child only sets signal
    // dispositions, opens files, dup2()s and execs or exits.
    match unsafe { fork() } {
        Err(err) => Err(LaunchError::Fork(err)),
        Ok(ForkResult::Child) => run_child(cmd, argv),
        Ok(ForkResult::Parent { child }) => {
            if cmd.foreground {
                debug!(pid = %child, program = cmd.program(), "waiting for foreground child");
                let status = wait_foreground(child)?;
                info!(pid = %child, %status, "foreground child finished");
                state.last_status = status;
                if let ExitStatus::Signaled(_) = status {
                    writeln!(out, "{status}")?;
                }
            } else {
                info!(pid = %child, program = cmd.program(), "started background job");
                state.jobs.track(child);
                writeln!(out, "background pid is {child}")?;
                if let Some(report) = state.jobs.reap_pid(child) {
                    writeln!(out, "{report}")?;
                }
            }
            out.flush()?;
            Ok(())
        }
    }
}

fn run_child(cmd: &Command, argv: Result<Vec<CString>, NulError>) -> ! {
    if let Err(err) = signals::restore_child_dispositions(cmd.foreground) {
        warn!(%err, "failed to reset child signal dispositions");
    }

    if let Err(err) = redirect::redirect_stdio(cmd) {
        eprintln!("{err}");
        process::exit(err.exit_code());
    }

    let argv = match argv {
        Ok(argv) if !argv.is_empty() => argv,
        _ => invalid_command(cmd.program(), "argument contains a NUL byte"),
    };
    let Err(err) = execvp(&argv[0], &argv);
    invalid_command(cmd.program(), err.desc())
}

fn invalid_command(program: &str, reason: &str) -> ! {
    eprintln!("{program}: invalid command ({reason})");
    process::exit(EXEC_FAILURE)
}

fn wait_foreground(child: Pid) -> Result<ExitStatus, LaunchError> {
    loop {
        match waitpid(child, None) {
            Ok(status) => {
                if let Some(status) = ExitStatus::from_wait(status) {
                    return Ok(status);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(LaunchError::Wait { pid: child, source }),
        }
    }
}

fn to_c_strings(argv: &[String]) -> Result<Vec<CString>, NulError> {
    argv.iter().map(|arg| CString::new(arg.as_bytes())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::ForegroundMode;
    use std::fs;
    use std::path::PathBuf;
    use std::thread;
    use std::time::{Duration, Instant};

    fn new_state() -> ShellState {
        ShellState::new(ForegroundMode::detached())
    }

    fn command(argv: &[&str]) -> Command {
        Command::new(argv.iter().map(|s| s.to_string()).collect())
    }

    fn run(cmd: &Command, state: &mut ShellState) -> String {
        let mut out = Vec::new();
        launch(cmd, state, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_foreground_exit_value_is_recorded() {
        let mut state = new_state();
        let out = run(&command(&["sh", "-c", "exit 3"]), &mut state);
        assert_eq!(out, "");
        assert_eq!(state.last_status, ExitStatus::Exited(3));
        assert!(state.jobs.is_empty());
    }

    #[test]
    fn test_foreground_signal_is_recorded_and_printed() {
        let mut state = new_state();
        let out = run(&command(&["sh", "-c", "kill -TERM $$"]), &mut state);
        assert_eq!(out, "terminated by signal 15\n");
        assert_eq!(state.last_status, ExitStatus::Signaled(15));
    }

    #[test]
    fn test_unknown_program_exits_with_exec_failure() {
        let mut state = new_state();
        run(&command(&["definitely-not-a-real-program-xyz"]), &mut state);
        assert_eq!(state.last_status, ExitStatus::Exited(EXEC_FAILURE));
    }

    #[test]
    fn test_nul_byte_argument_is_invalid_command() {
        let mut state = new_state();
        run(&command(&["echo", "a\0b"]), &mut state);
        assert_eq!(state.last_status, ExitStatus::Exited(EXEC_FAILURE));
    }

    #[test]
    fn test_output_redirection_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let mut cmd = command(&["echo", "hello"]);
        cmd.output = target.clone();

        let mut state = new_state();
        run(&cmd, &mut state);

        assert_eq!(fs::read_to_string(&target).unwrap(), "hello\n");
        assert_eq!(state.last_status, ExitStatus::Exited(0));
    }

    #[test]
    fn test_input_redirection_feeds_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.txt");
        fs::write(&source, "5\n").unwrap();
        let mut cmd = command(&["sh", "-c", "read x; exit $x"]);
        cmd.input = source;

        let mut state = new_state();
        run(&cmd, &mut state);
        assert_eq!(state.last_status, ExitStatus::Exited(5));
    }

    #[test]
    fn test_missing_input_file_fails_child_only() {
        let mut cmd = command(&["cat"]);
        cmd.input = PathBuf::from("/definitely/not/here.txt");

        let mut state = new_state();
        run(&cmd, &mut state);
        assert_eq!(state.last_status, ExitStatus::Exited(1));
    }

    #[test]
    fn test_background_launch_is_tracked_and_reaped() {
        let mut cmd = command(&["sh", "-c", "exit 4"]);
        cmd.foreground = false;

        let mut state = new_state();
        state.last_status = ExitStatus::Exited(9);
        let out = run(&cmd, &mut state);
        assert!(out.starts_with("background pid is "), "got {out:?}");
        assert_eq!(state.last_status, ExitStatus::Exited(9));

        let pid: i32 = out
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("background pid is "))
            .and_then(|p| p.trim().parse().ok())
            .unwrap();
        let pid = Pid::from_raw(pid);

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut finished = out.contains("is done");
        while !finished && Instant::now() < deadline {
            finished = !state.jobs.reap().is_empty();
            thread::sleep(Duration::from_millis(20));
        }
        assert!(finished);
        assert!(!state.jobs.contains(pid));
    }

    #[test]
    fn test_background_does_not_block() {
        let mut cmd = command(&["sleep", "5"]);
        cmd.foreground = false;

        let mut state = new_state();
        let started = Instant::now();
        run(&cmd, &mut state);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(state.jobs.len(), 1);

        state.jobs.terminate_all();
        let deadline = Instant::now() + Duration::from_secs(10);
        while !state.jobs.is_empty() && Instant::now() < deadline {
            state.jobs.reap();
            thread::sleep(Duration::from_millis(20));
        }
        assert!(state.jobs.is_empty());
    }
}
