use crate::state::ShellState;
use anyhow::Result;
use nix::sys::wait::WaitStatus;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

/// Redirection target used when a command names no file of its own.
pub const NULL_DEVICE: &str = "/dev/null";

/// One parsed command line, ready to be dispatched.
///
/// Built by [`crate::parser::parse_line`] and consumed once by the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program name followed by its arguments. Never empty.
    pub argv: Vec<String>,
    /// Source for standard input; [`NULL_DEVICE`] unless `< file` was given.
    pub input: PathBuf,
    /// Target for standard output; [`NULL_DEVICE`] unless `> file` was given.
    pub output: PathBuf,
    /// `false` only for a trailing `&` outside foreground-only mode.
    pub foreground: bool,
}

impl Command {
    /// A foreground command with default redirection targets.
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            input: PathBuf::from(NULL_DEVICE),
            output: PathBuf::from(NULL_DEVICE),
            foreground: true,
        }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    pub fn has_input_file(&self) -> bool {
        self.input.as_os_str() != NULL_DEVICE
    }

    pub fn has_output_file(&self) -> bool {
        self.output.as_os_str() != NULL_DEVICE
    }
}

/// How the most recent foreground external command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by the given signal number.
    Signaled(i32),
}

impl ExitStatus {
    /// Classify a `waitpid` result. `None` unless the child has terminated.
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(ExitStatus::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        ExitStatus::Exited(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit value {code}"),
            ExitStatus::Signaled(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}

/// Object-safe trait for anything the interpreter runs in-process.
pub trait ExecutableCommand {
    /// Runs the command. Never forks and never touches `state.last_status`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, state: &mut ShellState) -> Result<()>;
}

/// Factory that tries to create an in-process command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`; the
/// interpreter then launches the name as an external program.
pub trait CommandFactory {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
