use crate::command::{Command, CommandFactory};
use crate::config::ShellConfig;
use crate::error::{Result, ShellError};
use crate::launcher;
use crate::parser::{self, ParsedLine};
use crate::signals::{self, ForegroundMode};
use crate::state::ShellState;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the builtins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A small job-control shell: built-ins run in-process, everything else is
/// forked and executed, in the foreground or as a tracked background job.
///
/// Example
/// ```
/// use smallsh::{ForegroundMode, Interpreter, ShellConfig};
/// use std::io::Cursor;
///
/// let mut sh = Interpreter::new(ShellConfig::default(), ForegroundMode::detached());
/// let mut out = Vec::new();
/// sh.repl(&mut Cursor::new("status\nexit\n"), &mut out).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), ":exit value 0\n:");
/// ```
pub struct Interpreter {
    state: ShellState,
    config: ShellConfig,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter with the builtins `cd`, `exit` and `status`.
    pub fn new(config: ShellConfig, foreground_only: ForegroundMode) -> Self {
        use crate::builtin::*;
        Self::with_commands(
            config,
            foreground_only,
            vec![
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Status>::default()),
            ],
        )
    }

    /// Create a new interpreter with a custom set of command factories.
    pub fn with_commands(
        config: ShellConfig,
        foreground_only: ForegroundMode,
        commands: Vec<Box<dyn CommandFactory>>,
    ) -> Self {
        Self {
            state: ShellState::new(foreground_only),
            config,
            commands,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Read-eval loop. Returns after `exit` or at end of input.
    ///
    /// End of input behaves like `exit`: background jobs are sent SIGTERM.
    pub fn repl(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<()> {
        while !self.state.should_exit {
            if !self.step(input, out)? {
                debug!("end of input");
                self.state.jobs.terminate_all();
                self.state.should_exit = true;
            }
        }
        Ok(())
    }

    /// One interpreter cycle: reset SIGINT, reap finished jobs, prompt, read
    /// one line and run it.
    ///
    /// Returns `false` once `input` is exhausted.
    pub fn step(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<bool> {
        signals::ignore_interrupt().map_err(ShellError::Signal)?;
        self.report_finished_jobs(out)?;

        write!(out, "{}", self.config.prompt)?;
        out.flush()?;

        let mut buf = Vec::new();
        if input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(false);
        }
        let line = String::from_utf8_lossy(&buf);

        let parsed = parser::parse_line(
            &line,
            &self.config,
            self.state.foreground_only.is_active(),
            self.state.shell_pid_text(),
        );
        match parsed {
            Ok(ParsedLine::Skip) => {}
            Ok(ParsedLine::Command(cmd)) => self.execute(cmd, out)?,
            Err(err) => {
                debug!(?err, "rejected input line");
                writeln!(out, "{err}")?;
            }
        }
        Ok(true)
    }

    /// Dispatch a parsed command: a builtin if one matches its name, otherwise
    /// an external program.
    ///
    /// Builtins ignore redirections and `&`, and never update the status
    /// reported by `status`.
    pub fn execute(&mut self, cmd: Command, out: &mut dyn Write) -> Result<()> {
        let args: Vec<&str> = cmd.args().iter().map(String::as_str).collect();
        for factory in &self.commands {
            if let Some(builtin) = factory.try_create(cmd.program(), &args) {
                builtin.execute(out, &mut self.state)?;
                out.flush()?;
                return Ok(());
            }
        }

        match launcher::launch(&cmd, &mut self.state, out) {
            Err(err) if !err.is_fatal() => {
                warn!(%err, "foreground command status lost");
                writeln!(out, "{err}")?;
                Ok(())
            }
            result => result.map_err(ShellError::from),
        }
    }

    fn report_finished_jobs(&mut self, out: &mut dyn Write) -> Result<()> {
        for report in self.state.jobs.reap() {
            writeln!(out, "{report}")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Default for Interpreter {
    /// Default limits, driven by the process-wide foreground-only flag.
    fn default() -> Self {
        Self::new(ShellConfig::default(), ForegroundMode::process())
    }
}
