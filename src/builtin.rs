use crate::command::{CommandFactory, ExecutableCommand};
use crate::interpreter::Factory;
use crate::state::ShellState;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. They never update the status
/// reported by `status`.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "status".
    fn name() -> &'static str;

    /// Builds the command from its arguments, `args` excluding the name.
    fn parse(name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[name], args)
    }

    /// Executes the command against the interpreter state.
    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> Result<()>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, state: &mut ShellState) -> Result<()> {
        debug!(builtin = T::name(), "running builtin");
        if let Err(e) = T::execute(*self, stdout, state) {
            writeln!(stdout, "{e:#}")?;
        }
        Ok(())
    }
}

/// Usage or argument error reported by argh in place of running the builtin.
struct InvalidArgs {
    output: String,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _state: &mut ShellState) -> Result<()> {
        stdout.write_all(self.output.as_bytes())?;
        if !self.output.ends_with('\n') {
            writeln!(stdout)?;
        }
        Ok(())
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::parse(name, args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, .. }) => Box::new(InvalidArgs { output }),
            })
        } else {
            None
        }
    }
}

/// Parse `args` as positional operands only, so words starting with `-` are
/// never taken for flags.
fn parse_operands<T: FromArgs>(name: &str, args: &[&str]) -> Result<T, EarlyExit> {
    let operands: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
    T::from_args(&[name], &operands)
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl Cd {
    fn resolve(&self, home: Option<OsString>) -> Result<PathBuf> {
        match &self.target {
            Some(t) if !t.is_empty() => Ok(PathBuf::from(t)),
            _ => home
                .map(PathBuf::from)
                .ok_or_else(|| anyhow::anyhow!("cd: no target and HOME not set")),
        }
    }
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn parse(name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        parse_operands(name, args)
    }

    fn execute(self, _stdout: &mut dyn Write, _state: &mut ShellState) -> Result<()> {
        let target = self.resolve(env::var_os("HOME"))?;
        env::set_current_dir(&target).with_context(|| format!("cd: {}", target.display()))?;
        debug!(dir = %target.display(), "changed directory");
        Ok(())
    }
}

#[derive(FromArgs)]
/// Terminate all background jobs and exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; exit always reports success.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn parse(name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        parse_operands(name, args)
    }

    fn execute(self, _stdout: &mut dyn Write, state: &mut ShellState) -> Result<()> {
        state.jobs.terminate_all();
        state.should_exit = true;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print how the last foreground command ended.
pub struct Status {}

impl BuiltinCommand for Status {
    fn name() -> &'static str {
        "status"
    }

    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> Result<()> {
        writeln!(stdout, "{}", state.last_status)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ExitStatus;
    use crate::signals::ForegroundMode;
    use nix::unistd::Pid;
    use std::fs;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn new_state() -> ShellState {
        ShellState::new(ForegroundMode::detached())
    }

    fn run(name: &str, args: &[&str], state: &mut ShellState) -> String {
        let factories: Vec<Box<dyn CommandFactory>> = vec![
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Status>::default()),
        ];
        let cmd = factories
            .iter()
            .find_map(|f| f.try_create(name, args))
            .expect("builtin not recognized");
        let mut out = Vec::new();
        cmd.execute(&mut out, state).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_factory_ignores_other_names() {
        assert!(Factory::<Cd>::default().try_create("ls", &[]).is_none());
        assert!(Factory::<Status>::default().try_create("cd", &[]).is_none());
        assert!(Factory::<Exit>::default().try_create("exit", &[]).is_some());
    }

    #[test]
    fn test_status_prints_default() {
        let mut state = new_state();
        assert_eq!(run("status", &[], &mut state), "exit value 0\n");
    }

    #[test]
    fn test_status_prints_last_status() {
        let mut state = new_state();
        state.last_status = ExitStatus::Signaled(2);
        assert_eq!(run("status", &[], &mut state), "terminated by signal 2\n");
        state.last_status = ExitStatus::Exited(1);
        assert_eq!(run("status", &[], &mut state), "exit value 1\n");
    }

    #[test]
    fn test_builtins_leave_status_alone() {
        let _lock = lock_current_dir();
        let mut state = new_state();
        state.last_status = ExitStatus::Exited(7);
        run("cd", &["/definitely/not/a/dir"], &mut state);
        run("status", &["extra"], &mut state);
        assert_eq!(state.last_status, ExitStatus::Exited(7));
    }

    #[test]
    fn test_exit_sets_flag_and_signals_jobs() {
        let mut state = new_state();
        let child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        state.jobs.track(pid);

        assert_eq!(run("exit", &["ignored"], &mut state), "");
        assert!(state.should_exit);

        let status = nix::sys::wait::waitpid(pid, None).unwrap();
        assert_eq!(ExitStatus::from_wait(status), Some(ExitStatus::Signaled(15)));
    }

    #[test]
    fn test_exit_ignores_dash_arguments() {
        let mut state = new_state();
        assert_eq!(run("exit", &["-1", "--help", "-"], &mut state), "");
        assert!(state.should_exit);
    }

    #[test]
    fn test_cd_resolve_target() {
        let cd = Cd {
            target: Some("some/dir".to_string()),
        };
        assert_eq!(cd.resolve(None).unwrap(), PathBuf::from("some/dir"));

        let cd = Cd { target: None };
        assert_eq!(
            cd.resolve(Some(OsString::from("/home/someone"))).unwrap(),
            PathBuf::from("/home/someone")
        );
        assert!(cd.resolve(None).is_err());
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let orig = env::current_dir().unwrap();

        let target = canonical_temp.to_string_lossy().into_owned();
        let mut state = new_state();
        let out = run("cd", &[target.as_str()], &mut state);
        let new_cwd = fs::canonicalize(env::current_dir().unwrap()).unwrap();
        env::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(out, "");
        assert_eq!(new_cwd, canonical_temp);
    }

    #[test]
    fn test_cd_to_relative_path() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("child")).unwrap();
        let orig = env::current_dir().unwrap();
        env::set_current_dir(temp.path()).unwrap();

        let mut state = new_state();
        run("cd", &["child"], &mut state);
        let new_cwd = fs::canonicalize(env::current_dir().unwrap()).unwrap();
        env::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(new_cwd, fs::canonicalize(temp.path().join("child")).unwrap());
    }

    #[test]
    fn test_cd_into_dash_prefixed_dir() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("-dir")).unwrap();
        let orig = env::current_dir().unwrap();
        env::set_current_dir(temp.path()).unwrap();

        let mut state = new_state();
        let out = run("cd", &["-dir"], &mut state);
        let new_cwd = fs::canonicalize(env::current_dir().unwrap()).unwrap();
        env::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(out, "");
        assert_eq!(new_cwd, fs::canonicalize(temp.path().join("-dir")).unwrap());
    }

    #[test]
    fn test_cd_dash_is_a_path_not_a_flag() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();
        let mut state = new_state();

        let out = run("cd", &["-"], &mut state);

        assert!(out.starts_with("cd: -"), "got {out:?}");
        assert_eq!(env::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_to_missing_dir_reports_and_continues() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();
        let mut state = new_state();

        let out = run("cd", &["/definitely/not/a/dir"], &mut state);

        assert!(out.starts_with("cd: /definitely/not/a/dir"), "got {out:?}");
        assert_eq!(env::current_dir().unwrap(), orig);
        assert!(!state.should_exit);
    }

    #[test]
    fn test_cd_with_too_many_args_prints_usage_error() {
        let mut state = new_state();
        let out = run("cd", &["a", "b"], &mut state);
        assert!(!out.is_empty());
        assert!(out.ends_with('\n'));
    }
}
