use argh::FromArgs;
use smallsh::config::{DEFAULT_MAX_LINE_LEN, DEFAULT_MAX_TOKENS};
use smallsh::{ForegroundMode, Interpreter, ShellConfig, ShellError, signals};
use std::env;
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter; overrides `--log-level`.
const LOG_ENV: &str = "SMALLSH_LOG";

#[derive(FromArgs)]
/// A small interactive shell with background jobs and a foreground-only mode.
struct Args {
    #[argh(option, default = "DEFAULT_MAX_LINE_LEN")]
    /// longest accepted input line in bytes.
    max_line_len: usize,

    #[argh(option, default = "DEFAULT_MAX_TOKENS")]
    /// most tokens accepted on one line.
    max_tokens: usize,

    #[argh(option, default = "String::from(\"warn\")")]
    /// log filter written to stderr (error, warn, info, debug, trace).
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(config: ShellConfig) -> Result<(), ShellError> {
    signals::install().map_err(ShellError::Signal)?;
    let mut sh = Interpreter::new(config, ForegroundMode::process());
    sh.repl(&mut io::stdin().lock(), &mut io::stdout())
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    init_logging(&args.log_level);
    info!(pid = std::process::id(), "starting smallsh");

    let config = ShellConfig {
        max_line_len: args.max_line_len,
        max_tokens: args.max_tokens,
        ..ShellConfig::default()
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "interpreter stopped");
            eprintln!("smallsh: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
