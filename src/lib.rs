//! A small interactive shell with job control.
//!
//! Each cycle the [`Interpreter`] reaps finished background jobs, prints a `:`
//! prompt and reads one line of the form `argv... [< infile] [> outfile] [&]`.
//! `cd`, `exit` and `status` run in-process; anything else is forked and
//! executed, either in the foreground (the interpreter waits) or in the
//! background (its pid is tracked and reported when it ends). `$$` in any word
//! expands to the interpreter's pid. SIGTSTP toggles foreground-only mode, in
//! which a trailing `&` is ignored.
//!
//! The public modules expose the pieces the interpreter is built from: the
//! [`parser`], the [`command`] model, the [`jobs`] table and the [`signals`]
//! controller.

mod builtin;
pub mod command;
pub mod config;
pub mod error;
pub mod expand;
mod interpreter;
pub mod jobs;
pub mod launcher;
pub mod lexer;
pub mod parser;
pub mod redirect;
pub mod signals;
pub mod state;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

pub use config::ShellConfig;
pub use error::ShellError;
pub use signals::ForegroundMode;
