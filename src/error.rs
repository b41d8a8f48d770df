//! Top-level errors that end the interpreter loop.

use crate::launcher::{FORK_FAILURE, LaunchError};
use std::io;

/// Result type alias for interpreter operations.
pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Signal dispositions could not be installed or reset.
    #[error("signal setup failed: {0}")]
    Signal(#[source] nix::Error),

    /// A fatal launch failure, in practice `fork()` refusing to work.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The prompt streams failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A builtin failed to write its output.
    #[error(transparent)]
    Builtin(#[from] anyhow::Error),
}

impl ShellError {
    /// Exit status of the interpreter process after this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::Launch(LaunchError::Fork(_)) => FORK_FAILURE,
            _ => 1,
        }
    }
}
