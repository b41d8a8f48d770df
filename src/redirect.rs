//! Standard input/output rebinding for a freshly forked child.
//!
//! Background commands always get both channels redirected (to
//! [`NULL_DEVICE`](crate::command::NULL_DEVICE) unless a file was named).
//! Foreground commands are only redirected where the user named a file.

use crate::command::Command;
use nix::errno::Errno;
use nix::libc;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Permission bits for output files created by `> file`.
const OUTPUT_MODE: u32 = 0o644;

/// Failure to set up a child's standard channels. Always fatal to the child.
#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("cannot open {} for input: {source}", path.display())]
    OpenInput { path: PathBuf, source: io::Error },
    #[error("cannot open {} for output: {source}", path.display())]
    OpenOutput { path: PathBuf, source: io::Error },
    #[error("dup2 onto fd {fd}: {source}")]
    Bind { fd: i32, source: nix::Error },
}

impl RedirectError {
    /// Status the child exits with after reporting this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Whether standard input should be rebound for `cmd`.
pub fn redirects_input(cmd: &Command) -> bool {
    !cmd.foreground || cmd.has_input_file()
}

/// Whether standard output should be rebound for `cmd`.
pub fn redirects_output(cmd: &Command) -> bool {
    !cmd.foreground || cmd.has_output_file()
}

/// Rebind fd 0 and fd 1 of the calling process as `cmd` requires.
///
/// Only ever called in a forked child; the interpreter's own descriptors are
/// never touched.
pub fn redirect_stdio(cmd: &Command) -> Result<(), RedirectError> {
    if redirects_input(cmd) {
        bind(&open_input(&cmd.input)?, libc::STDIN_FILENO)?;
    }
    if redirects_output(cmd) {
        bind(&open_output(&cmd.output)?, libc::STDOUT_FILENO)?;
    }
    Ok(())
}

/// `dup2` the opened file onto `fd`. The original descriptor is closed when
/// `file` is dropped.
fn bind(file: &File, fd: RawFd) -> Result<(), RedirectError> {
    // SAFETY: both descriptors are valid for the duration of the call.
    let res = unsafe { libc::dup2(file.as_raw_fd(), fd) };
    Errno::result(res)
        .map(drop)
        .map_err(|source| RedirectError::Bind { fd, source })
}

fn open_input(path: &Path) -> Result<File, RedirectError> {
    File::open(path).map_err(|source| RedirectError::OpenInput {
        path: path.to_owned(),
        source,
    })
}

fn open_output(path: &Path) -> Result<File, RedirectError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_MODE)
        .open(path)
        .map_err(|source| RedirectError::OpenOutput {
            path: path.to_owned(),
            source,
        })
}
