//! Signal dispositions for the interpreter and its children.
//!
//! SIGINT is ignored by the interpreter and by background children; only a
//! foreground child gets the default (terminating) disposition back, right
//! before `exec`. SIGTSTP toggles foreground-only mode. Its handler touches
//! nothing but one [`AtomicBool`] and writes a fixed message with `write(2)`.

use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

/// Written when foreground-only mode is switched on. Ends with the prompt.
pub const ENTER_FOREGROUND_ONLY: &str = "Entering foreground-only mode (& is now ignored)\n:";

/// Written when foreground-only mode is switched off. Ends with the prompt.
pub const EXIT_FOREGROUND_ONLY: &str = "Exiting foreground-only mode\n:";

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// Shared view of the foreground-only flag.
///
/// The process-wide instance is the one the SIGTSTP handler flips. Detached
/// instances are independent flags for embedding and tests.
#[derive(Debug, Clone, Copy)]
pub struct ForegroundMode {
    flag: &'static AtomicBool,
}

impl ForegroundMode {
    /// The flag driven by the installed SIGTSTP handler.
    pub fn process() -> Self {
        Self {
            flag: &FOREGROUND_ONLY,
        }
    }

    /// A flag no signal handler knows about.
    ///
    /// Leaks one `AtomicBool`; meant for a handful of instances per process.
    pub fn detached() -> Self {
        Self {
            flag: Box::leak(Box::new(AtomicBool::new(false))),
        }
    }

    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Flip the mode and return the message announcing the new state.
    ///
    /// Async-signal-safe: a single atomic read-modify-write, no allocation.
    pub fn toggle(&self) -> &'static str {
        if self.flag.fetch_xor(true, Ordering::SeqCst) {
            EXIT_FOREGROUND_ONLY
        } else {
            ENTER_FOREGROUND_ONLY
        }
    }
}

extern "C" fn handle_sigtstp(_signo: libc::c_int) {
    let message = ForegroundMode::process().toggle();
    // SAFETY: write(2) is async-signal-safe and `message` is a static string.
    unsafe {
        libc::write(libc::STDOUT_FILENO, message.as_ptr().cast(), message.len());
    }
}

/// Install the interpreter's dispositions: SIGINT ignored, SIGTSTP toggling
/// foreground-only mode.
pub fn install() -> nix::Result<()> {
    ignore_interrupt()?;
    let action = SigAction::new(
        SigHandler::Handler(handle_sigtstp),
        SaFlags::SA_RESTART,
        SigSet::all(),
    );
    // SAFETY: the handler only performs an atomic update and write(2).
    unsafe { signal::sigaction(Signal::SIGTSTP, &action) }?;
    Ok(())
}

/// Set SIGINT back to ignored. Called at the top of every interpreter cycle.
pub fn ignore_interrupt() -> nix::Result<()> {
    set_disposition(Signal::SIGINT, SigHandler::SigIgn)
}

/// Child-side setup between `fork` and `exec`.
///
/// SIGTSTP is ignored in every child so a stop request never suspends a
/// foreground child behind the interpreter's blocking wait. SIGINT gets its
/// default disposition only for foreground children.
pub fn restore_child_dispositions(foreground: bool) -> nix::Result<()> {
    // The Rust runtime starts with SIGPIPE ignored; ignored dispositions
    // survive exec.
    set_disposition(Signal::SIGPIPE, SigHandler::SigDfl)?;
    set_disposition(Signal::SIGTSTP, SigHandler::SigIgn)?;
    if foreground {
        set_disposition(Signal::SIGINT, SigHandler::SigDfl)?;
    }
    Ok(())
}

fn set_disposition(signal: Signal, handler: SigHandler) -> nix::Result<()> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::all());
    // SAFETY: SigIgn and SigDfl install no Rust code in signal context.
    unsafe { signal::sigaction(signal, &action) }?;
    Ok(())
}
