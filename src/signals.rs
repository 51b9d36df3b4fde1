//! Interrupt disposition and the foreground-only mode toggle.
//!
//! `SIGINT` is ignored by the shell itself. `SIGTSTP` flips foreground-only
//! mode; it is unblocked only while the shell waits for a line, so a toggle
//! never lands in the middle of dispatching a command.

use log::debug;
use nix::libc::{STDOUT_FILENO, c_int};
use nix::sys::signal::{
    self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigprocmask,
};
use std::os::fd::BorrowedFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Signal that toggles foreground-only mode.
pub const TOGGLE_SIGNAL: Signal = Signal::SIGTSTP;
/// Interactive interrupt, ignored by the shell.
pub const INTERRUPT_SIGNAL: Signal = Signal::SIGINT;

const ENTER_NOTICE: &str = "Entering foreground-only mode (& is now ignored)";
const EXIT_NOTICE: &str = "Exiting foreground-only mode";

/// Flag the installed handler flips.
static HANDLER_TARGET: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Shared foreground-only flag.
///
/// Clones observe the same flag. The interpreter reads it once per external
/// command, at spawn time.
#[derive(Debug, Clone, Default)]
pub struct ForegroundMode {
    flag: Arc<AtomicBool>,
}

impl ForegroundMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Flip the mode and return the new value.
    pub fn toggle(&self) -> bool {
        !self.flag.fetch_xor(true, Ordering::SeqCst)
    }

    /// Message announcing that the mode is now `enabled`.
    pub fn notice(enabled: bool) -> &'static str {
        if enabled { ENTER_NOTICE } else { EXIT_NOTICE }
    }

    /// Route the toggle signal to this flag and set the shell's dispositions.
    ///
    /// Only the first installed mode receives signals; later calls keep the
    /// original target.
    pub fn install(&self) -> nix::Result<()> {
        let _ = HANDLER_TARGET.set(Arc::clone(&self.flag));

        let mut mask = SigSet::all();
        mask.remove(Signal::SIGKILL);
        mask.remove(Signal::SIGSTOP);
        let toggle = SigAction::new(SigHandler::Handler(on_toggle), SaFlags::SA_RESTART, mask);
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        // SAFETY: `on_toggle` only touches an atomic and calls write(2).
        unsafe {
            signal::sigaction(TOGGLE_SIGNAL, &toggle)?;
            signal::sigaction(INTERRUPT_SIGNAL, &ignore)?;
        }
        block_toggle()?;
        debug!("signal handlers installed");
        Ok(())
    }
}

extern "C" fn on_toggle(_: c_int) {
    let Some(flag) = HANDLER_TARGET.get() else {
        return;
    };
    let enabled = !flag.fetch_xor(true, Ordering::SeqCst);
    // SAFETY: stdout stays open for the life of the process.
    let stdout = unsafe { BorrowedFd::borrow_raw(STDOUT_FILENO) };
    for part in ["\n", ForegroundMode::notice(enabled), "\n"] {
        let _ = nix::unistd::write(stdout, part.as_bytes());
    }
}

fn toggle_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(TOGGLE_SIGNAL);
    set
}

/// Hold the toggle signal pending until the next [`ToggleWindow`].
pub fn block_toggle() -> nix::Result<()> {
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&toggle_set()), None)
}

/// Let a pending or new toggle signal through.
pub fn unblock_toggle() -> nix::Result<()> {
    sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&toggle_set()), None)
}

/// Period during which the toggle signal may be delivered.
///
/// Opened right before reading a line; dropping it blocks the signal again.
pub struct ToggleWindow {
    _private: (),
}

impl ToggleWindow {
    pub fn open() -> nix::Result<Self> {
        unblock_toggle()?;
        Ok(Self { _private: () })
    }
}

impl Drop for ToggleWindow {
    fn drop(&mut self) {
        if let Err(e) = block_toggle() {
            debug!("re-blocking {} failed: {}", TOGGLE_SIGNAL, e);
        }
    }
}

/// Signal setup for a freshly forked child, before it execs.
///
/// Foreground children get the default interrupt disposition back; background
/// children keep ignoring it. Every child ignores the toggle signal and starts
/// with it unblocked.
pub fn prepare_child(background: bool) -> nix::Result<()> {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    let interrupt = if background { &ignore } else { &default };
    // SAFETY: installs SIG_IGN/SIG_DFL only, no handler code runs.
    unsafe {
        signal::sigaction(INTERRUPT_SIGNAL, interrupt)?;
        signal::sigaction(TOGGLE_SIGNAL, &ignore)?;
    }
    unblock_toggle()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_and_reports_new_value() {
        let mode = ForegroundMode::new();
        assert!(!mode.is_enabled());
        assert!(mode.toggle());
        assert!(mode.is_enabled());
        assert!(!mode.toggle());
        assert!(!mode.is_enabled());
    }

    #[test]
    fn clones_share_the_flag() {
        let mode = ForegroundMode::new();
        let seen_by_loop = mode.clone();
        mode.toggle();
        assert!(seen_by_loop.is_enabled());
    }

    #[test]
    fn notices_match_direction() {
        assert_eq!(
            ForegroundMode::notice(true),
            "Entering foreground-only mode (& is now ignored)"
        );
        assert_eq!(ForegroundMode::notice(false), "Exiting foreground-only mode");
    }

    #[test]
    fn installed_handler_fires_only_inside_the_window() {
        let mode = ForegroundMode::new();
        mode.install().unwrap();

        signal::raise(TOGGLE_SIGNAL).unwrap();
        assert!(!mode.is_enabled(), "toggle delivered while blocked");
        {
            let _window = ToggleWindow::open().unwrap();
        }
        assert!(mode.is_enabled());

        // Back outside the window a second toggle waits for the next one.
        signal::raise(TOGGLE_SIGNAL).unwrap();
        assert!(mode.is_enabled());
        {
            let _window = ToggleWindow::open().unwrap();
        }
        assert!(!mode.is_enabled());
    }

    #[test]
    fn window_unblocks_then_reblocks() {
        let blocked = || {
            let mut current = SigSet::empty();
            sigprocmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current)).unwrap();
            current.contains(TOGGLE_SIGNAL)
        };
        block_toggle().unwrap();
        assert!(blocked());
        {
            let _window = ToggleWindow::open().unwrap();
            assert!(!blocked());
        }
        assert!(blocked());
        unblock_toggle().unwrap();
    }
}
