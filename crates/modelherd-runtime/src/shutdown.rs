//! Stop signals by PID for graceful-then-forced termination.
//!
//! The supervisor's exit-watcher owns each `Child`, so termination cannot go
//! through `Child::kill`; signals are delivered by PID and the watcher
//! observes (and reaps) the resulting exit.

use std::io;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Outcome of delivering a stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The signal was delivered to a live process.
    Delivered,
    /// The process was already gone (ESRCH).
    AlreadyGone,
}

/// Send SIGTERM to a process by PID.
///
/// `ESRCH` is not an error: the process already exited and the exit-watcher
/// will observe it.
pub fn send_term(pid: u32) -> io::Result<SignalOutcome> {
    #[cfg(unix)]
    {
        send_unix(pid, Signal::SIGTERM)
    }

    #[cfg(not(unix))]
    {
        unsupported(pid)
    }
}

/// Send SIGKILL to a process by PID.
pub fn send_kill(pid: u32) -> io::Result<SignalOutcome> {
    #[cfg(unix)]
    {
        send_unix(pid, Signal::SIGKILL)
    }

    #[cfg(not(unix))]
    {
        unsupported(pid)
    }
}

#[cfg(unix)]
fn send_unix(pid: u32, sig: Signal) -> io::Result<SignalOutcome> {
    match signal::kill(Pid::from_raw(pid as i32), sig) {
        Ok(()) => Ok(SignalOutcome::Delivered),
        Err(Errno::ESRCH) => Ok(SignalOutcome::AlreadyGone),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
fn unsupported(_pid: u32) -> io::Result<SignalOutcome> {
    // Signal-based termination is primarily a macOS/Linux concern
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "signal-based termination not implemented on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn term_on_missing_pid_reports_already_gone() {
        let outcome = send_term(999_999).unwrap();
        assert_eq!(outcome, SignalOutcome::AlreadyGone);
    }

    #[test]
    #[cfg(unix)]
    fn kill_on_missing_pid_reports_already_gone() {
        let outcome = send_kill(999_999).unwrap();
        assert_eq!(outcome, SignalOutcome::AlreadyGone);
    }
}
