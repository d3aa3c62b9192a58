//! Process lifecycle states and the supervisor/session error taxonomy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier for a supervised process slot.
///
/// Handle ids are allocated by the supervisor and never reused within a
/// process lifetime, so a stale id can never alias a new child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a supervised process.
///
/// Transitions: `Starting -> Ready -> Running -> Exited | Failed`, with any
/// non-terminal state moving to `Exited`/`Failed` when the exit-watcher
/// observes the child terminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Spawned, not yet confirmed healthy.
    Starting,
    /// Readiness probe succeeded; accepting requests.
    Ready,
    /// Ready and serving at least one bound session.
    Running,
    /// Exited cleanly or was terminated by the supervisor.
    Exited(Option<i32>),
    /// Crashed or exited unexpectedly.
    Failed(String),
}

impl ProcessStatus {
    /// Whether the process has stopped for good.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited(_) | Self::Failed(_))
    }

    /// Whether a dependent session may bind to the process.
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Exited(Some(code)) => write!(f, "exited with code {code}"),
            Self::Exited(None) => write!(f, "exited"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Errors produced by the process supervisor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorError {
    /// The executable could not be found or spawned.
    #[error("failed to launch `{program}`: {reason}")]
    Launch {
        /// Program that was requested.
        program: String,
        /// Why the spawn failed.
        reason: String,
    },

    /// The readiness probe did not succeed within the budget.
    ///
    /// The process is left running; the caller decides whether to kill it.
    #[error("process did not become ready within {timeout:?}")]
    ReadinessTimeout {
        /// The configured readiness budget.
        timeout: Duration,
    },

    /// The process exited before the readiness probe ever succeeded.
    #[error("process exited before becoming ready ({status})")]
    ExitedEarly {
        /// Terminal status observed by the exit-watcher.
        status: ProcessStatus,
    },

    /// The forced kill itself failed; the process may now be orphaned.
    #[error("failed to terminate pid {pid}: {reason}")]
    Termination {
        /// Pid of the process that could not be killed.
        pid: u32,
        /// Why the kill failed.
        reason: String,
    },

    /// An external cancellation signal interrupted the operation.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors produced by the session controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The server handle is not in a state a session can bind to.
    #[error("server is not ready for sessions (currently {status})")]
    DependencyNotReady {
        /// Status the server was observed in.
        status: ProcessStatus,
    },

    /// The client process has already exited.
    #[error("session is closed")]
    SessionClosed,

    /// Launching the client process failed.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(ProcessStatus::Exited(Some(0)).is_terminal());
        assert!(ProcessStatus::Failed("boom".to_string()).is_terminal());
        assert!(!ProcessStatus::Starting.is_terminal());
        assert!(!ProcessStatus::Ready.is_terminal());
    }

    #[test]
    fn availability_requires_ready_or_running() {
        assert!(ProcessStatus::Ready.is_available());
        assert!(ProcessStatus::Running.is_available());
        assert!(!ProcessStatus::Starting.is_available());
        assert!(!ProcessStatus::Exited(None).is_available());
    }

    #[test]
    fn error_messages_name_the_program() {
        let err = SupervisorError::Launch {
            program: "ollama".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "failed to launch `ollama`: not found");
    }

    #[test]
    fn session_error_wraps_supervisor_error() {
        let err: SessionError = SupervisorError::Cancelled.into();
        assert_eq!(err, SessionError::Supervisor(SupervisorError::Cancelled));
    }
}
