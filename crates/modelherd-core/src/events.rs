//! Process lifecycle events for real-time state synchronization.
//!
//! Events are emitted by the supervisor's exit-watcher and readiness path
//! and consumed by subscribers (the session controller, or an eventual
//! frontend). Subscribers should treat these events as the sole source of
//! truth for process lifecycle, respecting `updated_at` ordering to handle
//! out-of-order delivery.

use serde::{Deserialize, Serialize};

use crate::process::HandleId;

/// A single process's state in an event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStateInfo {
    /// Handle the event concerns.
    pub handle: HandleId,
    /// OS process id, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Exit code, for exit events that carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Failure reason, for failure events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Unix timestamp in milliseconds when this state was recorded.
    pub updated_at: u64,
}

impl ProcessStateInfo {
    /// Create a new `ProcessStateInfo` with the current timestamp.
    pub fn new(handle: HandleId, pid: Option<u32>) -> Self {
        Self {
            handle,
            pid,
            exit_code: None,
            reason: None,
            updated_at: Self::now_ms(),
        }
    }

    /// Get current time as Unix milliseconds.
    fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64
    }
}

/// Process lifecycle event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProcessEvent {
    /// Readiness probe succeeded; the process accepts requests.
    Ready(ProcessStateInfo),

    /// A session bound to the process; it is actively serving.
    Running(ProcessStateInfo),

    /// The process exited cleanly or was terminated by the supervisor.
    Exited(ProcessStateInfo),

    /// The process crashed or exited unexpectedly.
    Failed(ProcessStateInfo),
}

impl ProcessEvent {
    /// Create a ready event.
    pub fn ready(handle: HandleId, pid: u32) -> Self {
        Self::Ready(ProcessStateInfo::new(handle, Some(pid)))
    }

    /// Create a running event.
    pub fn running(handle: HandleId, pid: u32) -> Self {
        Self::Running(ProcessStateInfo::new(handle, Some(pid)))
    }

    /// Create an exited event for a clean or supervised stop.
    pub fn exited(handle: HandleId, pid: u32, exit_code: Option<i32>) -> Self {
        let mut info = ProcessStateInfo::new(handle, Some(pid));
        info.exit_code = exit_code;
        Self::Exited(info)
    }

    /// Create a failed event for a crash.
    pub fn failed(handle: HandleId, pid: u32, reason: impl Into<String>) -> Self {
        let mut info = ProcessStateInfo::new(handle, Some(pid));
        info.reason = Some(reason.into());
        Self::Failed(info)
    }

    /// Handle the event concerns.
    pub const fn handle(&self) -> HandleId {
        match self {
            Self::Ready(info) | Self::Running(info) | Self::Exited(info) | Self::Failed(info) => {
                info.handle
            }
        }
    }

    /// Whether this event reports a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited(_) | Self::Failed(_))
    }
}
