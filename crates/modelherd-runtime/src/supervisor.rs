//! Supervision of long-running server-class processes.
//!
//! The [`ProcessSupervisor`] owns the process table: every spawn, signal,
//! and reap goes through it. Each child gets a dedicated exit-watcher task
//! that owns the `Child` handle, publishes the terminal status, and emits a
//! lifecycle event; nothing ever polls for exit.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use modelherd_core::events::ProcessEvent;
use modelherd_core::ports::{NoopOutputSink, ReadinessProbe, SessionOutputSink};
use modelherd_core::{HandleId, Invocation, ProcessStatus, SupervisorError};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::output::spawn_line_readers;
use crate::shutdown::{self, SignalOutcome};

/// Broadcast channel capacity for lifecycle events
const EVENT_CAPACITY: usize = 64;

/// Tuning knobs for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Fixed interval between readiness probe attempts.
    pub poll_interval: Duration,
    /// How long to wait for reaping after a forced kill.
    pub kill_wait: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            kill_wait: Duration::from_secs(5),
        }
    }
}

/// Handle to a supervised process.
///
/// The handle is plain data plus a watch subscription: cloning it never
/// clones OS resources, and it stays valid (readable) after the process
/// exits and the supervisor discards its table entry.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: HandleId,
    pid: u32,
    started_at: u64,
    status_rx: watch::Receiver<ProcessStatus>,
}

impl ProcessHandle {
    /// Identifier of the supervised slot.
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// OS process id of the child.
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Unix timestamp (seconds) when the child was spawned.
    pub const fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Non-blocking snapshot of the current status.
    ///
    /// Reads are at least as fresh as the last published transition.
    pub fn status(&self) -> ProcessStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to status transitions.
    pub fn watch(&self) -> watch::Receiver<ProcessStatus> {
        self.status_rx.clone()
    }

    /// Wait until the process reaches a terminal status and return it.
    pub async fn wait(&self) -> ProcessStatus {
        let mut rx = self.status_rx.clone();
        loop {
            let status = rx.borrow_and_update().clone();
            if status.is_terminal() {
                return status;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

/// Supervisor-internal record for a live child.
struct Supervised {
    pid: u32,
    status: Arc<watch::Sender<ProcessStatus>>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    terminating: Arc<AtomicBool>,
}

/// Owner of the process table and all OS-level process control.
///
/// One supervising task per handle watches for exit; all blocking process
/// operations happen off the caller's task, so an interactive caller is
/// never stuck behind process I/O.
pub struct ProcessSupervisor {
    table: Arc<Mutex<HashMap<HandleId, Supervised>>>,
    events: broadcast::Sender<ProcessEvent>,
    cancel: CancellationToken,
    config: SupervisorConfig,
    next_id: AtomicU64,
    output: Arc<dyn SessionOutputSink>,
}

impl ProcessSupervisor {
    /// Create a supervisor that discards child output.
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_output_sink(config, Arc::new(NoopOutputSink))
    }

    /// Create a supervisor forwarding child output to `sink`.
    pub fn with_output_sink(config: SupervisorConfig, sink: Arc<dyn SessionOutputSink>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            events,
            cancel: CancellationToken::new(),
            config,
            next_id: AtomicU64::new(1),
            output: sink,
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.events.subscribe()
    }

    /// Token cancelling in-flight `await_ready` calls.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn a child from an invocation and begin supervising it.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Launch`] if the executable cannot be
    /// found or the spawn fails; no handle is created in that case.
    pub async fn start(&self, invocation: &Invocation) -> Result<ProcessHandle, SupervisorError> {
        let program = resolve_program(invocation.program())?;

        let mut cmd = Command::new(&program);
        cmd.args(invocation.arg_list());
        if let Some(dir) = invocation.working_dir() {
            cmd.current_dir(dir);
        }
        cmd.envs(invocation.env_overrides());
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // An aborted watcher task must not leak the child
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| SupervisorError::Launch {
            program: program.display().to_string(),
            reason: e.to_string(),
        })?;
        let pid = child.id().ok_or_else(|| SupervisorError::Launch {
            program: program.display().to_string(),
            reason: "child has no PID".to_string(),
        })?;

        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (status_tx, status_rx) = watch::channel(ProcessStatus::Starting);
        let status_tx = Arc::new(status_tx);
        let stdin = Arc::new(Mutex::new(child.stdin.take()));
        let terminating = Arc::new(AtomicBool::new(false));

        spawn_line_readers(&mut child, id, self.output.clone());

        {
            let mut table = self.table.lock().await;
            table.insert(
                id,
                Supervised {
                    pid,
                    status: status_tx.clone(),
                    stdin,
                    terminating: terminating.clone(),
                },
            );
        }

        tokio::spawn(watch_exit(
            child,
            id,
            pid,
            status_tx,
            terminating,
            self.table.clone(),
            self.events.clone(),
        ));

        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        info!(handle = %id, pid = %pid, program = %invocation.program(), "Started process");
        Ok(ProcessHandle {
            id,
            pid,
            started_at,
            status_rx,
        })
    }

    /// Poll `probe` at the configured interval until the process is ready.
    ///
    /// The probe races against process exit, the timeout deadline, and the
    /// supervisor's cancellation token; whichever resolves first determines
    /// the outcome. On success the `Ready` status is published before this
    /// returns, so no dependent can observe readiness early.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::ReadinessTimeout`]: the budget elapsed; the
    ///   process is left running for the caller to decide about.
    /// - [`SupervisorError::ExitedEarly`]: the exit-watcher saw the child
    ///   terminate first.
    /// - [`SupervisorError::Cancelled`]: the cancellation token fired.
    pub async fn await_ready(
        &self,
        handle: &ProcessHandle,
        probe: &dyn ReadinessProbe,
        timeout: Duration,
    ) -> Result<(), SupervisorError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut status_rx = handle.watch();

        let current = status_rx.borrow_and_update().clone();
        if current.is_terminal() {
            return Err(SupervisorError::ExitedEarly { status: current });
        }
        if current.is_available() {
            return Ok(());
        }

        let poll_interval = self.config.poll_interval;
        let probing = async {
            loop {
                if probe.check().await {
                    return;
                }
                tokio::time::sleep(poll_interval).await;
            }
        };
        tokio::pin!(probing);

        loop {
            tokio::select! {
                () = &mut probing => {
                    self.publish(handle.id(), handle.pid(), ProcessStatus::Ready).await;
                    debug!(handle = %handle.id(), "Process is ready");
                    return Ok(());
                }
                changed = status_rx.changed() => {
                    let status = status_rx.borrow_and_update().clone();
                    if changed.is_err() || status.is_terminal() {
                        return Err(SupervisorError::ExitedEarly { status });
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    return Err(SupervisorError::ReadinessTimeout { timeout });
                }
                () = self.cancel.cancelled() => {
                    return Err(SupervisorError::Cancelled);
                }
            }
        }
    }

    /// Publish `Running` for a handle currently in `Ready`.
    ///
    /// Called by the session controller when the first client binds.
    pub async fn mark_running(&self, handle: &ProcessHandle) {
        if matches!(handle.status(), ProcessStatus::Ready) {
            self.publish(handle.id(), handle.pid(), ProcessStatus::Running).await;
        }
    }

    /// Non-blocking status snapshot; never fails.
    pub fn status(&self, handle: &ProcessHandle) -> ProcessStatus {
        handle.status()
    }

    /// Gracefully stop a process, escalating to a forced kill.
    ///
    /// Sends the stop signal, waits up to `grace` for the exit-watcher to
    /// observe the exit, then force-kills. Idempotent: terminating an
    /// already-exited handle is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Termination`] only if the forced kill
    /// itself fails (e.g. permission denied); the process may be orphaned.
    pub async fn terminate(
        &self,
        handle: &ProcessHandle,
        grace: Duration,
    ) -> Result<(), SupervisorError> {
        self.terminate_by_id(handle.id(), grace).await
    }

    /// Stop every supervised process and cancel in-flight waits.
    pub async fn shutdown(&self, grace: Duration) {
        info!("Shutting down process supervisor");
        self.cancel.cancel();
        let ids: Vec<HandleId> = { self.table.lock().await.keys().copied().collect() };
        for id in ids {
            if let Err(e) = self.terminate_by_id(id, grace).await {
                warn!(handle = %id, error = %e, "Failed to stop process during shutdown");
            }
        }
    }

    async fn terminate_by_id(&self, id: HandleId, grace: Duration) -> Result<(), SupervisorError> {
        let entry = {
            let table = self.table.lock().await;
            table
                .get(&id)
                .map(|e| (e.pid, e.terminating.clone(), e.status.clone()))
        };
        // Entry already reaped by the exit-watcher: nothing to do.
        let Some((pid, terminating, status)) = entry else {
            return Ok(());
        };
        if status.borrow().is_terminal() {
            return Ok(());
        }

        // Mark before signalling so the watcher reports Exited, not Failed.
        terminating.store(true, Ordering::SeqCst);
        let mut rx = status.subscribe();

        debug!(handle = %id, pid = %pid, "Stopping process");
        match shutdown::send_term(pid) {
            Ok(SignalOutcome::AlreadyGone) => {
                wait_terminal(&mut rx, self.config.kill_wait).await;
                return Ok(());
            }
            Ok(SignalOutcome::Delivered) => {}
            Err(e) => {
                warn!(pid = %pid, error = %e, "Graceful stop signal failed, escalating");
            }
        }

        if wait_terminal(&mut rx, grace).await {
            return Ok(());
        }

        info!(handle = %id, pid = %pid, "Grace period elapsed, force-killing");
        match shutdown::send_kill(pid) {
            Ok(_) => {}
            Err(e) => {
                return Err(SupervisorError::Termination {
                    pid,
                    reason: e.to_string(),
                });
            }
        }

        // Reaping should be fast after a forced kill
        wait_terminal(&mut rx, self.config.kill_wait).await;
        Ok(())
    }

    /// Forward a line to a child's stdin, appending a newline.
    pub(crate) async fn write_line(&self, id: HandleId, line: &str) -> io::Result<()> {
        let stdin = {
            let table = self.table.lock().await;
            table.get(&id).map(|e| e.stdin.clone())
        };
        let Some(stdin) = stdin else {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "process has exited",
            ));
        };
        let mut guard = stdin.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stdin already closed",
            ));
        };
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }

    /// Close a child's stdin, signalling end of input.
    pub(crate) async fn close_stdin(&self, id: HandleId) {
        let stdin = {
            let table = self.table.lock().await;
            table.get(&id).map(|e| e.stdin.clone())
        };
        if let Some(stdin) = stdin {
            stdin.lock().await.take();
        }
    }

    /// Publish a non-terminal status transition and its event.
    ///
    /// Terminal states are the exit-watcher's to publish; this never
    /// regresses one.
    async fn publish(&self, id: HandleId, pid: u32, status: ProcessStatus) {
        let table = self.table.lock().await;
        let Some(entry) = table.get(&id) else {
            return;
        };
        if entry.status.borrow().is_terminal() {
            return;
        }
        let event = match &status {
            ProcessStatus::Ready => ProcessEvent::ready(id, pid),
            ProcessStatus::Running => ProcessEvent::running(id, pid),
            _ => return,
        };
        entry.status.send_replace(status);
        let _ = self.events.send(event);
    }
}

/// Exit-watcher task: owns the `Child`, reaps it, publishes the terminal
/// status, emits the event, and drops the table entry.
async fn watch_exit(
    mut child: Child,
    id: HandleId,
    pid: u32,
    status: Arc<watch::Sender<ProcessStatus>>,
    terminating: Arc<AtomicBool>,
    table: Arc<Mutex<HashMap<HandleId, Supervised>>>,
    events: broadcast::Sender<ProcessEvent>,
) {
    let result = child.wait().await;
    let next = match result {
        Ok(exit) if exit.success() => ProcessStatus::Exited(exit.code()),
        Ok(exit) if terminating.load(Ordering::SeqCst) => ProcessStatus::Exited(exit.code()),
        Ok(exit) => match exit.code() {
            Some(code) => ProcessStatus::Failed(format!("exited with code {code}")),
            None => ProcessStatus::Failed("terminated by signal".to_string()),
        },
        Err(e) => ProcessStatus::Failed(format!("wait failed: {e}")),
    };

    debug!(handle = %id, pid = %pid, status = %next, "Process exited");
    let event = match &next {
        ProcessStatus::Exited(code) => ProcessEvent::exited(id, pid, *code),
        ProcessStatus::Failed(reason) => ProcessEvent::failed(id, pid, reason.clone()),
        _ => unreachable!("exit-watcher only produces terminal states"),
    };

    // Status first, then the event: a subscriber reacting to the event must
    // already see the terminal status.
    status.send_replace(next);
    let _ = events.send(event);

    table.lock().await.remove(&id);
}

/// Wait up to `limit` for a terminal status; true if one was observed.
async fn wait_terminal(rx: &mut watch::Receiver<ProcessStatus>, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if rx.borrow_and_update().is_terminal() {
            return true;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return rx.borrow().is_terminal();
                }
            }
            () = tokio::time::sleep_until(deadline) => return false,
        }
    }
}

/// Resolve a program name to an executable path.
///
/// Bare names go through `PATH` lookup; anything with a path separator must
/// exist as given. Either way a missing executable is a launch error, not a
/// spawn-time surprise.
pub(crate) fn resolve_program(program: &str) -> Result<PathBuf, SupervisorError> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(SupervisorError::Launch {
                program: program.to_string(),
                reason: "executable not found".to_string(),
            })
        }
    } else {
        which::which(program).map_err(|e| SupervisorError::Launch {
            program: program.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Instant;

    struct FixedProbe(bool);

    #[async_trait]
    impl ReadinessProbe for FixedProbe {
        async fn check(&self) -> bool {
            self.0
        }
    }

    fn test_config() -> SupervisorConfig {
        SupervisorConfig {
            poll_interval: Duration::from_millis(20),
            kill_wait: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn start_with_missing_executable_is_a_launch_error() {
        let supervisor = ProcessSupervisor::new(test_config());
        let invocation = Invocation::new("definitely-not-a-real-binary-4af1");
        let err = supervisor.start(&invocation).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Launch { .. }));
    }

    #[tokio::test]
    async fn start_with_missing_path_is_a_launch_error() {
        let supervisor = ProcessSupervisor::new(test_config());
        let invocation = Invocation::new("/nonexistent/dir/server");
        let err = supervisor.start(&invocation).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Launch { .. }));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn failing_probe_times_out_at_or_after_the_budget() {
        let supervisor = ProcessSupervisor::new(test_config());
        let handle = supervisor
            .start(&Invocation::new("sleep").arg("30"))
            .await
            .unwrap();

        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let err = supervisor
            .await_ready(&handle, &FixedProbe(false), timeout)
            .await
            .unwrap_err();

        assert_eq!(err, SupervisorError::ReadinessTimeout { timeout });
        assert!(started.elapsed() >= timeout);
        // The process is left running for the caller to decide about.
        assert!(!handle.status().is_terminal());

        supervisor
            .terminate(&handle, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn succeeding_probe_publishes_ready() {
        let supervisor = ProcessSupervisor::new(test_config());
        let mut events = supervisor.subscribe();
        let handle = supervisor
            .start(&Invocation::new("sleep").arg("30"))
            .await
            .unwrap();

        supervisor
            .await_ready(&handle, &FixedProbe(true), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(handle.status(), ProcessStatus::Ready);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, ProcessEvent::Ready(_)));

        supervisor
            .terminate(&handle, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn exit_watcher_reports_crash_as_failed() {
        let supervisor = ProcessSupervisor::new(test_config());
        let handle = supervisor
            .start(&Invocation::new("sh").args(["-c", "exit 3"]))
            .await
            .unwrap();

        let status = handle.wait().await;
        assert_eq!(status, ProcessStatus::Failed("exited with code 3".to_string()));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn exit_watcher_reports_clean_exit() {
        let supervisor = ProcessSupervisor::new(test_config());
        let handle = supervisor
            .start(&Invocation::new("sh").args(["-c", "exit 0"]))
            .await
            .unwrap();

        let status = handle.wait().await;
        assert_eq!(status, ProcessStatus::Exited(Some(0)));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn await_ready_observes_early_exit() {
        let supervisor = ProcessSupervisor::new(test_config());
        let handle = supervisor
            .start(&Invocation::new("sh").args(["-c", "exit 7"]))
            .await
            .unwrap();

        let err = supervisor
            .await_ready(&handle, &FixedProbe(false), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::ExitedEarly { .. }));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn terminate_is_idempotent() {
        let supervisor = ProcessSupervisor::new(test_config());
        let handle = supervisor
            .start(&Invocation::new("sleep").arg("30"))
            .await
            .unwrap();

        supervisor
            .terminate(&handle, Duration::from_millis(200))
            .await
            .unwrap();
        let first = handle.wait().await;
        assert!(matches!(first, ProcessStatus::Exited(_)));

        // Second terminate on the exited handle is a no-op, same final state.
        supervisor
            .terminate(&handle, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(handle.status(), first);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn cancellation_interrupts_await_ready() {
        let supervisor = ProcessSupervisor::new(test_config());
        let handle = supervisor
            .start(&Invocation::new("sleep").arg("30"))
            .await
            .unwrap();

        let cancel = supervisor.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = supervisor
            .await_ready(&handle, &FixedProbe(false), Duration::from_secs(30))
            .await
            .unwrap_err();
        assert_eq!(err, SupervisorError::Cancelled);

        supervisor
            .terminate(&handle, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn stdin_close_ends_a_cat_child() {
        let supervisor = ProcessSupervisor::new(test_config());
        let handle = supervisor.start(&Invocation::new("cat")).await.unwrap();

        supervisor.write_line(handle.id(), "hello").await.unwrap();
        supervisor.close_stdin(handle.id()).await;

        let status = handle.wait().await;
        assert_eq!(status, ProcessStatus::Exited(Some(0)));

        // Writing after exit reports a broken pipe.
        let err = supervisor.write_line(handle.id(), "again").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
