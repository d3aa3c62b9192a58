//! Dependent interactive client sessions bound to a supervised server.
//!
//! A session's useful lifetime is bounded by the human driving it and by
//! the server it talks to. The controller never touches OS processes
//! directly: clients are spawned, fed, and stopped through the supervisor,
//! which keeps the process table single-owner.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use modelherd_core::{HandleId, Invocation, SessionError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::supervisor::{ProcessHandle, ProcessSupervisor};

/// How long `close` waits for the client to flush and exit on its own.
const CLOSE_FLUSH_WAIT: Duration = Duration::from_secs(2);

/// Grace given to a force-terminated client before the hard kill.
const CLOSE_TERM_GRACE: Duration = Duration::from_secs(1);

/// Relation between a client session and the server it depends on.
///
/// A binding never outlives its server in a serving state: when the server
/// exits, the controller closes every dependent binding, in the order the
/// bindings were opened.
#[derive(Clone, Debug)]
pub struct SessionBinding {
    client: ProcessHandle,
    server: HandleId,
    closed: Arc<AtomicBool>,
}

impl SessionBinding {
    /// Handle of the client process.
    pub fn client(&self) -> &ProcessHandle {
        &self.client
    }

    /// Id of the server this session is bound to.
    pub const fn server(&self) -> HandleId {
        self.server
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Per-controller bookkeeping: bindings per server, in open order.
#[derive(Default)]
struct ControllerState {
    by_server: HashMap<HandleId, Vec<SessionBinding>>,
}

/// Manager for interactive client processes bound to supervised servers.
#[derive(Clone)]
pub struct SessionController {
    supervisor: Arc<ProcessSupervisor>,
    state: Arc<Mutex<ControllerState>>,
}

impl SessionController {
    /// Create a controller that spawns clients through `supervisor`.
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self {
            supervisor,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    /// Open a client session bound to a ready server.
    ///
    /// # Errors
    ///
    /// - [`SessionError::DependencyNotReady`] if the server is not in
    ///   `Ready`/`Running` state.
    /// - [`SessionError::Supervisor`] if spawning the client fails.
    pub async fn open_session(
        &self,
        invocation: &Invocation,
        server: &ProcessHandle,
    ) -> Result<SessionBinding, SessionError> {
        let status = server.status();
        if !status.is_available() {
            return Err(SessionError::DependencyNotReady { status });
        }

        let client = self.supervisor.start(invocation).await?;
        let binding = SessionBinding {
            client,
            server: server.id(),
            closed: Arc::new(AtomicBool::new(false)),
        };

        let watch_needed = {
            let mut state = self.state.lock().await;
            let bindings = state.by_server.entry(server.id()).or_default();
            bindings.push(binding.clone());
            bindings.len() == 1
        };
        if watch_needed {
            tokio::spawn(watch_server(self.clone(), server.clone()));
        }

        // The server may have died between the availability check and the
        // registration above; a binding must not outlive a serving server.
        let status = server.status();
        if status.is_terminal() {
            self.close(&binding).await;
            return Err(SessionError::DependencyNotReady { status });
        }

        self.supervisor.mark_running(server).await;
        info!(
            server = %server.id(),
            client = %binding.client.id(),
            "Opened session"
        );
        Ok(binding)
    }

    /// Forward a line of text to the session's standard input.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionClosed`] if the session was closed or
    /// the client has exited.
    pub async fn send(&self, binding: &SessionBinding, line: &str) -> Result<(), SessionError> {
        if binding.is_closed() || binding.client.status().is_terminal() {
            return Err(SessionError::SessionClosed);
        }
        self.supervisor
            .write_line(binding.client.id(), line)
            .await
            .map_err(|e| {
                debug!(client = %binding.client.id(), error = %e, "Session input write failed");
                binding.closed.store(true, Ordering::SeqCst);
                SessionError::SessionClosed
            })
    }

    /// Close a session: end input, wait briefly, then force-terminate.
    ///
    /// Best-effort; always succeeds. Closing an already-closed session is a
    /// no-op.
    pub async fn close(&self, binding: &SessionBinding) {
        if binding.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let client = &binding.client;
        debug!(client = %client.id(), "Closing session");
        self.supervisor.close_stdin(client.id()).await;

        let exited = tokio::time::timeout(CLOSE_FLUSH_WAIT, client.wait()).await.is_ok();
        if !exited {
            if let Err(e) = self.supervisor.terminate(client, CLOSE_TERM_GRACE).await {
                warn!(client = %client.id(), error = %e, "Session client did not stop cleanly");
            }
        }
    }
}

/// Watches a server handle and closes its dependent sessions on exit.
///
/// Spawned once per server, on the first binding.
async fn watch_server(controller: SessionController, server: ProcessHandle) {
    let status = server.wait().await;
    let bindings = {
        let mut state = controller.state.lock().await;
        state.by_server.remove(&server.id()).unwrap_or_default()
    };
    if bindings.is_empty() {
        return;
    }

    info!(
        server = %server.id(),
        status = %status,
        sessions = bindings.len(),
        "Server exited, closing dependent sessions"
    );
    // Close in binding order.
    for binding in &bindings {
        controller.close(binding).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::SupervisorConfig;
    use modelherd_core::{ProcessStatus, SupervisorError};

    fn controller() -> (Arc<ProcessSupervisor>, SessionController) {
        let supervisor = Arc::new(ProcessSupervisor::new(SupervisorConfig {
            poll_interval: Duration::from_millis(20),
            kill_wait: Duration::from_secs(2),
        }));
        let controller = SessionController::new(supervisor.clone());
        (supervisor, controller)
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn open_session_requires_available_server() {
        let (supervisor, controller) = controller();
        let server = supervisor
            .start(&Invocation::new("sleep").arg("30"))
            .await
            .unwrap();

        // Server is still Starting: no probe has confirmed readiness.
        let err = controller
            .open_session(&Invocation::new("cat"), &server)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::DependencyNotReady { .. }));

        supervisor
            .terminate(&server, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn send_reaches_the_client_and_close_is_idempotent() {
        let (supervisor, controller) = controller();
        let server = ready_server(&supervisor).await;

        let binding = controller
            .open_session(&Invocation::new("cat"), &server)
            .await
            .unwrap();
        assert_eq!(server.status(), ProcessStatus::Running);

        controller.send(&binding, "hello").await.unwrap();
        controller.close(&binding).await;
        controller.close(&binding).await;

        let err = controller.send(&binding, "again").await.unwrap_err();
        assert_eq!(err, SessionError::SessionClosed);

        supervisor
            .terminate(&server, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn open_session_fails_when_client_cannot_launch() {
        let (supervisor, controller) = controller();
        let server = ready_server(&supervisor).await;

        let err = controller
            .open_session(&Invocation::new("no-such-client-bin-77"), &server)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Supervisor(SupervisorError::Launch { .. })
        ));

        supervisor
            .terminate(&server, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn server_exit_closes_all_bound_sessions() {
        let (supervisor, controller) = controller();
        let server = ready_server(&supervisor).await;

        let first = controller
            .open_session(&Invocation::new("cat"), &server)
            .await
            .unwrap();
        let second = controller
            .open_session(&Invocation::new("cat"), &server)
            .await
            .unwrap();
        let third = controller
            .open_session(&Invocation::new("cat"), &server)
            .await
            .unwrap();

        supervisor
            .terminate(&server, Duration::from_millis(200))
            .await
            .unwrap();

        // The teardown watcher runs asynchronously after the exit event.
        for binding in [&first, &second, &third] {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
            while !binding.is_closed() {
                assert!(tokio::time::Instant::now() < deadline, "session not closed");
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            let err = controller.send(binding, "late").await.unwrap_err();
            assert_eq!(err, SessionError::SessionClosed);
        }
    }

    /// Start a long-lived child and mark it ready via an always-true probe.
    async fn ready_server(supervisor: &Arc<ProcessSupervisor>) -> ProcessHandle {
        use async_trait::async_trait;
        use modelherd_core::ports::ReadinessProbe;

        struct AlwaysReady;

        #[async_trait]
        impl ReadinessProbe for AlwaysReady {
            async fn check(&self) -> bool {
                true
            }
        }

        let server = supervisor
            .start(&Invocation::new("sleep").arg("30"))
            .await
            .unwrap();
        supervisor
            .await_ready(&server, &AlwaysReady, Duration::from_secs(5))
            .await
            .unwrap();
        server
    }
}
