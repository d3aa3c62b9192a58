//! End-to-end lifecycle tests: supervisor, readiness, sessions, teardown.

#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use modelherd_core::events::ProcessEvent;
use modelherd_core::ports::ReadinessProbe;
use modelherd_core::{Invocation, ProcessStatus};
use modelherd_runtime::{ProcessSupervisor, SessionController, SupervisorConfig, TcpProbe};

/// Probe that starts succeeding after a fixed number of attempts.
struct ReadyAfter {
    calls: AtomicUsize,
    threshold: usize,
}

impl ReadyAfter {
    fn new(threshold: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            threshold,
        }
    }
}

#[async_trait]
impl ReadinessProbe for ReadyAfter {
    async fn check(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.threshold
    }
}

fn supervisor() -> Arc<ProcessSupervisor> {
    Arc::new(ProcessSupervisor::new(SupervisorConfig {
        poll_interval: Duration::from_millis(20),
        kill_wait: Duration::from_secs(2),
    }))
}

#[tokio::test]
async fn server_becomes_ready_after_repeated_probing() {
    let supervisor = supervisor();
    let server = supervisor
        .start(&Invocation::new("sleep").arg("30"))
        .await
        .unwrap();
    assert_eq!(server.status(), ProcessStatus::Starting);

    let probe = ReadyAfter::new(3);
    supervisor
        .await_ready(&server, &probe, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(server.status(), ProcessStatus::Ready);
    assert!(probe.calls.load(Ordering::SeqCst) >= 3);

    supervisor
        .terminate(&server, Duration::from_millis(200))
        .await
        .unwrap();
    assert!(server.status().is_terminal());
}

#[tokio::test]
async fn tcp_probe_confirms_readiness_of_a_listening_port() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let supervisor = supervisor();
    let server = supervisor
        .start(&Invocation::new("sleep").arg("30"))
        .await
        .unwrap();

    let probe = TcpProbe::new(addr);
    supervisor
        .await_ready(&server, &probe, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(server.status().is_available());

    supervisor
        .terminate(&server, Duration::from_millis(200))
        .await
        .unwrap();
}

#[tokio::test]
async fn full_session_flow_with_ordered_teardown() {
    let supervisor = supervisor();
    let mut events = supervisor.subscribe();
    let controller = SessionController::new(supervisor.clone());

    let server = supervisor
        .start(&Invocation::new("sleep").arg("30"))
        .await
        .unwrap();
    supervisor
        .await_ready(&server, &ReadyAfter::new(1), Duration::from_secs(5))
        .await
        .unwrap();

    let first = controller
        .open_session(&Invocation::new("cat"), &server)
        .await
        .unwrap();
    assert_eq!(server.status(), ProcessStatus::Running);
    let second = controller
        .open_session(&Invocation::new("cat"), &server)
        .await
        .unwrap();

    controller.send(&first, "hello from one").await.unwrap();
    controller.send(&second, "hello from two").await.unwrap();

    // Kill the server out from under the sessions.
    supervisor
        .terminate(&server, Duration::from_millis(200))
        .await
        .unwrap();

    // Both sessions are closed by the teardown watcher.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !(first.is_closed() && second.is_closed()) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "sessions were not torn down"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(controller.send(&first, "late").await.is_err());
    assert!(controller.send(&second, "late").await.is_err());

    // The event stream saw readiness, running, and the server's exit.
    let mut saw_ready = false;
    let mut saw_running = false;
    let mut saw_server_exit = false;
    while let Ok(event) = events.try_recv() {
        match event {
            ProcessEvent::Ready(info) if info.handle == server.id() => saw_ready = true,
            ProcessEvent::Running(info) if info.handle == server.id() => saw_running = true,
            ProcessEvent::Exited(info) | ProcessEvent::Failed(info)
                if info.handle == server.id() =>
            {
                saw_server_exit = true;
            }
            _ => {}
        }
    }
    assert!(saw_ready && saw_running && saw_server_exit);
}
