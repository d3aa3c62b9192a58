//! Readiness probe trait definition.

use async_trait::async_trait;

/// Externally supplied check determining whether a started process is
/// accepting requests.
///
/// The supervisor only calls the probe and interprets the boolean outcome;
/// what "ready" means (a TCP connect, an HTTP health check, a file showing
/// up) is entirely the caller's business. Implementations should return
/// promptly — the supervisor bounds the overall wait, not a single call.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Perform one readiness check.
    async fn check(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        calls: AtomicUsize,
        ready_after: usize,
    }

    #[async_trait]
    impl ReadinessProbe for CountingProbe {
        async fn check(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_after
        }
    }

    #[tokio::test]
    async fn probe_is_object_safe() {
        let probe: Box<dyn ReadinessProbe> = Box::new(CountingProbe {
            calls: AtomicUsize::new(0),
            ready_after: 2,
        });
        assert!(!probe.check().await);
        assert!(probe.check().await);
    }
}
