//! Bundled readiness probe implementations.
//!
//! The supervisor treats probes as opaque; these are the two checks most
//! model runtimes need. Callers with other notions of "ready" implement
//! [`ReadinessProbe`] themselves.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use modelherd_core::ports::ReadinessProbe;
use tokio::net::TcpStream;
use tracing::debug;

/// Timeout for a single probe attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Readiness probe that attempts a TCP connect.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: SocketAddr,
}

impl TcpProbe {
    /// Probe the given listening address.
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl ReadinessProbe for TcpProbe {
    async fn check(&self) -> bool {
        match tokio::time::timeout(ATTEMPT_TIMEOUT, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "TCP probe failed");
                false
            }
            Err(_) => {
                debug!(addr = %self.addr, "TCP probe timed out");
                false
            }
        }
    }
}

/// Readiness probe that issues an HTTP GET and expects a success status.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Probe the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    debug!(url = %self.url, status = %response.status(), "HTTP probe returned non-success");
                }
                ok
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "HTTP probe failed");
                false
            }
        }
    }
}
