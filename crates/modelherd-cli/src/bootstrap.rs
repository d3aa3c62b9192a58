//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together for
//! the CLI adapter: configuration, the command registry, the process
//! supervisor, and the session controller. Command handlers receive the
//! fully-composed context and delegate work to it.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use modelherd_core::{CommandRegistry, InvocationTemplate};
use modelherd_runtime::{ProcessSupervisor, SessionController, SupervisorConfig};

use crate::sink::ConsoleOutputSink;

/// Default ollama-compatible runtime binary, resolved via `PATH`.
const DEFAULT_RUNTIME: &str = "ollama";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 11434;
const DEFAULT_READY_TIMEOUT_SECS: u64 = 120;
const DEFAULT_GRACE_TIMEOUT_SECS: u64 = 5;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Runtime binary driving serve/chat/list/run/pull (name or path).
    pub runtime_bin: String,
    /// Host the supervised server listens on.
    pub host: String,
    /// Port the supervised server listens on.
    pub port: u16,
    /// Budget for the server readiness probe.
    pub ready_timeout: Duration,
    /// Grace period before a stop escalates to a forced kill.
    pub grace_timeout: Duration,
}

impl CliConfig {
    /// Create config with defaults, honoring `MODELHERD_*` overrides.
    pub fn with_defaults() -> Result<Self> {
        let runtime_bin =
            env::var("MODELHERD_RUNTIME").unwrap_or_else(|_| DEFAULT_RUNTIME.to_string());
        let host = env::var("MODELHERD_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("MODELHERD_PORT") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("invalid MODELHERD_PORT: {value}"))?,
            Err(_) => DEFAULT_PORT,
        };
        Ok(Self {
            runtime_bin,
            host,
            port,
            ready_timeout: duration_env("MODELHERD_READY_TIMEOUT_SECS", DEFAULT_READY_TIMEOUT_SECS)?,
            grace_timeout: duration_env("MODELHERD_GRACE_TIMEOUT_SECS", DEFAULT_GRACE_TIMEOUT_SECS)?,
        })
    }

    /// Base URL of the supervised server, used by the readiness probe.
    pub fn probe_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// Listen address handed to the runtime via its environment.
    fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn duration_env(key: &str, default_secs: u64) -> Result<Duration> {
    let secs = match env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("invalid {key}: {value}"))?,
        Err(_) => default_secs,
    };
    Ok(Duration::from_secs(secs))
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// Bootstrap configuration.
    pub config: CliConfig,
    /// Action-to-invocation mapping.
    pub registry: CommandRegistry,
    /// Owner of all supervised processes.
    pub supervisor: Arc<ProcessSupervisor>,
    /// Manager for interactive client sessions.
    pub sessions: SessionController,
    /// Console sink receiving child output.
    pub sink: Arc<ConsoleOutputSink>,
}

/// Wire up the registry and runtime for the CLI.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let sink = Arc::new(ConsoleOutputSink::new());
    let supervisor = Arc::new(ProcessSupervisor::with_output_sink(
        SupervisorConfig::default(),
        sink.clone(),
    ));
    let sessions = SessionController::new(supervisor.clone());
    let registry = build_registry(&config)?;
    Ok(CliContext {
        config,
        registry,
        supervisor,
        sessions,
        sink,
    })
}

/// Build the action registry for an ollama-style runtime binary.
///
/// The templates follow the CLI convention of the runtime the original tool
/// drives; `--runtime` or `MODELHERD_RUNTIME` points them at any compatible
/// binary.
fn build_registry(config: &CliConfig) -> Result<CommandRegistry> {
    let bin = config.runtime_bin.as_str();
    let addr = config.server_addr();
    let mut registry = CommandRegistry::new();

    let mut serve = InvocationTemplate::new(bin)
        .arg("serve")
        .env("OLLAMA_HOST", addr.as_str());
    // The server runs from the binary's directory when a path was given.
    if let Some(parent) = Path::new(bin).parent().filter(|p| !p.as_os_str().is_empty()) {
        serve = serve.current_dir(parent);
    }
    registry.register("serve", serve)?;

    registry.register(
        "chat",
        InvocationTemplate::new(bin)
            .args(["chat", "--model", "{model}"])
            .env("OLLAMA_HOST", addr.as_str()),
    )?;
    registry.register(
        "list-models",
        InvocationTemplate::new(bin)
            .arg("list")
            .env("OLLAMA_HOST", addr.as_str()),
    )?;
    registry.register(
        "run-model",
        InvocationTemplate::new(bin)
            .args(["run", "{model}"])
            .env("OLLAMA_HOST", addr.as_str()),
    )?;
    registry.register(
        "pull",
        InvocationTemplate::new(bin)
            .args(["pull", "{model}"])
            .env("OLLAMA_HOST", addr.as_str()),
    )?;

    Ok(registry)
}
