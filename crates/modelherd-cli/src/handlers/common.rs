//! Shared handler plumbing: server startup/teardown and interactive loops.

use std::collections::HashMap;

use anyhow::Result;
use modelherd_core::SupervisorError;
use modelherd_runtime::{HttpProbe, ProcessHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::bootstrap::CliContext;

/// Resolve the serve action, start the server, and wait for readiness.
///
/// On a readiness timeout the server is stopped before the error is
/// returned.
pub async fn boot_server(ctx: &CliContext) -> Result<ProcessHandle> {
    let invocation = ctx.registry.resolve("serve", &HashMap::new())?;
    println!("Starting model server: {invocation}");
    let server = ctx.supervisor.start(&invocation).await?;

    let probe_url = ctx.config.probe_url();
    println!("Waiting for the server at {probe_url} ...");
    let probe = HttpProbe::new(probe_url);
    match ctx
        .supervisor
        .await_ready(&server, &probe, ctx.config.ready_timeout)
        .await
    {
        Ok(()) => {
            println!("Server is ready.");
            Ok(server)
        }
        Err(err @ SupervisorError::ReadinessTimeout { .. }) => {
            warn!("Server did not become ready, stopping it");
            stop_server(ctx, &server).await;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Stop a supervised server, logging rather than failing on trouble.
pub async fn stop_server(ctx: &CliContext, server: &ProcessHandle) {
    println!("Stopping model server...");
    if let Err(e) = ctx
        .supervisor
        .terminate(server, ctx.config.grace_timeout)
        .await
    {
        warn!(error = %e, "Server did not stop cleanly, it may be orphaned");
        eprintln!("warning: {e}");
    }
}

/// Boot a server, open a session for `action` on `model`, and forward
/// terminal input to it until EOF, Ctrl+C, or client exit.
pub async fn run_interactive_session(ctx: &CliContext, action: &str, model: &str) -> Result<()> {
    let server = boot_server(ctx).await?;

    let params = HashMap::from([("model".to_string(), model.to_string())]);
    let invocation = match ctx.registry.resolve(action, &params) {
        Ok(invocation) => invocation,
        Err(e) => {
            stop_server(ctx, &server).await;
            return Err(e.into());
        }
    };

    let binding = match ctx.sessions.open_session(&invocation, &server).await {
        Ok(binding) => binding,
        Err(e) => {
            stop_server(ctx, &server).await;
            return Err(e.into());
        }
    };
    ctx.sink.echo(binding.client().id());
    println!("Session ready. Type a line to send it; Ctrl+D ends the session.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Err(e) = ctx.sessions.send(&binding, &line).await {
                        println!("{e}");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read terminal input");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            status = binding.client().wait() => {
                println!("Client exited ({status}).");
                break;
            }
        }
    }

    ctx.sink.mute(binding.client().id());
    ctx.sessions.close(&binding).await;
    stop_server(ctx, &server).await;
    Ok(())
}
