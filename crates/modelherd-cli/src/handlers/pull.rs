//! Pull command handler.
//!
//! Runs the registered pull invocation against a ready server, streaming
//! its progress output to the terminal.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use modelherd_core::ProcessStatus;

use crate::bootstrap::CliContext;
use crate::handlers::common;

/// Execute the pull command for the given model.
pub async fn execute(ctx: &CliContext, model: &str) -> Result<()> {
    let server = common::boot_server(ctx).await?;

    let params = HashMap::from([("model".to_string(), model.to_string())]);
    let invocation = match ctx.registry.resolve("pull", &params) {
        Ok(invocation) => invocation,
        Err(e) => {
            common::stop_server(ctx, &server).await;
            return Err(e.into());
        }
    };

    println!("Pulling model: {model}");
    let binding = match ctx.sessions.open_session(&invocation, &server).await {
        Ok(binding) => binding,
        Err(e) => {
            common::stop_server(ctx, &server).await;
            return Err(e.into());
        }
    };
    ctx.sink.echo(binding.client().id());

    let status = binding.client().wait().await;
    ctx.sink.mute(binding.client().id());
    ctx.sessions.close(&binding).await;
    common::stop_server(ctx, &server).await;

    match status {
        ProcessStatus::Exited(_) => {
            println!("Pull complete.");
            Ok(())
        }
        other => Err(anyhow!("pull did not complete: {other}")),
    }
}
