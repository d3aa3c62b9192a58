//! List-models command handler.
//!
//! Boots the server, runs the registered list invocation to completion, and
//! prints the parsed models in a table.

use std::collections::HashMap;

use anyhow::Result;
use modelherd_runtime::list_models;

use crate::bootstrap::CliContext;
use crate::handlers::common;

/// Execute the list-models command.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let server = common::boot_server(ctx).await?;

    let invocation = match ctx.registry.resolve("list-models", &HashMap::new()) {
        Ok(invocation) => invocation,
        Err(e) => {
            common::stop_server(ctx, &server).await;
            return Err(e.into());
        }
    };
    let result = list_models(&invocation).await;
    common::stop_server(ctx, &server).await;

    let models = result?;
    if models.is_empty() {
        println!("No models reported by the runtime.");
        println!("Use 'modelherd pull <model>' to fetch one.");
        return Ok(());
    }

    println!("Found {} model(s):\n", models.len());
    println!("{:<40} Size", "Name");
    println!("{}", "-".repeat(52));
    for model in models {
        println!(
            "{:<40} {}",
            model.name,
            model.size.as_deref().unwrap_or("--")
        );
    }

    Ok(())
}
