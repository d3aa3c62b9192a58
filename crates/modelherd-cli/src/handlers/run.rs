//! Run-model command handler.
//!
//! Like chat, but through the runtime's `run` entry point.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::handlers::common;

/// Execute the run-model command for the given model.
pub async fn execute(ctx: &CliContext, name: &str) -> Result<()> {
    println!("Running model: {name}");
    common::run_interactive_session(ctx, "run-model", name).await
}
