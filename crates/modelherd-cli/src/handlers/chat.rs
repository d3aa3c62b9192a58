//! Chat command handler.
//!
//! Boots the server, binds an interactive chat client to it, and hands the
//! terminal to the user.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::handlers::common;

/// Execute the chat command for the given model.
pub async fn execute(ctx: &CliContext, model: &str) -> Result<()> {
    println!("Opening chat with model: {model}");
    common::run_interactive_session(ctx, "chat", model).await
}
