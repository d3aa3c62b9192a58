//! Serve command handler.
//!
//! Boots the supervised model server and keeps it alive until Ctrl+C or an
//! unexpected server exit.

use anyhow::{Result, anyhow};

use crate::bootstrap::CliContext;
use crate::handlers::common;

/// Execute the serve command.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let server = common::boot_server(ctx).await?;
    println!(
        "Model server running (pid {}). Press Ctrl+C to stop.",
        server.pid()
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
            common::stop_server(ctx, &server).await;
            Ok(())
        }
        status = server.wait() => {
            Err(anyhow!("model server stopped unexpectedly: {status}"))
        }
    }
}
