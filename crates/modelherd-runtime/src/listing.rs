//! Run a registered list invocation and parse the models it reports.

use anyhow::{Result, anyhow};
use modelherd_core::{Invocation, ModelDescriptor};
use tokio::process::Command;
use tracing::debug;

use crate::supervisor::resolve_program;

/// Run `invocation` to completion and parse its stdout into descriptors.
///
/// One model per line: whitespace-separated name plus optional size token;
/// malformed lines are skipped, not fatal. See [`ModelDescriptor`] for the
/// full line format.
///
/// # Errors
///
/// Fails if the executable cannot be resolved, the process cannot be
/// spawned, or it exits with a non-zero status.
pub async fn list_models(invocation: &Invocation) -> Result<Vec<ModelDescriptor>> {
    let program = resolve_program(invocation.program())?;

    let mut cmd = Command::new(&program);
    cmd.args(invocation.arg_list());
    if let Some(dir) = invocation.working_dir() {
        cmd.current_dir(dir);
    }
    cmd.envs(invocation.env_overrides());

    debug!(invocation = %invocation, "Running list invocation");
    let output = cmd
        .output()
        .await
        .map_err(|e| anyhow!("failed to run `{}`: {}", invocation, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "list invocation exited with {:?}: {}",
            output.status.code(),
            stderr.trim()
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let descriptors = ModelDescriptor::parse_listing(&stdout);
    debug!(count = descriptors.len(), "Parsed model listing");
    Ok(descriptors)
}
