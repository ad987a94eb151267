//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Run a user hook through the platform shell with extra environment
///
/// Fails if the hook cannot be spawned or exits unsuccessfully.
pub async fn run_hook(command: &str, env: &[(&str, &str)]) -> Result<()> {
    let mut shell = shell_command(command);
    shell.envs(env.iter().copied()).kill_on_drop(true);

    debug!("Running hook: {}", command);
    let status = shell
        .status()
        .await
        .with_context(|| format!("Failed to spawn hook '{}'", command))?;

    if !status.success() {
        anyhow::bail!("Hook '{}' exited with {}", command, status);
    }
    Ok(())
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut shell = Command::new("sh");
    shell.arg("-c").arg(command);
    shell
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut shell = Command::new("cmd");
    shell.arg("/C").arg(command);
    shell
}
