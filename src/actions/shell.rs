use std::process::{Command, Stdio};

/// Start `cmd` through the platform shell without waiting for it. The child
/// is reaped on a background thread once it exits.
pub fn spawn_detached(cmd: &str) -> anyhow::Result<()> {
    let mut command = shell_command(cmd);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let mut child = command.spawn()?;
    let pid = child.id();
    tracing::debug!(pid, cmd = %cmd, "spawned shell command");
    std::thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "shell command exited"),
            Err(err) => tracing::warn!(pid, ?err, "failed to wait for shell command"),
        })?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn shell_command(cmd: &str) -> Command {
    let mut c = Command::new("cmd");
    c.arg("/C").arg(cmd);
    c
}

#[cfg(not(target_os = "windows"))]
fn shell_command(cmd: &str) -> Command {
    let mut c = Command::new("sh");
    c.arg("-c").arg(cmd);
    c
}
