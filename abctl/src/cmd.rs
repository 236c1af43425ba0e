//! Thin helpers for running external tools (kind, helm, docker)

use crate::error::{CommandFailedSnafu, CommandSpawnSnafu, Result};
use snafu::ResultExt;
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Render a command line for error messages and debug logs
fn describe(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    let mut parts = vec![std_cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(
        std_cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned()),
    );
    parts.join(" ")
}

/// Run a command to completion and return its stdout.
///
/// `stdin` is piped to the child when provided. The child is killed if the
/// returned future is dropped.
pub async fn run(cmd: &mut Command, stdin: Option<&str>) -> Result<String> {
    let command = describe(cmd);
    tracing::debug!(%command, "running");

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);

    let mut child = cmd.spawn().context(CommandSpawnSnafu { command: &command })?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            match pipe.write_all(input.as_bytes()).await {
                Ok(()) => {}
                // child exited before reading all of its input
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!(%command, "child closed stdin early");
                }
                Err(err) => return Err(err).context(CommandSpawnSnafu { command: &command }),
            }
            // Closing stdin lets the child see EOF.
            drop(pipe);
        }
    }

    let output = child
        .wait_with_output()
        .await
        .context(CommandSpawnSnafu { command: &command })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return CommandFailedSnafu {
            command,
            message: if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            },
        }
        .fail();
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
