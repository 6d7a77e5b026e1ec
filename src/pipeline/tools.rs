//! Running external converters (pandoc, java) as child processes.

use crate::error::StageError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Longest stderr tail written to the log.
const MAX_STDERR_LOGGED: usize = 400;

/// Run `program` with `args`, optionally feeding `stdin`, and return its
/// stdout.
///
/// A non-zero exit becomes [`StageError::Tool`] carrying only the exit
/// status. Tools echo their arguments (jar, source and output paths) on
/// stderr, so the stderr tail goes to the log and never into the error.
pub async fn run_tool<I, S>(
    tool: &'static str,
    program: &Path,
    args: I,
    stdin: Option<Vec<u8>>,
) -> Result<Vec<u8>, StageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(tool, "Spawning external tool");
    let mut child = cmd.spawn().map_err(|e| StageError::Tool {
        tool,
        detail: match e.kind() {
            std::io::ErrorKind::NotFound => "program not found".to_string(),
            _ => format!("could not start: {}", e.kind()),
        },
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(&input).await?;
        pipe.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        warn!(
            tool,
            status = ?output.status.code(),
            stderr = %stderr_tail(&output.stderr),
            "External tool failed"
        );
        return Err(StageError::Tool {
            tool,
            detail: exit_detail(output.status.code()),
        });
    }
    Ok(output.stdout)
}

fn exit_detail(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with status {c}"),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(MAX_STDERR_LOGGED - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    trimmed[start..].to_string()
}
