//! Thin wrapper over `tokio::process` for short-lived tool invocations.

use crate::error::{ToolError, ToolResult};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished command
#[derive(Debug)]
pub(crate) struct Captured {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    /// Turn an unsuccessful exit into [`ToolError::Exit`]
    pub fn into_stdout(self, program: &Path) -> ToolResult<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(ToolError::Exit {
                program: program.display().to_string(),
                status: self.status,
                detail: first_non_empty(&self.stderr, &self.stdout),
            })
        }
    }
}

/// Run `program` to completion, whatever its exit status
pub(crate) async fn capture<I, S>(program: &Path, args: I) -> ToolResult<Captured>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(command = ?command.as_std(), "running tool");

    let output = command.output().await.map_err(|source| ToolError::Launch {
        program: program.display().to_string(),
        source,
    })?;

    Ok(Captured {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn first_non_empty(a: &str, b: &str) -> String {
    let a = a.trim();
    if a.is_empty() {
        b.trim().to_string()
    } else {
        a.to_string()
    }
}
