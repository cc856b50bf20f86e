//! Launching the external process and waiting for it.

use std::{process::Stdio, time::Duration};

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, Stage, WrapError};

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs `argv` to completion without inspecting the exit status.
///
/// When `timeout` elapses the child is killed and `ProcessTimeout` is returned.
pub async fn launch(argv: &[String], timeout: Option<Duration>) -> Result<ProcessOutput> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        WrapError::io(
            Stage::Run,
            "launching process",
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument list"),
        )
    })?;
    debug!(program = %program, ?args, "launching");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| WrapError::io(Stage::Run, format!("spawning '{program}'"), e))?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let waited = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| WrapError::ProcessTimeout {
                program: program.clone(),
                timeout: limit,
            })?,
        None => child.wait_with_output().await,
    };
    let output = waited.map_err(|e| WrapError::io(Stage::Run, format!("waiting for '{program}'"), e))?;

    let result = ProcessOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(program = %program, code = ?result.code, "finished");
    Ok(result)
}

/// Like [`launch`], but a non-zero exit becomes `ProcessFailed` carrying stderr.
pub async fn run(argv: &[String], timeout: Option<Duration>) -> Result<ProcessOutput> {
    let output = launch(argv, timeout).await?;
    check(argv, output)
}

pub(crate) fn check(argv: &[String], output: ProcessOutput) -> Result<ProcessOutput> {
    if output.success() {
        return Ok(output);
    }
    Err(WrapError::ProcessFailed {
        program: argv.first().cloned().unwrap_or_default(),
        code: output.code,
        stderr: output.stderr.trim().to_string(),
    })
}
