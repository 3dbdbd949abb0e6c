// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External converter processes: office documents and PDF/A.

pub mod discovery;
pub mod office;
pub mod pdfa;

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use blattwerk_core::error::{BlattwerkError, Result};
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

pub use office::{OFFICE_EXTENSIONS, office_to_pdf};
pub use pdfa::{PdfaLevel, pdf_to_pdfa};

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 400;

/// Run `program` with `args`, killing it if it outlives `budget`.
///
/// A non-zero exit or a timeout is a [`BlattwerkError::ToolExecution`]; a
/// binary that cannot be started is [`BlattwerkError::ToolUnavailable`].
#[instrument(skip_all, fields(program = %program.display(), budget_secs = budget.as_secs()))]
pub async fn run_tool(program: &Path, args: &[OsString], budget: Duration) -> Result<()> {
    let child = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(budget, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            error!(%err, "Failed to start tool");
            return Err(BlattwerkError::ToolUnavailable(format!(
                "could not start {}: {}",
                program.display(),
                err
            )));
        }
        Err(_) => {
            error!("Tool timed out");
            return Err(BlattwerkError::ToolExecution(format!(
                "{} did not finish within {} seconds",
                program.display(),
                budget.as_secs()
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
        error!(status = ?output.status.code(), stderr = %excerpt, "Tool exited with failure");
        return Err(BlattwerkError::ToolExecution(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            excerpt
        )));
    }

    debug!(stdout_len = output.stdout.len(), "Tool finished");
    info!("External tool run succeeded");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> (PathBuf, Vec<OsString>) {
        (PathBuf::from("/bin/sh"), vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn successful_run() {
        let (program, args) = sh("exit 0");
        run_tool(&program, &args, Duration::from_secs(10)).await.expect("run");
    }

    #[tokio::test]
    async fn failure_carries_stderr() {
        let (program, args) = sh("echo boom >&2; exit 3");
        let err = run_tool(&program, &args, Duration::from_secs(10)).await.err().expect("error");
        match err {
            BlattwerkError::ToolExecution(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn hang_is_a_reported_failure() {
        let (program, args) = sh("sleep 5");
        let err = run_tool(&program, &args, Duration::from_millis(100)).await.err().expect("error");
        assert!(matches!(err, BlattwerkError::ToolExecution(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let err = run_tool(Path::new("/nonexistent/blattwerk-tool"), &[], Duration::from_secs(1))
            .await
            .err()
            .expect("error");
        assert!(matches!(err, BlattwerkError::ToolUnavailable(_)));
    }
}
