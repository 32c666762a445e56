//! Shell execution seam.
//!
//! The host exposes one unconfined "run a shell command" primitive;
//! [`ShellRunner`] is the shipped implementation. Plugins that need to
//! restrict execution do not replace the runner - they implement
//! [`ExecPolicy`], which the host consults before every arbitrary-shell
//! invocation. A policy may pass the request through, rewrite it (for
//! example into a sandboxed command line), or refuse it outright, in which
//! case nothing is executed and the refusal message is shown to the user.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Default timeout for command execution.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum bytes of stdout/stderr kept per stream.
const MAX_CAPTURE: usize = 1024 * 1024;

// ============================================================================
// Request / output
// ============================================================================

/// A shell command the host has been asked to run.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ExecRequest {
    /// The command line, passed verbatim to `sh -c`.
    pub command: String,

    /// Working directory for the command.
    pub cwd: PathBuf,

    /// Optional timeout; the runner applies its 30 second default if absent.
    pub timeout: Option<Duration>,
}

impl ExecRequest {
    /// Create a request with the default timeout.
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            timeout: None,
        }
    }

    /// Set an explicit timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the command line, keeping cwd and timeout.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }
}

/// Captured result of a completed command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Captured stdout, truncated past the capture limit.
    pub stdout: String,

    /// Captured stderr, truncated past the capture limit.
    pub stderr: String,

    /// Exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,

    /// Whether the process exited with status zero.
    pub success: bool,
}

/// Errors from the execution machinery itself.
///
/// A command that runs and exits non-zero is not an error; its status is
/// reported through [`ExecOutput`] so callers always see the output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecError {
    /// The command did not finish within its timeout.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// The command could not be started.
    #[error("failed to spawn command: {0}")]
    Spawn(String),
}

// ============================================================================
// Runner
// ============================================================================

/// The host's unconfined shell-execution primitive.
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run a command and capture its output.
    async fn run(&self, request: ExecRequest) -> Result<ExecOutput, ExecError>;
}

/// Default runner: `sh -c <command>` with piped stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, request: ExecRequest) -> Result<ExecOutput, ExecError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&request.command);
        cmd.current_dir(&request.cwd);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let limit = request.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let output = timeout(limit, cmd.output())
            .await
            .map_err(|_| ExecError::Timeout(limit))?
            .map_err(|e| ExecError::Spawn(e.to_string()))?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let mut stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stdout.len() > MAX_CAPTURE {
            stdout.truncate(MAX_CAPTURE);
            stdout.push_str("\n... (stdout truncated)");
        }
        if stderr.len() > MAX_CAPTURE {
            stderr.truncate(MAX_CAPTURE);
            stderr.push_str("\n... (stderr truncated)");
        }

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        })
    }
}

// ============================================================================
// Policy
// ============================================================================

/// What a policy decided to do with a pending execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecDisposition {
    /// Execute this request - possibly a rewritten form of the original.
    Run(ExecRequest),

    /// Execute nothing; show the message to the user instead.
    Refuse {
        /// Explanation shown in place of command output.
        message: String,
    },
}

/// Per-command override consulted before every arbitrary-shell execution.
#[async_trait]
pub trait ExecPolicy: Send + Sync + fmt::Debug {
    /// Decide whether (and in what form) the request may run.
    async fn prepare(&self, request: &ExecRequest) -> Result<ExecDisposition, ExecError>;
}

/// Result of a policy-mediated execution.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// The command ran; here is what it produced.
    Completed(ExecOutput),

    /// The policy refused; nothing was executed.
    Refused {
        /// Explanation shown in place of command output.
        message: String,
    },
}

/// Consult `policy`, then either run the (possibly rewritten) request on
/// `runner` or return the refusal without spawning anything.
pub async fn run_with_policy(
    policy: &dyn ExecPolicy,
    runner: &dyn CommandRunner,
    request: ExecRequest,
) -> Result<ExecOutcome, ExecError> {
    match policy.prepare(&request).await? {
        ExecDisposition::Run(prepared) => {
            let output = runner.run(prepared).await?;
            Ok(ExecOutcome::Completed(output))
        }
        ExecDisposition::Refuse { message } => {
            log::warn!("execution refused: {}", message);
            Ok(ExecOutcome::Refused { message })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
