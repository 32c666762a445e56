//! Sandbox plugin for the Paddock host.
//!
//! Enforces a per-session write boundary over two surfaces: direct file
//! write/edit tool calls, and arbitrary shell execution. A single
//! [`AccessController`] holds the session state (root, mode, extra
//! writable directories, launcher availability); [`WriteGuard`] plugs it
//! into the host's tool-call interception point and [`SandboxedExec`] into
//! the shell-execution override.
//!
//! Three modes govern everything: `read-only` denies all writes and runs
//! shell commands against a read-only filesystem view; `read-write`
//! permits writes inside the session root (plus discovered
//! version-control metadata directories and the temp dir) and confines
//! shell commands to the same boundary; `yolo` disables enforcement.
//!
//! Shell confinement requires a bubblewrap launcher at a trusted system
//! location. When none exists, execution is refused rather than silently
//! unconfined.
//!
//! # Example
//!
//! ```no_run
//! use paddock_core::intercept::{GateChain, ToolCall};
//! use paddock_sandbox::{AccessController, SandboxMode, WriteGuard};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let controller = Arc::new(AccessController::new("/home/u/project"));
//! controller.set_mode(SandboxMode::ReadWrite);
//!
//! let gates = GateChain::new().with(WriteGuard::new(
//!     Arc::clone(&controller),
//!     "/home/u/project",
//! ));
//!
//! let call = ToolCall::new("file_write", json!({"path": "/etc/passwd"}));
//! assert!(gates.check(&call).await.is_block());
//! # }
//! ```

mod confine;
mod controller;
mod git;
mod mode;
pub mod paths;

pub use confine::{ConfineError, ConfinedCommand, SandboxLauncher, TRUSTED_LAUNCHER_LOCATIONS};
pub use controller::{AccessController, AccessControllerBuilder, SessionBoundary, WriteVerdict};
pub use mode::{ParseModeError, SandboxMode};

use async_trait::async_trait;
use paddock_core::exec::{ExecDisposition, ExecError, ExecPolicy, ExecRequest};
use paddock_core::intercept::{Decision, GateError, ToolCall, ToolGate};
use std::path::PathBuf;
use std::sync::Arc;

/// Tool names whose calls carry a write/edit target in their `path`
/// argument.
const WRITE_TOOLS: [&str; 3] = ["file_write", "file_edit", "file_multi_edit"];

/// Gate over the host's write/edit tools.
///
/// Calls to other tools pass through untouched. A write tool call with a
/// missing or non-string `path` argument is blocked: a request we cannot
/// locate is a request we cannot clear.
#[derive(Debug, Clone)]
pub struct WriteGuard {
    controller: Arc<AccessController>,
    cwd: PathBuf,
}

impl WriteGuard {
    /// Guard backed by `controller`, resolving relative targets against
    /// the session working directory `cwd`.
    pub fn new(controller: Arc<AccessController>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            controller,
            cwd: cwd.into(),
        }
    }
}

#[async_trait]
impl ToolGate for WriteGuard {
    async fn check(&self, call: &ToolCall) -> Result<Decision, GateError> {
        if !WRITE_TOOLS.contains(&call.name.as_str()) {
            return Ok(Decision::Allow);
        }

        let Some(requested) = call.str_arg("path") else {
            log::error!(
                "blocked '{}': missing or non-string 'path' argument",
                call.name
            );
            return Ok(Decision::block(format!(
                "'{}' call has a missing or malformed 'path' argument",
                call.name
            )));
        };

        match self.controller.check_write(requested, &self.cwd).await {
            WriteVerdict::Allowed => {
                log::debug!("allowed {} to '{}'", call.name, requested);
                Ok(Decision::Allow)
            }
            WriteVerdict::Denied { reason } => {
                log::warn!("blocked {} to '{}': {}", call.name, requested, reason);
                Ok(Decision::Block { reason })
            }
        }
    }
}

/// Shell-execution override that confines every non-yolo command.
///
/// In `read-only` and `read-write` modes the user's command is rewritten
/// into a bubblewrap invocation enforcing the session boundary. Without a
/// trusted launcher the execution is refused outright; nothing ever falls
/// back to running unconfined.
#[derive(Debug, Clone)]
pub struct SandboxedExec {
    controller: Arc<AccessController>,
}

impl SandboxedExec {
    /// Policy backed by `controller`.
    pub fn new(controller: Arc<AccessController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl ExecPolicy for SandboxedExec {
    async fn prepare(&self, request: &ExecRequest) -> Result<ExecDisposition, ExecError> {
        if self.controller.mode() == SandboxMode::Yolo {
            return Ok(ExecDisposition::Run(request.clone()));
        }

        match self
            .controller
            .confined_command(&request.command, &request.cwd)
            .await
        {
            Ok(confined) => Ok(ExecDisposition::Run(
                request.clone().with_command(confined.shell_line()),
            )),
            Err(err @ ConfineError::LauncherUnavailable { .. }) => Ok(ExecDisposition::Refuse {
                message: err.to_string(),
            }),
            // Mode flipped to yolo between the check above and the build.
            Err(ConfineError::UnconfinedMode) => Ok(ExecDisposition::Run(request.clone())),
        }
    }
}

/// Everything a host needs to wire the plugin into one session.
///
/// Convenience bundle: builds the controller once and hands out the two
/// registration points plus the shared controller for the mode command.
#[derive(Debug, Clone)]
pub struct SandboxPlugin {
    controller: Arc<AccessController>,
}

impl SandboxPlugin {
    /// Wrap a configured controller. Hosts typically build it with
    /// [`AccessController::new`] over the directory the session started in.
    pub fn new(controller: AccessController) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }

    /// The shared session controller (mode command, status line).
    pub fn controller(&self) -> Arc<AccessController> {
        Arc::clone(&self.controller)
    }

    /// The tool gate to register with the host's interception point.
    pub fn write_guard(&self, cwd: impl Into<PathBuf>) -> WriteGuard {
        WriteGuard::new(Arc::clone(&self.controller), cwd)
    }

    /// The execution policy to register with the host's shell runner.
    pub fn exec_policy(&self) -> SandboxedExec {
        SandboxedExec::new(Arc::clone(&self.controller))
    }

    /// Handle the user's mode command argument: an explicit mode sets it,
    /// no argument advances the cycle. Returns the resulting mode or the
    /// parse rejection (state unchanged on rejection).
    pub fn apply_mode_command(&self, argument: Option<&str>) -> Result<SandboxMode, ParseModeError> {
        match argument {
            Some(raw) => {
                let mode = raw.parse::<SandboxMode>()?;
                self.controller.set_mode(mode);
                Ok(mode)
            }
            None => Ok(self.controller.advance_mode()),
        }
    }
}
