//! Session-scoped access control.
//!
//! One [`AccessController`] is constructed per host session and injected
//! into every call site - there is no module-level state. The expensive
//! facts (canonical root, launcher probe, version-control discovery, temp
//! dir) are established once behind a single-flight initialization: rapid
//! tool calls arriving during startup all await the same in-flight
//! discovery pass instead of racing their own.

use crate::confine::{
    confined_argv, ConfineError, ConfinedCommand, SandboxLauncher, TRUSTED_LAUNCHER_LOCATIONS,
};
use crate::git::discover_extra_writable_dirs;
use crate::mode::SandboxMode;
use crate::paths::{canonicalize_lenient, is_inside, resolve_request};
use paddock_core::notify::StatusSink;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;

/// Facts established once at session start, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SessionBoundary {
    /// Canonical root directory for permitted writes.
    pub root: PathBuf,

    /// Canonical directories outside the root that stay writable in
    /// read-write mode (deduplicated, outermost only).
    pub extra_writable: Vec<PathBuf>,

    /// Canonical system temporary directory.
    pub temp_dir: PathBuf,

    /// Whether a trusted sandbox launcher exists, and where.
    pub launcher: SandboxLauncher,
}

/// Verdict on a requested file write or edit.
///
/// Denial is ordinary control flow: the host renders the reason as a
/// blocked-tool-call message and the agent corrects course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteVerdict {
    /// The write may proceed.
    Allowed,

    /// The write is blocked; the reason names the request, the resolved
    /// path, and the permitted root so the user can diagnose it.
    Denied {
        /// Human-readable explanation.
        reason: String,
    },
}

impl WriteVerdict {
    /// True if the write may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, WriteVerdict::Allowed)
    }
}

/// Builder for [`AccessController`].
///
/// The trusted launcher locations default to the fixed system list;
/// overriding them (or the temp dir) is for embedders and tests, not for
/// adding search paths.
#[derive(Debug)]
pub struct AccessControllerBuilder {
    root: PathBuf,
    initial_mode: SandboxMode,
    trusted_launchers: Vec<PathBuf>,
    temp_dir: Option<PathBuf>,
    status: Option<Arc<dyn StatusSink>>,
}

impl AccessControllerBuilder {
    /// Start in this mode instead of the default read-write.
    pub fn initial_mode(mut self, mode: SandboxMode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Replace the trusted launcher locations.
    pub fn trusted_launchers(mut self, locations: Vec<PathBuf>) -> Self {
        self.trusted_launchers = locations;
        self
    }

    /// Use this directory as the session's temporary directory instead of
    /// the system one.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Report mode changes through this sink.
    pub fn status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    /// Finish building.
    pub fn build(self) -> AccessController {
        AccessController {
            root: self.root,
            trusted_launchers: self.trusted_launchers,
            temp_dir: self.temp_dir,
            mode: RwLock::new(self.initial_mode),
            boundary: OnceCell::new(),
            status: self.status,
        }
    }
}

/// Enforces the write-boundary policy for one host session.
#[derive(Debug)]
pub struct AccessController {
    /// Root as handed over by the host; canonicalized during init.
    root: PathBuf,
    trusted_launchers: Vec<PathBuf>,
    temp_dir: Option<PathBuf>,
    mode: RwLock<SandboxMode>,
    boundary: OnceCell<SessionBoundary>,
    status: Option<Arc<dyn StatusSink>>,
}

impl AccessController {
    /// Controller rooted at the directory the host session started in,
    /// with the default trusted launcher locations.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::builder(root).build()
    }

    /// Builder with defaults: read-write mode, system launcher locations,
    /// system temp dir.
    pub fn builder(root: impl Into<PathBuf>) -> AccessControllerBuilder {
        AccessControllerBuilder {
            root: root.into(),
            initial_mode: SandboxMode::ReadWrite,
            trusted_launchers: TRUSTED_LAUNCHER_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .collect(),
            temp_dir: None,
            status: None,
        }
    }

    /// The active mode.
    pub fn mode(&self) -> SandboxMode {
        *self
            .mode
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Switch to an explicit mode. Root and extra writable directories are
    /// unaffected.
    pub fn set_mode(&self, mode: SandboxMode) {
        *self
            .mode
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = mode;
        log::info!("sandbox mode set to {}", mode);
        if let Some(sink) = &self.status {
            sink.set_status(&format!("sandbox: {}", mode));
            sink.notify(&format!("sandbox mode is now {}", mode));
        }
    }

    /// Advance to the next mode in the cycle and return it.
    pub fn advance_mode(&self) -> SandboxMode {
        let next = self.mode().advance();
        self.set_mode(next);
        next
    }

    /// The session boundary, established once; concurrent callers during
    /// startup await the same initialization.
    pub async fn boundary(&self) -> &SessionBoundary {
        self.boundary.get_or_init(|| self.init_boundary()).await
    }

    async fn init_boundary(&self) -> SessionBoundary {
        let root = canonicalize_lenient(&self.root).await;
        let launcher = SandboxLauncher::probe(&self.trusted_launchers).await;
        let extra_writable = discover_extra_writable_dirs(&root).await;
        let temp_dir = match &self.temp_dir {
            Some(dir) => canonicalize_lenient(dir).await,
            None => canonicalize_lenient(&std::env::temp_dir()).await,
        };

        log::debug!(
            "session boundary: root={}, extra={:?}, temp={}, launcher available={}",
            root.display(),
            extra_writable,
            temp_dir.display(),
            launcher.is_available()
        );

        SessionBoundary {
            root,
            extra_writable,
            temp_dir,
            launcher,
        }
    }

    /// Decide whether a requested write/edit target is permitted.
    ///
    /// `requested` may be relative, `~`-prefixed, or carry the `@`
    /// sentinel; it is resolved against `cwd` and canonicalized before the
    /// boundary test. Never fails - unresolvable paths degrade to their
    /// best partially resolved absolute form and are judged on that.
    pub async fn check_write(&self, requested: &str, cwd: &Path) -> WriteVerdict {
        match self.mode() {
            SandboxMode::Yolo => WriteVerdict::Allowed,
            SandboxMode::ReadOnly => WriteVerdict::Denied {
                reason: format!(
                    "write to '{}' blocked: sandbox is in read-only mode",
                    requested
                ),
            },
            SandboxMode::ReadWrite => {
                let boundary = self.boundary().await;
                let resolved = canonicalize_lenient(&resolve_request(requested, cwd)).await;

                let permitted = is_inside(&resolved, &boundary.root)
                    || is_inside(&resolved, &boundary.temp_dir)
                    || boundary
                        .extra_writable
                        .iter()
                        .any(|dir| is_inside(&resolved, dir));

                if permitted {
                    WriteVerdict::Allowed
                } else {
                    WriteVerdict::Denied {
                        reason: format!(
                            "write to '{}' blocked: resolved path '{}' is outside the \
                             writable root '{}'",
                            requested,
                            resolved.display(),
                            boundary.root.display()
                        ),
                    }
                }
            }
        }
    }

    /// Wrap a user command for confined execution under the current mode.
    ///
    /// Fails closed: without a trusted launcher no command line is
    /// produced and the caller must refuse to execute.
    pub async fn confined_command(
        &self,
        user_command: &str,
        cwd: &Path,
    ) -> Result<ConfinedCommand, ConfineError> {
        let mode = self.mode();
        if mode == SandboxMode::Yolo {
            return Err(ConfineError::UnconfinedMode);
        }

        let boundary = self.boundary().await;
        let launcher = match &boundary.launcher {
            SandboxLauncher::Available(path) => path,
            SandboxLauncher::Unavailable => {
                return Err(ConfineError::launcher_unavailable(&self.trusted_launchers));
            }
        };

        let writable: Vec<PathBuf> = if mode == SandboxMode::ReadWrite {
            let mut dirs = Vec::with_capacity(2 + boundary.extra_writable.len());
            dirs.push(boundary.root.clone());
            dirs.extend(boundary.extra_writable.iter().cloned());
            dirs.push(boundary.temp_dir.clone());
            dirs
        } else {
            Vec::new()
        };

        Ok(confined_argv(launcher, &writable, cwd, user_command))
    }
}
