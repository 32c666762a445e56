//! # Paddock Core
//!
//! Host-seam abstractions shared by all Paddock plugins.
//!
//! Paddock plugins run inside a terminal coding-agent host. The host owns the
//! event loop, the command registry, and the widget system; plugins only ever
//! see three narrow surfaces, each modeled here as a trait:
//!
//! - [`intercept`] - a pending tool call can be inspected and either allowed
//!   or blocked with a user-visible reason, before the host executes it
//! - [`exec`] - the host's unconfined "run a shell command" primitive, plus
//!   the per-command policy seam that can rewrite or refuse an execution
//! - [`notify`] - the host's notification/status-line surface
//!
//! ## Example
//!
//! ```
//! use paddock_core::intercept::{Decision, GateChain, GateError, ToolCall, ToolGate};
//! use async_trait::async_trait;
//! use serde_json::json;
//!
//! #[derive(Debug)]
//! struct NoDeletes;
//!
//! #[async_trait]
//! impl ToolGate for NoDeletes {
//!     async fn check(&self, call: &ToolCall) -> Result<Decision, GateError> {
//!         if call.name == "file_delete" {
//!             return Ok(Decision::block("file deletion is disabled"));
//!         }
//!         Ok(Decision::Allow)
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let chain = GateChain::new().with(NoDeletes);
//! let call = ToolCall::new("file_delete", json!({"path": "/tmp/x"}));
//! assert!(chain.check(&call).await.is_block());
//! # });
//! ```

pub mod exec;
pub mod intercept;
pub mod notify;

pub use exec::{
    run_with_policy, CommandRunner, ExecDisposition, ExecError, ExecOutcome, ExecOutput,
    ExecPolicy, ExecRequest, ShellRunner,
};
pub use intercept::{Decision, GateChain, GateError, ToolCall, ToolGate};
pub use notify::{LogSink, StatusSink};
