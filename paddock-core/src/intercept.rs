//! Pre-execution gating for host tool calls.
//!
//! The host surfaces every pending tool invocation to the registered gates
//! before executing it. A gate either lets the call through or blocks it
//! with a reason string the host renders as a blocked-tool-call message.
//! Blocking is a normal, expected outcome, not an error: the error channel
//! exists only for gates whose own machinery fails, and the chain treats
//! such failures as blocks so that a broken safety check never falls open.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ToolCall
// ============================================================================

/// A pending tool invocation surfaced by the host.
///
/// # Example
///
/// ```
/// use paddock_core::intercept::ToolCall;
/// use serde_json::json;
///
/// let call = ToolCall::new("file_write", json!({"path": "src/main.rs"}));
/// assert_eq!(call.name, "file_write");
/// assert_eq!(call.str_arg("path"), Some("src/main.rs"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ToolCall {
    /// Name of the tool about to run.
    pub name: String,

    /// The tool's arguments, as the host parsed them.
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Fetch a string argument by key, if present and actually a string.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Outcome of gating a tool call.
///
/// The host contract is binary: a call runs unchanged or it is blocked with
/// a reason the user can read and act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No objection; the host executes the call.
    Allow,

    /// Block execution. The reason is shown verbatim to the user.
    Block {
        /// Why the call was blocked.
        reason: String,
    },
}

impl Decision {
    /// Convenience constructor for a block decision.
    pub fn block(reason: impl Into<String>) -> Self {
        Decision::Block {
            reason: reason.into(),
        }
    }

    /// True if this decision blocks execution.
    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block { .. })
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Errors raised by a gate's own machinery.
///
/// Not for "the call is not permitted" - that is [`Decision::Block`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GateError {
    /// The gate could not evaluate the call.
    #[error("gate evaluation failed: {0}")]
    Failed(String),

    /// Generic error from a gate implementation.
    #[error("gate error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A pre-execution check over pending tool calls.
///
/// Gates are registered once per session and invoked synchronously from the
/// host's tool-call interception point; the host guarantees at most one
/// in-flight check per session, so implementations may hold interior state
/// behind ordinary locks without contention concerns.
#[async_trait]
pub trait ToolGate: Send + Sync + fmt::Debug {
    /// Inspect a pending call and decide whether it may run.
    async fn check(&self, call: &ToolCall) -> Result<Decision, GateError>;
}

// ============================================================================
// GateChain
// ============================================================================

/// Ordered collection of gates.
///
/// Gates run in registration order; the first [`Decision::Block`] stops the
/// chain. A gate that returns `Err` also stops the chain, as a block: its
/// error text becomes the reason, so a misbehaving gate fails closed rather
/// than silently admitting the call.
#[derive(Clone, Default)]
pub struct GateChain {
    gates: Vec<Arc<dyn ToolGate>>,
}

impl fmt::Debug for GateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateChain")
            .field("count", &self.gates.len())
            .finish()
    }
}

impl GateChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a gate. Gates run in the order they were added.
    pub fn with(mut self, gate: impl ToolGate + 'static) -> Self {
        self.gates.push(Arc::new(gate));
        self
    }

    /// Run every gate against a pending call.
    pub async fn check(&self, call: &ToolCall) -> Decision {
        for gate in &self.gates {
            match gate.check(call).await {
                Ok(Decision::Allow) => continue,
                Ok(block @ Decision::Block { .. }) => return block,
                Err(e) => {
                    log::error!("gate failed while checking '{}': {}", call.name, e);
                    return Decision::block(format!(
                        "safety check could not evaluate '{}': {}",
                        call.name, e
                    ));
                }
            }
        }
        Decision::Allow
    }

    /// Number of registered gates.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// True if no gates are registered.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct AllowGate;

    #[async_trait]
    impl ToolGate for AllowGate {
        async fn check(&self, _call: &ToolCall) -> Result<Decision, GateError> {
            Ok(Decision::Allow)
        }
    }

    #[derive(Debug)]
    struct BlockGate {
        reason: &'static str,
    }

    #[async_trait]
    impl ToolGate for BlockGate {
        async fn check(&self, _call: &ToolCall) -> Result<Decision, GateError> {
            Ok(Decision::block(self.reason))
        }
    }

    #[derive(Debug)]
    struct BrokenGate;

    #[async_trait]
    impl ToolGate for BrokenGate {
        async fn check(&self, _call: &ToolCall) -> Result<Decision, GateError> {
            Err(GateError::Failed("lost state".into()))
        }
    }

    #[tokio::test]
    async fn empty_chain_allows() {
        let chain = GateChain::new();
        assert!(chain.is_empty());

        let call = ToolCall::new("file_write", json!({}));
        assert_eq!(chain.check(&call).await, Decision::Allow);
    }

    #[tokio::test]
    async fn first_block_stops_chain() {
        let chain = GateChain::new()
            .with(AllowGate)
            .with(BlockGate { reason: "first" })
            .with(BlockGate { reason: "second" });

        let call = ToolCall::new("file_write", json!({}));
        assert_eq!(
            chain.check(&call).await,
            Decision::Block {
                reason: "first".into()
            }
        );
    }

    #[tokio::test]
    async fn gate_error_fails_closed() {
        let chain = GateChain::new().with(BrokenGate).with(AllowGate);

        let call = ToolCall::new("file_edit", json!({}));
        match chain.check(&call).await {
            Decision::Block { reason } => {
                assert!(reason.contains("file_edit"));
                assert!(reason.contains("lost state"));
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn all_allow_passes() {
        let chain = GateChain::new().with(AllowGate).with(AllowGate);
        let call = ToolCall::new("bash", json!({"command": "ls"}));
        assert_eq!(chain.check(&call).await, Decision::Allow);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn str_arg_rejects_non_strings() {
        let call = ToolCall::new("file_write", json!({"path": 42, "other": "x"}));
        assert_eq!(call.str_arg("path"), None);
        assert_eq!(call.str_arg("other"), Some("x"));
        assert_eq!(call.str_arg("missing"), None);
    }

    #[test]
    fn decision_helpers() {
        assert!(!Decision::Allow.is_block());
        assert!(Decision::block("nope").is_block());
    }
}
