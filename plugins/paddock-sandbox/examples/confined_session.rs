//! Example: wiring the sandbox plugin into a session.
//!
//! Demonstrates the write-boundary decisions across the three modes and
//! what the confined command line looks like for shell execution.
//!
//! # Running
//!
//! ```bash
//! cargo run -p paddock-sandbox --example confined_session
//! ```

use paddock_core::intercept::{Decision, GateChain, ToolCall};
use paddock_sandbox::{AccessController, SandboxMode, SandboxPlugin};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging to see boundary decisions
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let root = std::env::current_dir()?;
    println!("=== Sandbox Plugin Example ===\n");
    println!("Session root: {}\n", root.display());

    let plugin = SandboxPlugin::new(
        AccessController::builder(&root)
            .initial_mode(SandboxMode::ReadWrite)
            .build(),
    );
    let gates = GateChain::new().with(plugin.write_guard(&root));

    println!("--- Write decisions in read-write mode ---\n");
    let test_calls = vec![
        ("file_write", json!({"path": "notes/new.md"}), "new file under root"),
        ("file_edit", json!({"path": "/etc/passwd"}), "outside root"),
        ("file_write", json!({"path": "@~/elsewhere.txt"}), "sentinel + tilde"),
        ("file_read", json!({"path": "/etc/passwd"}), "read (passthrough)"),
    ];

    for (tool, arguments, description) in test_calls {
        let call = ToolCall::new(tool, arguments.clone());
        match gates.check(&call).await {
            Decision::Allow => println!("  {}: {}({}) -> ALLOWED\n", description, tool, arguments),
            Decision::Block { reason } => {
                println!("  {}: {}({}) -> BLOCKED", description, tool, arguments);
                println!("    Reason: {}\n", reason);
            }
        }
    }

    println!("--- Confined shell execution ---\n");
    let controller = plugin.controller();
    match controller.confined_command("cargo test 2>&1 | tail -5", &root).await {
        Ok(confined) => {
            println!("  Confined line:\n    {}\n", confined.shell_line());
        }
        Err(err) => {
            println!("  Refused: {}\n", err);
        }
    }

    println!("--- Mode cycle ---\n");
    for _ in 0..3 {
        let mode = controller.advance_mode();
        println!("  advanced to: {}", mode);
    }

    Ok(())
}
