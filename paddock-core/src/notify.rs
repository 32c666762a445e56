//! Notification and status-line surface.
//!
//! The host owns the footer widget and the toast area; plugins only hand it
//! text. [`LogSink`] is the fallback used by examples and tests.

use std::fmt;

/// The host's user-facing reporting surface.
pub trait StatusSink: Send + Sync + fmt::Debug {
    /// Show a one-shot notification.
    fn notify(&self, message: &str);

    /// Replace the plugin's persistent status-line segment.
    fn set_status(&self, text: &str);
}

/// Sink that forwards everything to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn notify(&self, message: &str) {
        log::info!("{}", message);
    }

    fn set_status(&self, text: &str) {
        log::info!("status: {}", text);
    }
}
