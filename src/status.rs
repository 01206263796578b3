//! Status reporting for db-browser.
//!
//! The core never renders anything itself. It announces phase transitions
//! (connecting, connected, processing, closing) on a short status line and
//! writes failures as two separate records: an `Error: ...` status line for
//! the presentation layer and a detailed diagnostic for the log.

use std::fmt;
use std::sync::Mutex;
use tracing::{error, info};

/// Status line emitted before opening a session.
pub const STATUS_CONNECTING: &str = "Connecting";
/// Status line emitted once a session is open.
pub const STATUS_CONNECTED: &str = "Connected";
/// Status line emitted before a statement is sent.
pub const STATUS_PROCESSING: &str = "Processing query";
/// Status line emitted once the result set has been materialized.
pub const STATUS_CLOSING_STATEMENT: &str = "Closing statement.";
/// Status line emitted before a session is closed.
pub const STATUS_CLOSING_CONNECTION: &str = "Closing connection.";

/// Receiver of advisory status text and diagnostics.
///
/// Implementations must be cheap and must not fail; status output is not
/// part of the functional contract of any operation.
pub trait StatusReporter: Send + Sync {
    /// Shows a short, human-readable status line.
    fn show_status(&self, status: &str);

    /// Records a detailed diagnostic, separate from the status line.
    fn diagnostic(&self, message: &str, detail: &str);

    /// Reports a failure as a status line plus a diagnostic record.
    fn report_error(&self, message: &str, detail: &dyn fmt::Display) {
        self.show_status(&format!("Error: {message}"));
        self.diagnostic(message, &detail.to_string());
    }
}

/// Reporter that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn show_status(&self, status: &str) {
        info!(target: "status", "{status}");
    }

    fn diagnostic(&self, message: &str, detail: &str) {
        error!(detail = %detail, "{message}");
    }
}

/// A diagnostic captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub detail: String,
}

/// Reporter that keeps everything in memory.
///
/// Useful for embedding callers that render status themselves, and for tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    statuses: Mutex<Vec<String>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl RecordingReporter {
    /// Creates an empty recording reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all status lines shown so far.
    pub fn statuses(&self) -> Vec<String> {
        self.statuses
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Returns all diagnostics recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.clear();
        }
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.clear();
        }
    }
}

impl StatusReporter for RecordingReporter {
    fn show_status(&self, status: &str) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.push(status.to_string());
        }
    }

    fn diagnostic(&self, message: &str, detail: &str) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(Diagnostic {
                message: message.to_string(),
                detail: detail.to_string(),
            });
        }
    }
}
