//! Error types for db-browser.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for db-browser operations.
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Database connection errors (driver unavailable, host unreachable, auth rejected)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (malformed SQL, execution-time database errors)
    #[error("Query error: {0}")]
    Query(String),

    /// A second query was issued on a session that already has one in flight.
    #[error("Session busy: a query is already in flight on this connection")]
    SessionBusy,

    /// Failure while releasing a statement, cursor or connection.
    ///
    /// Always reported through the status channel, never returned to callers.
    #[error("Cleanup error: {0}")]
    Cleanup(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrowserError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a cleanup error with the given message.
    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::Cleanup(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::SessionBusy => "Session Busy",
            Self::Cleanup(_) => "Cleanup Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using BrowserError.
pub type Result<T> = std::result::Result<T, BrowserError>;
