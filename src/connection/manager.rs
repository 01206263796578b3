//! Connection manager for the session lifecycle.

use std::sync::Arc;

use crate::config::ConnectionParams;
use crate::db::{DatabaseClient, ResultTable};
use crate::error::{BrowserError, Result};
use crate::status::{StatusReporter, STATUS_CLOSING_CONNECTION};

/// An active database session with its metadata.
pub struct ActiveSession {
    /// Display string of the connection target (never includes the password).
    pub target: String,
    /// Database client.
    pub db: Box<dyn DatabaseClient>,
}

/// Owns at most one active session.
pub struct ConnectionManager {
    active: Option<ActiveSession>,
    reporter: Arc<dyn StatusReporter>,
}

impl ConnectionManager {
    /// Creates a new connection manager with no session.
    pub fn new(reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            active: None,
            reporter,
        }
    }

    /// Creates a connection manager around an already open client.
    pub fn with_session(
        db: Box<dyn DatabaseClient>,
        target: impl Into<String>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            active: Some(ActiveSession {
                target: target.into(),
                db,
            }),
            reporter,
        }
    }

    /// Connect to a database with the given parameters.
    ///
    /// The new session is opened before the current one is closed, so a
    /// failed attempt leaves the manager exactly as it was.
    pub async fn connect(&mut self, params: &ConnectionParams) -> Result<()> {
        let db = crate::db::connect(params, self.reporter.clone()).await?;

        self.close().await;
        self.active = Some(ActiveSession {
            target: params.display_string(),
            db,
        });

        Ok(())
    }

    /// Executes a statement on the active session.
    pub async fn execute(&self, sql: &str) -> Result<ResultTable> {
        let db = self.db().ok_or_else(not_connected)?;
        match db.execute_query(sql).await {
            Ok(table) => Ok(table),
            Err(e) => {
                self.reporter.report_error("Error executing the query.", &e);
                Err(e)
            }
        }
    }

    /// Lists user tables on the active session.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let db = self.db().ok_or_else(not_connected)?;
        db.list_tables().await
    }

    /// Get the active database client.
    pub fn db(&self) -> Option<&dyn DatabaseClient> {
        self.active.as_ref().map(|s| s.db.as_ref())
    }

    /// Get the display string of the active session.
    pub fn current_target(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.target.as_str())
    }

    /// Check if there's an active session.
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Close the active session. A no-op when nothing is open.
    pub async fn close(&mut self) {
        if let Some(session) = self.active.take() {
            self.reporter.show_status(STATUS_CLOSING_CONNECTION);
            session.db.close().await;
        }
    }
}

fn not_connected() -> BrowserError {
    BrowserError::connection("Not connected to a database")
}
