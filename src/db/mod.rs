//! Database layer for db-browser.
//!
//! Provides the connector, a trait-based session interface with one
//! implementation per backend, and the projection that turns result sets
//! into string tables.

mod mock;
mod postgres;
pub mod projection;
mod sources;
mod sqlite;
mod types;

pub use mock::MockDatabaseClient;
pub use postgres::PostgresClient;
pub use projection::{classify_columns, project};
pub use sqlite::SqliteClient;
pub use types::{
    float_text, truncate_decimal, Cell, ColumnKind, ColumnMeta, ResultTable, CLOB_TEXT, NULL_TEXT,
    UNKNOWN_TEXT,
};

use crate::config::ConnectionParams;
use crate::error::{BrowserError, Result};
use crate::status::{StatusReporter, STATUS_CONNECTED, STATUS_CONNECTING};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::Either;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Resolves a connection URL scheme to a backend with a compiled driver.
    pub fn from_scheme(scheme: &str) -> Result<Self> {
        Self::parse(scheme).ok_or_else(|| {
            BrowserError::connection(format!(
                "No driver available for '{scheme}'. Supported: postgres, sqlite"
            ))
        })
    }

    /// Returns the default port for this backend (0 when not network based).
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Sqlite => 0,
        }
    }

    /// Returns the URL scheme for this backend.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown backend: {s}. Expected: postgres or sqlite"))
    }
}

/// Opens a session for the given parameters.
///
/// Emits `Connecting` before and `Connected` after a successful open. On
/// failure nothing is retained and the error is also reported on the
/// status channel.
pub async fn connect(
    params: &ConnectionParams,
    reporter: Arc<dyn StatusReporter>,
) -> Result<Box<dyn DatabaseClient>> {
    reporter.show_status(STATUS_CONNECTING);
    info!("Connecting to {}", params.display_string());

    let result: Result<Box<dyn DatabaseClient>> = match params.backend {
        DatabaseBackend::Postgres => PostgresClient::connect(params, reporter.clone())
            .await
            .map(|c| Box::new(c) as Box<dyn DatabaseClient>),
        DatabaseBackend::Sqlite => SqliteClient::connect(params, reporter.clone())
            .await
            .map(|c| Box::new(c) as Box<dyn DatabaseClient>),
    };

    match result {
        Ok(client) => {
            reporter.show_status(STATUS_CONNECTED);
            Ok(client)
        }
        Err(e) => {
            reporter.report_error("Could not connect to the database.", &e);
            Err(e)
        }
    }
}

/// Interface of one live database session.
///
/// A session runs at most one statement at a time: a call made while
/// another is in flight fails with `SessionBusy` instead of waiting.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Sends the SQL text verbatim and projects the full result set.
    async fn execute_query(&self, sql: &str) -> Result<ResultTable>;

    /// Lists the user tables of the connected database, sorted by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Closes the session. Idempotent; failures are reported, not returned.
    async fn close(&self);

    /// Returns true until `close` has been called.
    async fn is_open(&self) -> bool;
}

pub(crate) fn not_connected() -> BrowserError {
    BrowserError::connection("Not connected: the session has been closed")
}

/// Runs the SQL text verbatim and groups the returned rows by statement.
///
/// Only statements that returned rows are kept, so DDL and DML in a script
/// do not show up as empty result sets.
pub(crate) async fn fetch_result_sets<'c, DB, E>(
    executor: E,
    sql: &'c str,
) -> std::result::Result<Vec<Vec<DB::Row>>, sqlx::Error>
where
    DB: sqlx::Database,
    E: sqlx::Executor<'c, Database = DB>,
{
    let mut stream = sqlx::raw_sql(sql).fetch_many(executor);
    let mut sets = Vec::new();
    let mut current = Vec::new();

    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(_) => {
                if !current.is_empty() {
                    sets.push(std::mem::take(&mut current));
                }
            }
            Either::Right(row) => current.push(row),
        }
    }
    if !current.is_empty() {
        sets.push(current);
    }

    Ok(sets)
}

/// Picks the single result set of a statement text.
///
/// A text whose statements return rows more than once is rejected, since a
/// projection has exactly one header.
pub(crate) fn single_result_set<R>(mut sets: Vec<Vec<R>>) -> Result<Vec<R>> {
    if sets.len() > 1 {
        return Err(BrowserError::query(format!(
            "Statement text returned {} result sets; run the queries one at a time",
            sets.len()
        )));
    }
    Ok(sets.pop().unwrap_or_default())
}

/// Takes the connection out of its slot and closes it.
///
/// Only the first call closes anything; a failure to close is reported on
/// the status channel as a cleanup error.
pub(crate) async fn release_connection<C>(slot: &Mutex<Option<C>>, reporter: &dyn StatusReporter)
where
    C: sqlx::Connection,
{
    let conn = slot.lock().await.take();
    let Some(conn) = conn else {
        debug!("Close requested on a session that is already closed");
        return;
    };

    if let Err(e) = conn.close().await {
        let err = BrowserError::cleanup(e.to_string());
        reporter.report_error("Error closing the connection.", &err);
    }
}
