//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait for PostgreSQL databases using sqlx. Statements go over the simple
//! query protocol, so every value arrives as text and is decoded per column
//! kind.

use crate::config::ConnectionParams;
use crate::db::{
    fetch_result_sets, not_connected, project, release_connection, single_result_set, Cell,
    ColumnKind, ColumnMeta, DatabaseClient, ResultTable,
};
use crate::error::{BrowserError, Result};
use crate::status::{StatusReporter, STATUS_CLOSING_STATEMENT, STATUS_PROCESSING};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column as SqlxColumn, ConnectOptions, Executor, Row as SqlxRow, TypeInfo};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// PostgreSQL database client holding a single connection.
pub struct PostgresClient {
    conn: Mutex<Option<PgConnection>>,
    reporter: Arc<dyn StatusReporter>,
}

impl PostgresClient {
    /// Opens a connection to `postgres://host:port/database` with the given
    /// credentials.
    pub async fn connect(
        params: &ConnectionParams,
        reporter: Arc<dyn StatusReporter>,
    ) -> Result<Self> {
        let target = params.target_url();
        debug!("Connection target: {}", target);

        let mut options = PgConnectOptions::from_str(&target).map_err(|e| {
            BrowserError::connection(format!("Invalid connection target '{target}': {e}"))
        })?;
        if !params.user.is_empty() {
            options = options.username(&params.user);
        }
        if !params.password.is_empty() {
            options = options.password(&params.password);
        }

        let conn = options
            .connect()
            .await
            .map_err(|e| map_connection_error(e, params))?;

        debug!("Successfully connected to database");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            reporter,
        })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str) -> Result<ResultTable> {
        let mut guard = self.conn.try_lock().map_err(|_| BrowserError::SessionBusy)?;
        let conn = guard.as_mut().ok_or_else(not_connected)?;

        self.reporter.show_status(STATUS_PROCESSING);
        debug!("Executing: {}", sql);

        let sets = fetch_result_sets(&mut *conn, sql)
            .await
            .map_err(|e| BrowserError::query(format_query_error(e)))?;
        let rows: Vec<PgRow> = single_result_set(sets)?;

        let columns = match rows.first() {
            Some(first) => column_meta(first.columns()),
            None => describe_columns(conn, sql).await,
        };

        self.reporter.show_status(STATUS_CLOSING_STATEMENT);
        project(&columns, &rows, self.reporter.as_ref(), read_cell)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut guard = self.conn.try_lock().map_err(|_| BrowserError::SessionBusy)?;
        let conn = guard.as_mut().ok_or_else(not_connected)?;

        sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
                AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| BrowserError::query(format!("Failed to fetch tables: {e}")))
    }

    async fn close(&self) {
        release_connection(&self.conn, self.reporter.as_ref()).await;
    }

    async fn is_open(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}

fn column_meta(columns: &[sqlx::postgres::PgColumn]) -> Vec<ColumnMeta> {
    columns
        .iter()
        .map(|col| ColumnMeta::new(col.name(), col.type_info().name()))
        .collect()
}

/// Recovers the header of a statement that produced no rows.
///
/// Best effort: statements that cannot be prepared (multi-statement text,
/// DDL) yield an empty header.
async fn describe_columns(conn: &mut PgConnection, sql: &str) -> Vec<ColumnMeta> {
    match conn.describe(sql).await {
        Ok(describe) => column_meta(describe.columns()),
        Err(e) => {
            debug!("No column metadata for empty result: {}", e);
            Vec::new()
        }
    }
}

/// Reads one cell. NULL is checked first for every kind.
fn read_cell(row: &PgRow, index: usize, kind: ColumnKind) -> Result<Cell> {
    let text: Option<String> = row
        .try_get_unchecked(index)
        .map_err(|e| BrowserError::query(format!("Failed to read column {index}: {e}")))?;

    match text {
        None => Ok(Cell::Null),
        Some(text) => Cell::from_text(kind, &text),
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, params: &ConnectionParams) -> BrowserError {
    let host = &params.host;
    let port = &params.port;
    let user = if params.user.is_empty() {
        "(default)"
    } else {
        params.user.as_str()
    };
    let database = &params.database;

    let error_str = error.to_string().to_lowercase();

    let hint = if error_str.contains("connection refused")
        || error_str.contains("could not connect")
    {
        Some(format!("Cannot connect to {host}:{port}. Check that the server is running."))
    } else if error_str.contains("failed to lookup")
        || error_str.contains("name or service not known")
        || error_str.contains("nodename nor servname")
    {
        Some(format!("Cannot resolve host '{host}'."))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        Some(format!("Authentication failed for user '{user}'. Check your credentials."))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        Some(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        Some(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        None
    };

    warn!("Connection failed: {}", error);
    match hint {
        Some(hint) => BrowserError::connection(format!("{hint} ({error})")),
        None => BrowserError::connection(error.to_string()),
    }
}

/// Formats a query error with detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
