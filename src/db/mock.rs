//! Mock database client for testing.
//!
//! Serves scripted result sets through the same projection as the real
//! backends, so column classification and cell conversion can be exercised
//! without a server.

use super::{project, Cell, ColumnMeta, DatabaseClient, ResultTable};
use crate::error::{BrowserError, Result};
use crate::status::{StatusReporter, STATUS_CLOSING_STATEMENT, STATUS_PROCESSING};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Option<String>>>,
    tables: Vec<String>,
    delay: Option<Duration>,
    close_error: Option<String>,
    open: Mutex<bool>,
    reporter: Arc<dyn StatusReporter>,
}

impl MockDatabaseClient {
    /// Creates a mock that answers `SELECT` statements with a single
    /// `RESULT` column echoing the statement.
    pub fn new(reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            tables: Vec::new(),
            delay: None,
            close_error: None,
            open: Mutex::new(true),
            reporter,
        }
    }

    /// Scripts the result set returned for every statement.
    ///
    /// Cells are given as driver text; `None` is SQL NULL.
    pub fn with_result(
        mut self,
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Sets the tables reported by `list_tables`.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    /// Makes every statement take at least `delay` to complete.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes closing the session fail with the given message.
    pub fn with_close_error(mut self, message: impl Into<String>) -> Self {
        self.close_error = Some(message.into());
        self
    }

    fn scripted_result(&self, sql: &str) -> (Vec<ColumnMeta>, Vec<Vec<Option<String>>>) {
        if !self.columns.is_empty() {
            return (self.columns.clone(), self.rows.clone());
        }

        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            (
                vec![ColumnMeta::new("RESULT", "VARCHAR")],
                vec![vec![Some(format!("Mock result for: {sql}"))]],
            )
        } else {
            (Vec::new(), Vec::new())
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<ResultTable> {
        let open = self.open.try_lock().map_err(|_| BrowserError::SessionBusy)?;
        if !*open {
            return Err(super::not_connected());
        }

        self.reporter.show_status(STATUS_PROCESSING);
        debug!("Executing: {}", sql);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let (columns, rows) = self.scripted_result(sql);

        self.reporter.show_status(STATUS_CLOSING_STATEMENT);
        project(&columns, &rows, self.reporter.as_ref(), |row, index, kind| {
            match &row[index] {
                None => Ok(Cell::Null),
                Some(text) => Cell::from_text(kind, text),
            }
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let open = self.open.try_lock().map_err(|_| BrowserError::SessionBusy)?;
        if !*open {
            return Err(super::not_connected());
        }

        let mut tables = self.tables.clone();
        tables.sort();
        Ok(tables)
    }

    async fn close(&self) {
        let mut open = self.open.lock().await;
        if !*open {
            return;
        }
        *open = false;

        if let Some(message) = &self.close_error {
            let err = BrowserError::cleanup(message.clone());
            self.reporter.report_error("Error closing the connection.", &err);
        }
    }

    async fn is_open(&self) -> bool {
        *self.open.lock().await
    }
}
