//! SQLite database client implementation.
//!
//! SQLite types values per cell rather than per column. Columns read from a
//! table are classified by the type declared in the catalog; expression
//! columns by the storage class of their first non-null value. Each cell is
//! then read according to its own storage class.

use crate::config::ConnectionParams;
use crate::db::sources::source_tables;
use crate::db::{
    fetch_result_sets, not_connected, project, release_connection, single_result_set, Cell,
    ColumnKind, ColumnMeta, DatabaseClient, ResultTable,
};
use crate::error::{BrowserError, Result};
use crate::status::{StatusReporter, STATUS_CLOSING_STATEMENT, STATUS_PROCESSING};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::sqlite::{SqliteColumn, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as SqlxColumn, ConnectOptions, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// SQLite database client holding a single connection.
pub struct SqliteClient {
    conn: Mutex<Option<SqliteConnection>>,
    reporter: Arc<dyn StatusReporter>,
}

impl SqliteClient {
    /// Opens the database file (or `:memory:`). The file must already exist.
    pub async fn connect(
        params: &ConnectionParams,
        reporter: Arc<dyn StatusReporter>,
    ) -> Result<Self> {
        let target = params.target_url();
        debug!("Connection target: {}", target);

        let conn = SqliteConnectOptions::from_str(&target)
            .map_err(|e| {
                BrowserError::connection(format!("Invalid connection target '{target}': {e}"))
            })?
            .connect()
            .await
            .map_err(|e| {
                BrowserError::connection(format!(
                    "Cannot open database '{}': {e}",
                    params.database
                ))
            })?;

        debug!("Successfully opened database");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            reporter,
        })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute_query(&self, sql: &str) -> Result<ResultTable> {
        let mut guard = self.conn.try_lock().map_err(|_| BrowserError::SessionBusy)?;
        let conn = guard.as_mut().ok_or_else(not_connected)?;

        self.reporter.show_status(STATUS_PROCESSING);
        debug!("Executing: {}", sql);

        let sets = fetch_result_sets(&mut *conn, sql)
            .await
            .map_err(|e| BrowserError::query(e.to_string()))?;
        let rows: Vec<SqliteRow> = single_result_set(sets)?;

        let declared = declared_types(conn, sql).await;
        let columns = match rows.first() {
            Some(first) => column_meta(first.columns(), &rows),
            None => describe_columns(conn, sql).await,
        };
        let columns = apply_declared_types(columns, &declared);

        self.reporter.show_status(STATUS_CLOSING_STATEMENT);
        project(&columns, &rows, self.reporter.as_ref(), read_cell)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut guard = self.conn.try_lock().map_err(|_| BrowserError::SessionBusy)?;
        let conn = guard.as_mut().ok_or_else(not_connected)?;

        sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
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

/// Looks up the declared types of the columns of every table the statement
/// reads from, keyed by lowercased column name.
///
/// A name declared with different types in two source tables is left out,
/// as is a column declared without a type.
async fn declared_types(conn: &mut SqliteConnection, sql: &str) -> HashMap<String, String> {
    let mut found: HashMap<String, Option<String>> = HashMap::new();

    for table in source_tables(sql) {
        let columns: Vec<(String, String)> =
            match sqlx::query_as("SELECT name, type FROM pragma_table_info(?1)")
                .bind(&table)
                .fetch_all(&mut *conn)
                .await
            {
                Ok(columns) => columns,
                Err(e) => {
                    debug!("No declared types for '{}': {}", table, e);
                    continue;
                }
            };

        for (name, declared) in columns {
            if declared.trim().is_empty() {
                continue;
            }
            match found.entry(name.to_lowercase()) {
                Entry::Vacant(slot) => {
                    slot.insert(Some(declared));
                }
                Entry::Occupied(mut slot) => {
                    if slot.get().as_deref() != Some(declared.as_str()) {
                        slot.insert(None);
                    }
                }
            }
        }
    }

    found
        .into_iter()
        .filter_map(|(name, declared)| declared.map(|d| (name, d)))
        .collect()
}

fn apply_declared_types(
    columns: Vec<ColumnMeta>,
    declared: &HashMap<String, String>,
) -> Vec<ColumnMeta> {
    columns
        .into_iter()
        .map(|column| match declared.get(&column.name.to_lowercase()) {
            Some(type_name) => ColumnMeta::new(column.name, type_name.clone()),
            None => column,
        })
        .collect()
}

/// Builds column metadata from what sqlx reports, falling back to the
/// runtime storage class for columns without a type.
fn column_meta(columns: &[SqliteColumn], rows: &[SqliteRow]) -> Vec<ColumnMeta> {
    columns
        .iter()
        .map(|col| {
            let declared = col.type_info();
            let type_name = if declared.is_null() {
                runtime_type_name(rows, col.ordinal())
                    .unwrap_or_else(|| declared.name().to_string())
            } else {
                declared.name().to_string()
            };
            ColumnMeta::new(col.name(), type_name)
        })
        .collect()
}

fn runtime_type_name(rows: &[SqliteRow], index: usize) -> Option<String> {
    rows.iter().find_map(|row| {
        let value = row.try_get_raw(index).ok()?;
        if value.is_null() {
            None
        } else {
            Some(value.type_info().name().to_string())
        }
    })
}

async fn describe_columns(conn: &mut SqliteConnection, sql: &str) -> Vec<ColumnMeta> {
    match conn.describe(sql).await {
        Ok(describe) => describe
            .columns()
            .iter()
            .map(|col| ColumnMeta::new(col.name(), col.type_info().name()))
            .collect(),
        Err(e) => {
            debug!("No column metadata for empty result: {}", e);
            Vec::new()
        }
    }
}

/// SQLite storage class of a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    fn from_type_name(name: &str) -> Self {
        match name {
            "INTEGER" => Self::Integer,
            "REAL" => Self::Real,
            "BLOB" => Self::Blob,
            _ => Self::Text,
        }
    }
}

/// Reads one cell. NULL is checked first for every kind.
///
/// A value whose storage class matches its column's kind is decoded
/// directly. Any other value is read as SQLite's text form of it and parsed
/// for the kind, so a stray `'abc'` in an INTEGER column fails the query
/// instead of reading as 0, and a DECIMAL held as REAL is truncated like any
/// other decimal text.
fn read_cell(row: &SqliteRow, index: usize, kind: ColumnKind) -> Result<Cell> {
    let value = row.try_get_raw(index).map_err(read_error(index))?;
    if value.is_null() {
        return Ok(Cell::Null);
    }
    let storage = StorageClass::from_type_name(value.type_info().name());

    let cell = match (kind, storage) {
        (ColumnKind::Clob, _) => Cell::Clob,
        (ColumnKind::Unknown, _) => Cell::Unknown,
        (
            ColumnKind::BigInteger
            | ColumnKind::Integer
            | ColumnKind::SmallInt
            | ColumnKind::Decimal
            | ColumnKind::Numeric,
            StorageClass::Integer,
        ) => Cell::Int(get::<i64>(row, index)?),
        (ColumnKind::Boolean, StorageClass::Integer) => Cell::Bool(get::<bool>(row, index)?),
        (ColumnKind::Double | ColumnKind::Real, StorageClass::Integer | StorageClass::Real) => {
            Cell::Double(get::<f64>(row, index)?)
        }
        (ColumnKind::Float, StorageClass::Integer | StorageClass::Real) => {
            Cell::Single(get::<f64>(row, index)? as f32)
        }
        (ColumnKind::Date, StorageClass::Text) => Cell::Date(get::<NaiveDate>(row, index)?),
        (ColumnKind::Time, StorageClass::Text) => Cell::Time(get::<NaiveTime>(row, index)?),
        (ColumnKind::Timestamp, StorageClass::Text | StorageClass::Integer) => {
            Cell::Timestamp(get::<NaiveDateTime>(row, index)?)
        }
        (ColumnKind::LongText | ColumnKind::Text, StorageClass::Text) => {
            Cell::Text(get::<String>(row, index)?)
        }
        (_, StorageClass::Blob) => {
            return Err(BrowserError::query(format!(
                "Column {index} holds binary data that cannot be shown as {kind}"
            )))
        }
        (ColumnKind::LongText | ColumnKind::Text, _) => Cell::Text(get::<String>(row, index)?),
        (kind, _) => Cell::from_text(kind, &get::<String>(row, index)?)?,
    };
    Ok(cell)
}

fn get<'r, T>(row: &'r SqliteRow, index: usize) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite>,
{
    row.try_get_unchecked(index).map_err(read_error(index))
}

fn read_error(index: usize) -> impl Fn(sqlx::Error) -> BrowserError {
    move |e| BrowserError::query(format!("Failed to read column {index}: {e}"))
}
