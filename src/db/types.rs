//! Result types for db-browser.
//!
//! Defines the column classification, the per-cell intermediate read from a
//! driver, and the string table handed to the presentation layer.

use crate::error::{BrowserError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;

/// Sentinel emitted for SQL NULL in any column.
pub const NULL_TEXT: &str = "NULL";
/// Sentinel emitted for every non-null cell of an unclassified column.
pub const UNKNOWN_TEXT: &str = "UNKNOWN";
/// Sentinel emitted in place of large character object contents.
pub const CLOB_TEXT: &str = "CLOB";

/// Semantic classification of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnKind {
    BigInteger,
    Boolean,
    Decimal,
    Double,
    Float,
    Integer,
    Numeric,
    Real,
    SmallInt,
    Date,
    Time,
    Timestamp,
    LongText,
    Text,
    Clob,
    Unknown,
}

impl ColumnKind {
    /// Classifies a database-reported type name.
    ///
    /// Matching is case-insensitive and ignores a trailing length or
    /// precision suffix, so `VARCHAR(128)` and `decimal(10, 2)` classify the
    /// same as their bare names. Names outside the table are `Unknown`.
    pub fn classify(type_name: &str) -> Self {
        let upper = type_name.trim().to_uppercase();
        let base = match upper.find('(') {
            Some(idx) => upper[..idx].trim_end(),
            None => upper.as_str(),
        };

        match base {
            "BIGINT" | "INT8" => Self::BigInteger,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "DECIMAL" | "DEC" => Self::Decimal,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => Self::Double,
            "FLOAT" => Self::Float,
            "INTEGER" | "INT" | "INT4" => Self::Integer,
            "NUMERIC" | "NUM" => Self::Numeric,
            "REAL" | "FLOAT4" => Self::Real,
            "SMALLINT" | "INT2" => Self::SmallInt,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => Self::Timestamp,
            "LONG VARCHAR" | "LONGVARCHAR" | "TEXT" => Self::LongText,
            "VARCHAR" | "CHAR" | "CHARACTER" | "CHARACTER VARYING" | "BPCHAR" | "NAME" => {
                Self::Text
            }
            "CLOB" => Self::Clob,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A result column as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,

    /// Driver-reported type name.
    pub type_name: String,
}

impl ColumnMeta {
    /// Creates a new column with the given name and reported type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One cell as read from the driver, before it is turned into text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    /// Any integer reading, including truncated DECIMAL/NUMERIC values.
    Int(i64),
    Double(f64),
    Single(f32),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Text(String),
    /// Non-null CLOB; contents are never materialized.
    Clob,
    /// Non-null cell of an unclassified column.
    Unknown,
}

impl Cell {
    /// Converts the cell to its display text.
    pub fn into_display(self) -> String {
        match self {
            Cell::Null => NULL_TEXT.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Double(f) => float_text(f),
            Cell::Single(f) => float_text(f),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Time(t) => t.format("%H:%M:%S").to_string(),
            Cell::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Cell::Text(s) => s,
            Cell::Clob => CLOB_TEXT.to_string(),
            Cell::Unknown => UNKNOWN_TEXT.to_string(),
        }
    }

    /// Decodes a non-null cell delivered as text by the driver.
    ///
    /// Postgres sends every value as text over the simple query protocol;
    /// the mock client stores its cells the same way.
    pub fn from_text(kind: ColumnKind, text: &str) -> Result<Cell> {
        let cell = match kind {
            ColumnKind::BigInteger | ColumnKind::Integer | ColumnKind::SmallInt => {
                Cell::Int(text.trim().parse().map_err(|e| bad_value(kind, text, e))?)
            }
            ColumnKind::Decimal | ColumnKind::Numeric => Cell::Int(truncate_decimal(text)?),
            ColumnKind::Boolean => Cell::Bool(parse_bool(text).ok_or_else(|| {
                BrowserError::query(format!("Invalid {kind} value '{text}'"))
            })?),
            ColumnKind::Double | ColumnKind::Real => {
                Cell::Double(text.trim().parse().map_err(|e| bad_value(kind, text, e))?)
            }
            ColumnKind::Float => {
                Cell::Single(text.trim().parse().map_err(|e| bad_value(kind, text, e))?)
            }
            ColumnKind::Date => Cell::Date(
                NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                    .map_err(|e| bad_value(kind, text, e))?,
            ),
            ColumnKind::Time => Cell::Time(
                NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f")
                    .map_err(|e| bad_value(kind, text, e))?,
            ),
            ColumnKind::Timestamp => Cell::Timestamp(parse_timestamp(text)?),
            ColumnKind::LongText | ColumnKind::Text => Cell::Text(text.to_string()),
            ColumnKind::Clob => Cell::Clob,
            ColumnKind::Unknown => Cell::Unknown,
        };
        Ok(cell)
    }
}

fn bad_value(kind: ColumnKind, text: &str, err: impl fmt::Display) -> BrowserError {
    BrowserError::query(format!("Invalid {kind} value '{text}': {err}"))
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" => Some(true),
        "f" | "false" | "0" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS[.f]`, the `T` separator, and a trailing
/// UTC offset. With an offset the wall-clock time as sent is kept.
fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts);
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(text, format) {
            return Ok(ts.naive_local());
        }
    }
    Err(BrowserError::query(format!(
        "Invalid {} value '{text}'",
        ColumnKind::Timestamp
    )))
}

/// Reads a decimal's text through a 64-bit integer, dropping the fraction.
///
/// Truncates toward zero: `12.75` reads as 12, `-0.5` as 0.
pub fn truncate_decimal(text: &str) -> Result<i64> {
    let text = text.trim();
    let integral = match text.find('.') {
        Some(idx) => &text[..idx],
        None => text,
    };
    let integral = match integral {
        "" | "-" | "+" => "0",
        other => other,
    };
    integral.parse::<i64>().map_err(|e| {
        BrowserError::query(format!(
            "Decimal value '{text}' cannot be read as a 64-bit integer: {e}"
        ))
    })
}

/// Canonical decimal text for a floating value.
///
/// Uses the shortest text that round-trips, with `.0` appended to integral
/// values so `1` reads as a float (`1.0`).
pub fn float_text<F: FloatText>(value: F) -> String {
    value.to_float_text()
}

/// Floating types with a canonical text form.
pub trait FloatText: Copy {
    fn to_float_text(self) -> String;
}

macro_rules! impl_float_text {
    ($($t:ty),*) => {$(
        impl FloatText for $t {
            fn to_float_text(self) -> String {
                let text = self.to_string();
                if self.is_finite() && !text.contains('.') {
                    format!("{text}.0")
                } else {
                    text
                }
            }
        }
    )*};
}

impl_float_text!(f32, f64);

/// Header plus rectangular string cells for one executed statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    /// Column names, in declaration order.
    #[serde(rename = "columns")]
    pub column_names: Vec<String>,

    /// Rows, in the order the engine returned them.
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Creates a table with the given header and rows.
    pub fn new(column_names: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { column_names, rows }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
