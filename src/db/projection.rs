//! Result-set-to-text projection.
//!
//! Every backend funnels its rows through here: columns are classified once,
//! before any row is read, and each cell is then read according to its
//! column's kind and turned into display text.

use super::{Cell, ColumnKind, ColumnMeta, ResultTable};
use crate::error::Result;
use crate::status::StatusReporter;
use tracing::warn;

/// Type name reported for an expression column that only produced NULLs.
const UNTYPED: &str = "NULL";

/// Classifies every column exactly once.
///
/// Each column that classifies as `Unknown` produces one diagnostic; the
/// query itself is not failed. An untyped all-NULL column is `Unknown`
/// without a diagnostic, since every cell of it renders as `NULL` anyway.
pub fn classify_columns(columns: &[ColumnMeta], reporter: &dyn StatusReporter) -> Vec<ColumnKind> {
    columns
        .iter()
        .map(|column| {
            let kind = ColumnKind::classify(&column.type_name);
            let untyped = column.type_name.trim().eq_ignore_ascii_case(UNTYPED);
            if kind == ColumnKind::Unknown && !untyped {
                warn!(
                    column = %column.name,
                    type_name = %column.type_name,
                    "Unknown data type"
                );
                reporter.report_error(
                    &format!("Unknown data type: {}", column.type_name),
                    &format!("column '{}' will be shown as UNKNOWN", column.name),
                );
            }
            kind
        })
        .collect()
}

/// Builds the string table for a fully materialized result set.
///
/// `read` is asked for the cell at (row, column index) given the column's
/// kind. It must return `Cell::Null` for SQL NULL; everything else is
/// rendered per kind.
pub fn project<R, F>(
    columns: &[ColumnMeta],
    rows: &[R],
    reporter: &dyn StatusReporter,
    mut read: F,
) -> Result<ResultTable>
where
    F: FnMut(&R, usize, ColumnKind) -> Result<Cell>,
{
    let kinds = classify_columns(columns, reporter);
    let column_names = columns.iter().map(|c| c.name.clone()).collect();

    let mut output = Vec::with_capacity(rows.len());
    for row in rows {
        let mut line = Vec::with_capacity(kinds.len());
        for (index, kind) in kinds.iter().enumerate() {
            line.push(read(row, index, *kind)?.into_display());
        }
        output.push(line);
    }

    Ok(ResultTable::new(column_names, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;
    use crate::status::RecordingReporter;
    use pretty_assertions::assert_eq;

    fn text_reader(row: &Vec<Option<&str>>, index: usize, kind: ColumnKind) -> Result<Cell> {
        match row[index] {
            None => Ok(Cell::Null),
            Some(text) => Cell::from_text(kind, text),
        }
    }

    #[test]
    fn test_classify_columns_known_types_emit_nothing() {
        let reporter = RecordingReporter::new();
        let columns = vec![
            ColumnMeta::new("ID", "INTEGER"),
            ColumnMeta::new("NAME", "VARCHAR"),
        ];
        let kinds = classify_columns(&columns, &reporter);

        assert_eq!(kinds, vec![ColumnKind::Integer, ColumnKind::Text]);
        assert!(reporter.diagnostics().is_empty());
        assert!(reporter.statuses().is_empty());
    }

    #[test]
    fn test_classify_columns_unknown_emits_one_diagnostic() {
        let reporter = RecordingReporter::new();
        let columns = vec![ColumnMeta::new("PHOTO", "BLOB")];
        let kinds = classify_columns(&columns, &reporter);

        assert_eq!(kinds, vec![ColumnKind::Unknown]);
        let diagnostics = reporter.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Unknown data type: BLOB");
        assert_eq!(reporter.statuses(), vec!["Error: Unknown data type: BLOB"]);
    }

    #[test]
    fn test_classify_columns_untyped_null_column_is_silent() {
        let reporter = RecordingReporter::new();
        let columns = vec![ColumnMeta::new("X", "INTEGER"), ColumnMeta::new("Y", "NULL")];
        let rows = vec![vec![Some("1"), None]];

        let table = project(&columns, &rows, &reporter, text_reader).unwrap();

        assert_eq!(table.rows, vec![vec!["1", "NULL"]]);
        assert!(reporter.diagnostics().is_empty());
        assert!(reporter.statuses().is_empty());
    }

    #[test]
    fn test_project_unknown_column_one_diagnostic_for_many_rows() {
        let reporter = RecordingReporter::new();
        let columns = vec![ColumnMeta::new("ID", "INT4"), ColumnMeta::new("RAW", "BYTEA")];
        let rows = vec![
            vec![Some("1"), Some("\\x01")],
            vec![Some("2"), None],
            vec![Some("3"), Some("\\x03")],
        ];

        let table = project(&columns, &rows, &reporter, text_reader).unwrap();

        assert_eq!(
            table.rows,
            vec![
                vec!["1", "UNKNOWN"],
                vec!["2", "NULL"],
                vec!["3", "UNKNOWN"],
            ]
        );
        assert_eq!(reporter.diagnostics().len(), 1);
    }

    #[test]
    fn test_project_null_in_every_kind() {
        let reporter = RecordingReporter::new();
        let type_names = [
            "BIGINT", "BOOLEAN", "DECIMAL", "DOUBLE", "FLOAT", "INTEGER", "NUMERIC", "REAL",
            "SMALLINT", "DATE", "TIME", "TIMESTAMP", "LONG VARCHAR", "VARCHAR", "CLOB", "BLOB",
        ];
        let columns: Vec<ColumnMeta> = type_names
            .iter()
            .enumerate()
            .map(|(i, t)| ColumnMeta::new(format!("C{i}"), *t))
            .collect();
        let rows = vec![vec![None; columns.len()]];

        let table = project(&columns, &rows, &reporter, text_reader).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert!(table.rows[0].iter().all(|cell| cell == "NULL"));
    }

    #[test]
    fn test_project_clob_never_materialized() {
        let reporter = RecordingReporter::new();
        let columns = vec![ColumnMeta::new("DOC", "CLOB")];
        let long = "x".repeat(100_000);
        let rows = vec![vec![Some("short")], vec![Some(long.as_str())]];

        let table = project(&columns, &rows, &reporter, text_reader).unwrap();

        assert_eq!(table.rows, vec![vec!["CLOB"], vec!["CLOB"]]);
    }

    #[test]
    fn test_project_preserves_header_and_row_order() {
        let reporter = RecordingReporter::new();
        let columns = vec![
            ColumnMeta::new("LASTNAME", "VARCHAR"),
            ColumnMeta::new("SALARY", "DECIMAL(9,2)"),
            ColumnMeta::new("ACTIVE", "BOOLEAN"),
        ];
        let rows = vec![
            vec![Some("HAAS"), Some("52750.00"), Some("true")],
            vec![Some("KWAN"), Some("38250.50"), Some("false")],
            vec![Some("LUCCHESI"), Some("46500.99"), None],
        ];

        let table = project(&columns, &rows, &reporter, text_reader).unwrap();

        assert_eq!(table.column_names, vec!["LASTNAME", "SALARY", "ACTIVE"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["HAAS", "52750", "true"],
                vec!["KWAN", "38250", "false"],
                vec!["LUCCHESI", "46500", "NULL"],
            ]
        );
    }

    #[test]
    fn test_project_propagates_read_errors() {
        let reporter = RecordingReporter::new();
        let columns = vec![ColumnMeta::new("N", "INTEGER")];
        let rows = vec![vec![Some("not a number")]];

        let result = project(&columns, &rows, &reporter, text_reader);
        assert!(matches!(result, Err(BrowserError::Query(_))));
    }

    #[test]
    fn test_project_empty_result_keeps_header() {
        let reporter = RecordingReporter::new();
        let columns = vec![ColumnMeta::new("X", "INTEGER")];
        let rows: Vec<Vec<Option<&str>>> = Vec::new();

        let table = project(&columns, &rows, &reporter, text_reader).unwrap();
        assert_eq!(table.column_names, vec!["X"]);
        assert!(table.is_empty());
    }
}
