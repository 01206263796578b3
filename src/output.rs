//! Rendering of result tables for the command-line front-end.

use crate::db::ResultTable;
use crate::error::{BrowserError, Result};

/// Output format for result tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text grid with a row count footer.
    #[default]
    Text,
    /// `{"columns": [...], "rows": [[...]]}`.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Renders a table in the requested format.
pub fn render(table: &ResultTable, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_table(table)),
        OutputFormat::Json => to_json(table),
    }
}

/// Serializes a table as compact JSON.
pub fn to_json(table: &ResultTable) -> Result<String> {
    serde_json::to_string(table)
        .map_err(|e| BrowserError::internal(format!("Failed to serialize result: {e}")))
}

/// Formats a table as an aligned grid.
///
/// Statements that produce no columns render only the footer.
pub fn format_table(table: &ResultTable) -> String {
    let footer = row_count_footer(table.row_count());
    if table.column_names.is_empty() {
        return footer;
    }

    let mut widths: Vec<usize> = table.column_names.iter().map(|h| display_width(h)).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(display_width(cell));
            }
        }
    }

    let mut output = String::new();

    output.push_str(&format_line(&table.column_names, &widths));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join("─┼─"));
    output.push('\n');

    for row in &table.rows {
        output.push_str(&format_line(row, &widths));
        output.push('\n');
    }

    output.push_str(&footer);
    output
}

/// Pads every cell but the last to its column width. Cell text itself is
/// never trimmed, so trailing blanks of CHAR values survive.
fn format_line(cells: &[String], widths: &[usize]) -> String {
    let last = cells.len().saturating_sub(1);
    let padded: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if i == last {
                return cell.clone();
            }
            let width = widths.get(i).copied().unwrap_or(0);
            let pad = width.saturating_sub(display_width(cell));
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    padded.join(" │ ")
}

// Counts chars rather than bytes so accented text lines up.
fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn row_count_footer(count: usize) -> String {
    if count == 1 {
        "(1 row)".to_string()
    } else {
        format!("({count} rows)")
    }
}
