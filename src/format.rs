//! Output formatting for listings and conversion reports.
//!
//! Listings render as an ASCII table (like the MySQL CLI), a Markdown table,
//! or JSON. Reports are plain text lines followed by a summary.

use crate::error::{FixerError, FixerResult};
use crate::models::{BatchReport, ColumnDescriptor, Outcome, TableDescriptor};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use unicode_width::UnicodeWidthStr;

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Pretty-printed JSON array
    Json,
}

const TABLE_HEADERS: [&str; 4] = ["Schema", "Table", "Charset", "Collation"];

const COLUMN_HEADERS: [&str; 9] = [
    "Table", "Column", "Type", "Null", "Key", "Default", "Length", "Charset", "Collation",
];

pub fn render_tables(
    tables: &[TableDescriptor],
    format: OutputFormat,
    elapsed_ms: u64,
) -> FixerResult<String> {
    match format {
        OutputFormat::Json => to_json(tables),
        OutputFormat::Table | OutputFormat::Markdown => {
            let rows: Vec<Vec<JsonValue>> = tables
                .iter()
                .map(|t| {
                    vec![
                        json!(t.schema),
                        json!(t.name),
                        json!(t.character_set),
                        json!(t.collation),
                    ]
                })
                .collect();
            Ok(render_rows(&TABLE_HEADERS, &rows, format, elapsed_ms))
        }
    }
}

pub fn render_columns(
    columns: &[ColumnDescriptor],
    format: OutputFormat,
    elapsed_ms: u64,
) -> FixerResult<String> {
    match format {
        OutputFormat::Json => to_json(columns),
        OutputFormat::Table | OutputFormat::Markdown => {
            let rows: Vec<Vec<JsonValue>> = columns
                .iter()
                .map(|c| {
                    vec![
                        json!(c.table),
                        json!(c.column),
                        json!(c.column_type),
                        json!(if c.nullable { "YES" } else { "NO" }),
                        json!(c.column_key),
                        json!(c.default_value),
                        json!(c.max_length),
                        json!(c.character_set),
                        json!(c.collation),
                    ]
                })
                .collect();
            Ok(render_rows(&COLUMN_HEADERS, &rows, format, elapsed_ms))
        }
    }
}

/// Per-item lines followed by the batch summary.
pub fn render_report(report: &BatchReport) -> String {
    let mut output = String::new();
    for result in &report.results {
        let name = result.item.qualified_name();
        let line = match &result.outcome {
            Outcome::Converted { .. } => format!("  converted  {name}"),
            Outcome::Skipped { reason } => format!("  skipped    {name} ({reason})"),
            Outcome::Failed { error, sql_state } => match sql_state {
                Some(state) => format!("  FAILED     {name}: [{state}] {error}"),
                None => format!("  FAILED     {name}: {error}"),
            },
        };
        output.push_str(&line);
        output.push('\n');
    }
    output.push_str(&format!("{} [{}]\n", report, report.mode));
    output
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> FixerResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| FixerError::internal(format!("Failed to serialize output: {e}")))
}

fn render_rows(
    headers: &[&str],
    rows: &[Vec<JsonValue>],
    format: OutputFormat,
    elapsed_ms: u64,
) -> String {
    if format == OutputFormat::Markdown {
        format_as_markdown(headers, rows)
    } else {
        format_as_table(headers, rows, elapsed_ms)
    }
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn format_as_table(headers: &[&str], rows: &[Vec<JsonValue>], elapsed_ms: u64) -> String {
    if rows.is_empty() {
        return format!("Empty set ({:.2} sec)\n", elapsed_ms as f64 / 1000.0);
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(format_value(value).width());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = separator.clone();
    let header: String = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("| {} ", pad(h, *w, Align::Center)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let line: String = row
            .iter()
            .zip(&widths)
            .map(|(value, w)| {
                let align = if value.is_number() {
                    Align::Right
                } else {
                    Align::Left
                };
                format!("| {} ", pad(&format_value(value), *w, align))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }
    output.push_str(&separator);

    let row_text = if rows.len() == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)\n",
        rows.len(),
        row_text,
        elapsed_ms as f64 / 1000.0
    ));
    output
}

pub fn format_as_markdown(headers: &[&str], rows: &[Vec<JsonValue>]) -> String {
    if rows.is_empty() {
        return "*Empty set*\n".to_string();
    }

    let mut output: String = headers.iter().map(|h| format!("| {h} ")).collect::<String>() + "|\n";
    output.push_str(&(headers.iter().map(|_| "|---").collect::<String>() + "|\n"));

    for row in rows {
        let line: String = row
            .iter()
            .map(|value| format!("| {} ", format_value(value).replace('|', "\\|")))
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }

    output.push_str(&format!("\n*{} rows*\n", rows.len()));
    output
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

/// Pad by display width; `format!` width specifiers count chars, not columns.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{text}{}", " ".repeat(fill)),
        Align::Right => format!("{}{text}", " ".repeat(fill)),
        Align::Center => {
            let left = fill / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(fill - left))
        }
    }
}
