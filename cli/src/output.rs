//! Output formatting for command results.
//!
//! Supports multiple output formats: table (human-readable), JSON, and toon.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;

use db::RowValues;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Token-efficient toon format
    Toon,
}

/// Trait for types that can be formatted for output
pub trait Outputable: Serialize {
    /// Format as a human-readable table
    fn to_table(&self) -> String;

    /// Format according to the specified output format
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.to_table(),
            OutputFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
            OutputFormat::Toon => {
                let json_value = serde_json::to_value(self).unwrap_or_default();
                toon::encode(&json_value, None)
            }
        }
    }
}

/// Render one cell for table output. NULL is shown literally.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render rows as an aligned grid with a header and separator line.
///
/// Trailing padding is trimmed from every line.
pub fn format_grid(columns: &[String], rows: &[RowValues]) -> Vec<String> {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(line(columns));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(line(row.as_slice()));
    }
    lines
}

/// Describe a total count, which is -1 when it was skipped or failed.
pub fn total_text(total_count: i64) -> String {
    if total_count < 0 {
        "unknown".to_string()
    } else {
        total_count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(null), "NULL")]
    #[case(json!("Alice"), "Alice")]
    #[case(json!(30), "30")]
    #[case(json!(1.5), "1.5")]
    fn test_cell_text(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(cell_text(&value), expected);
    }

    #[rstest]
    fn test_format_grid_aligns_columns() {
        let columns = vec!["name".to_string(), "age".to_string()];
        let rows = vec![
            vec![json!("Alice"), json!(30)],
            vec![json!("Bob"), json!(null)],
        ];
        assert_eq!(
            format_grid(&columns, &rows),
            vec!["name  | age", "------+-----", "Alice | 30", "Bob   | NULL"]
        );
    }

    #[rstest]
    fn test_format_grid_without_rows() {
        let columns = vec!["id".to_string()];
        assert_eq!(format_grid(&columns, &[]), vec!["id", "--"]);
    }

    #[rstest]
    #[case(-1, "unknown")]
    #[case(0, "0")]
    #[case(42, "42")]
    fn test_total_text(#[case] total: i64, #[case] expected: &str) {
        assert_eq!(total_text(total), expected);
    }
}
