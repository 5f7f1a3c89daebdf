//! Output formatting for query command results.

use crate::output::{format_grid, total_text, Outputable};
use db::QueryResult;

impl Outputable for QueryResult {
    fn to_table(&self) -> String {
        let mut lines = vec![
            format!("Query: {}", self.sql),
            format!("Total: {}", total_text(self.total_count)),
            String::new(),
        ];

        if self.columns.is_empty() {
            lines.push("No columns.".to_string());
            return lines.join("\n");
        }

        lines.extend(format_grid(&self.columns, &self.rows));
        lines.push(String::new());
        lines.push(match self.rows.len() {
            1 => "1 row".to_string(),
            n => format!("{} rows", n),
        });

        lines.join("\n")
    }
}
