//! Output formatting for stream command results.
//!
//! JSON output is one line per chunk, in emission order.

use tracing::warn;

use super::execute::StreamResult;
use crate::output::{format_grid, total_text, OutputFormat, Outputable};

impl Outputable for StreamResult {
    fn to_table(&self) -> String {
        let Some(meta) = self.metadata() else {
            return "No results.".to_string();
        };

        let columns = meta.columns.clone().unwrap_or_default();
        let rows: Vec<_> = self.chunks[1..]
            .iter()
            .flat_map(|c| c.values.iter().cloned())
            .collect();

        let mut lines = vec![
            format!("Query: {}", meta.sql.as_deref().unwrap_or_default()),
            format!("Total: {}", total_text(meta.total_count.unwrap_or(-1))),
            String::new(),
        ];
        lines.extend(format_grid(&columns, &rows));
        lines.push(String::new());
        lines.push(format!(
            "{} rows in {} chunks",
            self.stats.rows, self.stats.chunks
        ));
        if let Some(error) = self.error() {
            lines.push(format!("Stopped early: {}", error));
        }
        lines.join("\n")
    }

    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.to_table(),
            OutputFormat::Json => self
                .chunks
                .iter()
                .filter_map(|chunk| match serde_json::to_string(chunk) {
                    Ok(line) => Some(line),
                    Err(e) => {
                        warn!(error = %e, "skipping chunk that failed to serialize");
                        None
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Toon => {
                let json_value = serde_json::to_value(self).unwrap_or_default();
                toon::encode(&json_value, None)
            }
        }
    }
}
