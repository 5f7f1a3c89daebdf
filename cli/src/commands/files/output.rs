//! Output formatting for files command results.

use super::execute::FilesResult;
use crate::output::Outputable;
use db::EntryKind;

impl Outputable for FilesResult {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Files in {}", self.dir));
        lines.push(String::new());

        if self.entries.is_empty() {
            lines.push("No databases found.".to_string());
            return lines.join("\n");
        }

        for entry in &self.entries {
            match entry.kind {
                EntryKind::Directory => lines.push(format!("  {}/", entry.name)),
                EntryKind::Database => lines.push(format!("  {}", entry.name)),
            }
        }

        lines.join("\n")
    }
}
