mod execute;
mod output;

use clap::Args;

/// List the tables and views of a database
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sqliter tables /people.db
  sqliter tables reports/2024/sales.sqlite -o json")]
pub struct TablesCmd {
    /// Database path relative to the serve root
    pub path: String,
}
