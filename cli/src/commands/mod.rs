//! Command definitions and implementations.
//!
//! Each command is defined in its own module with:
//! - The command struct with clap attributes for CLI parsing
//! - `execute.rs` running it against an engine built from the config
//! - `output.rs` rendering its result

mod files;
mod query;
mod stream;
mod tables;

pub use files::FilesCmd;
pub use query::QueryCmd;
pub use stream::StreamCmd;
pub use tables::TablesCmd;

use clap::{Args, Subcommand};
use std::error::Error;

use db::{EngineConfig, QueryOptions};

use crate::output::{OutputFormat, Outputable};

/// Trait for executing commands with command-specific result types.
pub trait Execute {
    type Output: Outputable;

    fn execute(self, config: &EngineConfig) -> Result<Self::Output, Box<dyn Error>>;
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List directories and database files below the serve root
    Files(FilesCmd),

    /// List the tables and views of a database
    Tables(TablesCmd),

    /// Run a query and print every row
    Query(QueryCmd),

    /// Run a query and print rows in chunks as they are read
    Stream(StreamCmd),

    /// Catch-all for unknown commands
    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

impl Command {
    /// Execute the command and return formatted output
    pub fn run(self, config: &EngineConfig, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Files(cmd) => {
                let result = cmd.execute(config)?;
                Ok(result.format(format))
            }
            Command::Tables(cmd) => {
                let result = cmd.execute(config)?;
                Ok(result.format(format))
            }
            Command::Query(cmd) => {
                let result = cmd.execute(config)?;
                Ok(result.format(format))
            }
            Command::Stream(cmd) => {
                let result = cmd.execute(config)?;
                Ok(result.format(format))
            }
            Command::Unknown(args) => {
                Err(format!("Unknown command: {}", args.first().unwrap_or(&String::new())).into())
            }
        }
    }
}

/// Query arguments shared by `query` and `stream`.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Resource path: /dir/file.db[/table[start:end]][/col1,col2]
    pub path: String,

    /// Extra SQL predicate, embedded as given
    #[arg(long = "where", value_name = "SQL")]
    pub filter_where: Option<String>,

    /// Grid filter model as JSON (keyed by column)
    #[arg(long, value_name = "JSON")]
    pub filter_model: Option<String>,

    /// Column to sort by
    #[arg(long)]
    pub sort_col: Option<String>,

    /// Sort direction (asc or desc)
    #[arg(long, requires = "sort_col")]
    pub sort_dir: Option<String>,

    /// Rows to skip before the first returned row (requires --limit)
    #[arg(long, requires = "limit")]
    pub offset: Option<u64>,

    /// Maximum rows to return (replaces any slice in the path)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Return columns and total count without rows
    #[arg(long, default_value_t = false, conflicts_with = "limit")]
    pub force_zero_limit: bool,

    /// Skip the COUNT(*) query
    #[arg(long, default_value_t = false)]
    pub skip_count: bool,
}

impl QueryArgs {
    /// Convert to engine options. `--limit` and `--force-zero-limit` enable
    /// overrides; an offset only applies alongside one of them.
    pub fn to_options(&self) -> QueryOptions {
        let allow_override = self.limit.is_some() || self.force_zero_limit;
        QueryOptions {
            resource_path: self.path.clone(),
            filter_where: self.filter_where.clone().unwrap_or_default(),
            filter_model_json: self.filter_model.clone().unwrap_or_default(),
            sort_col: self.sort_col.clone().unwrap_or_default(),
            sort_dir: self.sort_dir.clone().unwrap_or_default(),
            offset: self.offset.unwrap_or(0),
            limit: self.limit.unwrap_or(0),
            force_zero_limit: self.force_zero_limit,
            allow_override,
            skip_total_count: self.skip_count,
        }
    }
}
