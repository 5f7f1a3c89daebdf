//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure and shared setup.
//! Individual command definitions are in the `commands` module.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use db::EngineConfig;

use crate::commands::Command;
use crate::config::ConfigFile;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and query SQLite files below a serve root", long_about = None)]
pub struct Args {
    /// Directory holding the database files (overrides the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Path to a JSON config file
    ///
    /// If not specified, `.sqliter.json` in the current directory is used
    /// when present; built-in defaults otherwise.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Load the engine settings, applying `--root` on top of the config file.
pub fn resolve_engine_config(args: &Args) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = ConfigFile::load(args.config.as_deref())?.engine;
    if let Some(root) = &args.root {
        config.serve_folder = root.clone();
    }
    Ok(config)
}

fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Log to stderr. `RUST_LOG` takes precedence over `-v`.
pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
