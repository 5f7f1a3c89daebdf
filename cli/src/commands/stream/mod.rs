mod execute;
mod output;

use clap::Args;

use super::QueryArgs;

/// Run a query and print rows in chunks as they are read
///
/// With `-o json` every chunk is printed as one JSON line: first the
/// metadata chunk (columns, totalCount, sql), then the data chunks.
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sqliter stream /big.db/events -o json             # NDJSON chunks
  sqliter stream /big.db/events --batch-size 500
  sqliter stream /big.db/events --timeout-ms 2000   # Give up after 2s")]
pub struct StreamCmd {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Rows per chunk (overrides the configured batch size)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=100_000))]
    pub batch_size: Option<u64>,

    /// Cancel the stream once this many milliseconds have passed
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}
