mod execute;
mod output;

use clap::Args;

use super::QueryArgs;

/// Run a query and print every row
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sqliter query /people.db                          # Whole table (inferred)
  sqliter query '/people.db/people[0:10]/name,age'  # Slice and projection
  sqliter query /people.db/people --sort-col age --sort-dir desc --limit 5
  sqliter query /people.db/people \\
      --filter-model '{\"age\":{\"filterType\":\"number\",\"type\":\"greaterThan\",\"filter\":30}}'")]
pub struct QueryCmd {
    #[command(flatten)]
    pub query: QueryArgs,
}
