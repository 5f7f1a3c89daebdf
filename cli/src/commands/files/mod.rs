mod execute;
mod output;

use clap::Args;

/// List directories and database files below the serve root
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sqliter files                    # List the serve root
  sqliter files reports/2024       # List a sub-directory
  sqliter files --root ./data -o json")]
pub struct FilesCmd {
    /// Directory relative to the serve root
    #[arg(default_value = "/")]
    pub dir: String,
}
