use clap::Parser;

mod cli;
mod commands;
mod config;
pub mod output;
#[macro_use]
mod test_macros;
use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    cli::init_tracing(args.verbose);

    let engine_config = cli::resolve_engine_config(&args)?;
    let output = args.command.run(&engine_config, args.format)?;
    println!("{}", output);
    Ok(())
}
