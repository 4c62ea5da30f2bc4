use clap::Parser;
use miette::Result;

mod cli;
mod replay;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    miette::set_panic_hook();

    let args = Cli::parse();

    match args.action {
        Commands::Replay(opts) => opts.replay()?,
    }

    Ok(())
}
