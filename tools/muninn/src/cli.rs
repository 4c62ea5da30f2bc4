use clap::Parser;

use crate::replay::Replay;

#[derive(Parser)]
#[clap(name = "muninn", about = "Replays recorded state estimation inputs")]
pub struct Cli {
    #[clap(subcommand)]
    pub action: Commands,
}

#[derive(Parser)]
pub enum Commands {
    Replay(Replay),
}
