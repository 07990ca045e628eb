use anyhow::Result;
use clap::Parser;

mod cli;
mod interactive;

fn main() -> Result<()> {
    env_logger::init();
    cli::Cli::parse().run()
}
