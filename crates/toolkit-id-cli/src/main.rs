#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::commands::{decode, mint};
use cli::config::{CliArgs, CliConfig, Command};
use cli::telemetry::init_logging;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_logging()?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());

    match &config.command {
        Command::Mint { count } => mint(&config, *count, &mut out),
        Command::Decode { id } => decode(&config, id, &mut out),
    }
}
