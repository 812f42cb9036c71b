use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use toolkit_id::{
    BackoffKind, DEFAULT_EPOCH_MILLIS, GeneratorConfig, SnowflakeGenerator, SystemClock,
};

/// Runtime configuration for the `toolkit-id` binary.
///
/// The generator partition and epoch are parsed from CLI arguments or
/// environment variables. They are validated once, up front, so a
/// misconfigured deployment fails before minting anything.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "toolkit-id",
    version,
    about = "Mint and inspect Snowflake-style IDs"
)]
pub struct CliArgs {
    /// Datacenter partition of the generator, `0..=31`.
    ///
    /// Environment variable: `TOOLKIT_ID_DATACENTER_ID`
    #[arg(
        long,
        env = "TOOLKIT_ID_DATACENTER_ID",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub datacenter_id: i64,

    /// Worker partition of the generator within its datacenter, `0..=31`.
    ///
    /// Every process minting IDs at the same time must use a distinct
    /// `(datacenter_id, worker_id)` pair.
    ///
    /// Environment variable: `TOOLKIT_ID_WORKER_ID`
    #[arg(
        long,
        env = "TOOLKIT_ID_WORKER_ID",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub worker_id: i64,

    /// Epoch of the timestamp field, in Unix milliseconds.
    ///
    /// Must not be in the future. Decoding uses the same epoch to recover
    /// absolute times.
    ///
    /// Environment variable: `TOOLKIT_ID_EPOCH_MILLIS`
    #[arg(
        long,
        env = "TOOLKIT_ID_EPOCH_MILLIS",
        default_value_t = DEFAULT_EPOCH_MILLIS as i64,
        allow_negative_numbers = true
    )]
    pub epoch_millis: i64,

    /// How to wait when the sequence is exhausted or the clock is behind:
    /// `spin`, `yield` or `sleep`.
    ///
    /// Environment variable: `TOOLKIT_ID_BACKOFF`
    #[arg(long, env = "TOOLKIT_ID_BACKOFF", default_value = "spin")]
    pub backoff: BackoffKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mint IDs and print them one per line.
    Mint {
        /// Number of IDs to mint.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Print the fields packed into an ID.
    Decode {
        /// The ID in its decimal form.
        id: String,
    },
}

/// Validated runtime state, including the generator every command shares.
#[derive(Debug)]
pub struct CliConfig {
    pub generator: SnowflakeGenerator<SystemClock, BackoffKind>,
    pub backoff: BackoffKind,
    pub command: Command,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let config = GeneratorConfig::new(args.datacenter_id, args.worker_id, args.epoch_millis);
        let generator = SnowflakeGenerator::with_parts(config, SystemClock, args.backoff)
            .context("invalid generator configuration")?;

        if let Command::Mint { count: 0 } = args.command {
            bail!("--count must be greater than 0");
        }

        Ok(Self {
            generator,
            backoff: args.backoff,
            command: args.command,
        })
    }
}
