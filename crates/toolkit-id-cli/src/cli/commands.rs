use std::io::Write;

use anyhow::Context;
use toolkit_id::SnowflakeId;

use crate::cli::config::CliConfig;

/// Mints `count` IDs and writes them to `out`, one per line.
pub fn mint(config: &CliConfig, count: usize, out: &mut impl Write) -> anyhow::Result<()> {
    let generator = &config.generator;
    let settings = generator.config();

    tracing::info!(
        count,
        datacenter_id = settings.datacenter_id(),
        worker_id = settings.worker_id(),
        epoch_millis = settings.epoch_millis(),
        backoff = ?config.backoff,
        "minting ids"
    );

    for _ in 0..count {
        writeln!(out, "{}", generator.next_id())?;
    }
    out.flush()?;
    Ok(())
}

/// Parses `id` and writes its decoded fields to `out`.
pub fn decode(config: &CliConfig, id: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let id: SnowflakeId = id
        .trim()
        .parse()
        .with_context(|| format!("`{id}` is not a decimal snowflake id"))?;

    if !id.is_valid() {
        tracing::warn!(%id, "reserved top bit is set; this id was not minted by a snowflake generator");
    }

    let epoch = config.generator.config().epoch_millis();
    writeln!(out, "id            : {id}")?;
    writeln!(out, "timestamp     : {} ms after epoch {epoch}", id.timestamp())?;
    writeln!(out, "unix_millis   : {}", id.unix_millis(epoch))?;
    writeln!(out, "datacenter_id : {}", id.datacenter_id())?;
    writeln!(out, "worker_id     : {}", id.worker_id())?;
    writeln!(out, "sequence      : {}", id.sequence())?;
    out.flush()?;
    Ok(())
}
