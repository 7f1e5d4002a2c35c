use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber on stderr (stdout carries command output)
/// and routes `log` records from the library through it.
pub fn init(json: bool, verbose: bool) -> Result<()> {
    tracing_log::LogTracer::init().context("Failed to install log bridge")?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("Failed to install tracing subscriber")?;

    Ok(())
}
