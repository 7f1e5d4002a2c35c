mod cli;
mod logging;
mod response;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init(args.log_json, args.verbose)?;

    let success = cli::run(args).await?;
    if !success {
        std::process::exit(1);
    }
    Ok(())
}
