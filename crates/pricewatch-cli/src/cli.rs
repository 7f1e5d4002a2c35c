use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use pricewatch::config::apply_env_overrides;
use pricewatch::{load_config, Orchestrator, PricewatchConfig, WorkerConfig};
use serde::Serialize;

use crate::response::ApiResponse;

const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Parser)]
#[command(
    name = "pricewatch",
    version,
    about = "Supervise the pricing scraper and browse its analyses"
)]
pub struct Cli {
    /// Config file (JSON or YAML). Defaults to the user config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Module root, overriding the config file and PRICEWATCH_ROOT
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the persisted run state
    Status,
    /// Run the scraper in the foreground until it exits; Ctrl-C stops it
    Start,
    /// Stop the active scraper run
    Stop,
    /// Run the analysis script on a completed scrape
    Analyze,
    /// Report whether the analysis lags behind the scrape data
    Outdated,
    /// List analysis snapshots, newest first
    Snapshots {
        #[arg(long)]
        limit: Option<usize>,
        /// Ignore the limit and list every snapshot
        #[arg(long, conflicts_with = "limit")]
        all: bool,
    },
    /// Print the live daily pricing rows
    Data,
    /// Print the scrape history, newest first
    History,
    /// Fetch an artifact: analysis, data, progress, history, run-state,
    /// archive-analysis:<YYYYMMDD>, archive-data:<YYYYMMDD>, log:<run id>
    File {
        target: String,
        /// Write the contents here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read or change the worker's own settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the worker's current settings
    Get,
    /// Apply a JSON object of SCREAMING_CASE settings
    Set { json: String },
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pricewatch").join(CONFIG_FILE_NAME))
}

fn resolve_config(explicit: Option<&Path>, root: Option<&Path>) -> Result<PricewatchConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| default_config_path().filter(|p| p.is_file()));

    let mut config = match path {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let mut config = PricewatchConfig::default();
            apply_env_overrides(&mut config);
            config
        }
    };

    if let Some(root) = root {
        config.module_root = root.to_path_buf();
    }
    Ok(config)
}

/// Runs one command and prints its response. Returns whether it succeeded.
pub async fn run(args: Cli) -> Result<bool> {
    let config = resolve_config(args.config.as_deref(), args.root.as_deref())?;
    info!("Using module root {}", config.module_root.display());
    let orchestrator = Orchestrator::new(config);

    match args.command {
        Command::Status => ApiResponse::ok(orchestrator.get_status()).print(),
        Command::Start => start(&orchestrator).await,
        Command::Stop => ApiResponse::from_result(orchestrator.stop_run().await).print(),
        Command::Analyze => ApiResponse::from_result(orchestrator.run_analyzer().await).print(),
        Command::Outdated => ApiResponse::ok(Outdated {
            outdated: orchestrator.is_outdated(),
        })
        .print(),
        Command::Snapshots { limit, all } => {
            let snapshots = if all {
                orchestrator.get_all_snapshots()
            } else {
                orchestrator.get_snapshots(limit)
            };
            ApiResponse::ok(snapshots).print()
        }
        Command::Data => ApiResponse::ok(orchestrator.get_daily_pricing_data()).print(),
        Command::History => ApiResponse::ok(orchestrator.get_history()).print(),
        Command::File { target, output } => file(&orchestrator, &target, output.as_deref()),
        Command::Config(ConfigCommand::Get) => {
            ApiResponse::from_result(orchestrator.get_worker_config().await).print()
        }
        Command::Config(ConfigCommand::Set { json }) => {
            let update: WorkerConfig =
                serde_json::from_str(&json).context("Config update must be a JSON object")?;
            let result = orchestrator.update_worker_config(&update).await;
            ApiResponse::from_result(result.map(|()| update)).print()
        }
    }
}

#[derive(Debug, Serialize)]
struct Outdated {
    outdated: bool,
}

/// The monitor task lives in this process, so the command stays attached
/// until the worker exits and its terminal state is recorded.
async fn start(orchestrator: &Orchestrator) -> Result<bool> {
    let run_id = match orchestrator.start_run().await {
        Ok(run_id) => run_id,
        Err(e) => return ApiResponse::<()>::err(e.to_string()).print(),
    };
    info!("Run {} started", run_id);

    let completion = orchestrator.wait_for_completion();
    tokio::pin!(completion);

    tokio::select! {
        outcome = &mut completion => ApiResponse::from_result(outcome).print(),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping run {}", run_id);
            if let Err(e) = orchestrator.stop_run().await {
                warn!("Failed to stop run {}: {}", run_id, e);
            }
            ApiResponse::from_result(completion.await).print()
        }
    }
}

fn file(orchestrator: &Orchestrator, target: &str, output: Option<&Path>) -> Result<bool> {
    let artifact = match orchestrator.get_file(target) {
        Ok(artifact) => artifact,
        Err(e) => return ApiResponse::<()>::err(e.to_string()).print(),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &artifact.contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            ApiResponse::ok(artifact).print()
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&artifact.contents)?;
            stdout.flush()?;
            Ok(true)
        }
    }
}
