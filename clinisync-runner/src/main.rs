//! clinisync runner
//!
//! Runs one sync pass from the upstream practice-management API into the
//! local document store, prints the report and exits. Schedule it with cron
//! or a systemd timer.
//!
//! Usage:
//!   clinisync-runner --config clinisync.json

use anyhow::{Context, Result};
use clap::Parser;
use clinisync_runner::{load_config, run_once};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clinisync-runner")]
#[command(about = "Sync practice data into the local document store")]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "clinisync.json")]
    config: PathBuf,

    /// Upstream API key, overriding the config file
    #[arg(long, env = "CLINISYNC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let fallback = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .compact()
        .init();

    let config = load_config(&args.config)?.with_api_key(args.api_key);
    info!("clinisync runner starting (source: {})", config.source.base_url);

    let report = run_once(config).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to encode report")?
    );

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            "Pass incomplete: {} failed resources, {} failed records",
            report.failed_resources().len(),
            report.failed_merges()
        );
        Ok(ExitCode::FAILURE)
    }
}
