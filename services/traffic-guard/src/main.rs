use std::path::PathBuf;

use anyhow::{Context, Result};
use cdt_notifier::NotificationFanout;
use cdt_traffic_guard::{AliyunClient, Guard, GuardConfig};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cdt-traffic-guard", version, about = "CDT traffic guard for Alibaba Cloud instances")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, env = "CDT_GUARD_CONFIG", default_value = "config.json", global = true)]
    config: PathBuf,

    /// Where the run log of `check` is written
    #[arg(long, env = "CDT_GUARD_LOG_FILE", default_value = "data.json", global = true)]
    log_file: PathBuf,

    /// Log filter used when RUST_LOG and LOG_LEVEL are unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Enforce the traffic threshold and write the run log
    Check,
    /// Send the daily usage digest
    Digest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = GuardConfig::load(&cli.config).context("failed to load configuration")?;
    let fanout = NotificationFanout::from_settings(&config.notification)
        .context("invalid notification settings")?;
    if fanout.is_empty() {
        warn!("no notification channels enabled");
    } else {
        info!(channels = ?fanout.channel_names(), "notification channels ready");
    }

    let cloud =
        AliyunClient::new(config.endpoints.clone()).context("failed to build cloud client")?;
    let guard = Guard::new(&config, &cloud, &fanout);

    match cli.command {
        Command::Check => {
            let log = guard.run_check().await;
            let json = log
                .write_to(&cli.log_file)
                .context("failed to persist run log")?;
            println!("{json}");
        }
        Command::Digest => {
            let summary = guard.run_digest().await;
            info!(
                sent = summary.sent,
                skipped = summary.skipped,
                failed = summary.failed,
                "digest complete"
            );
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("LOG_LEVEL").map(EnvFilter::new))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
