//! capwatchd — the capwatch daemon.
//!
//! Watches one DynamoDB table's consumed capacity and throttle counters and
//! flags when either direction needs more provisioned capacity.
//!
//! # Usage
//!
//! ```text
//! capwatchd monitor --table orders --region us-east-1
//! capwatchd check --table orders --config capwatch.toml
//! ```
//!
//! `monitor` runs until Ctrl-C. If a check stalls past its watchdog
//! deadline the daemon exits non-zero so a supervisor can restart it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use capwatch_core::config::ThresholdsConfig;
use capwatch_core::{CapwatchConfig, MonitorSettings};

mod run;

#[derive(Parser)]
#[command(
    name = "capwatchd",
    about = "DynamoDB capacity monitor",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor a table until interrupted.
    Monitor {
        #[command(flatten)]
        table: TableArgs,
    },
    /// Run one read and one write check and print the result as JSON.
    Check {
        #[command(flatten)]
        table: TableArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Default)]
struct TableArgs {
    /// The table to monitor.
    #[arg(long)]
    table: Option<String>,

    /// The region where the table is located (default: us-east-1).
    #[arg(long)]
    region: Option<String>,

    /// Override the AWS endpoint (e.g. a local emulator).
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Path to a capwatch.toml file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Time between checks, e.g. "5s".
    #[arg(long)]
    poll_interval: Option<String>,

    /// Pause after a direction is flagged, e.g. "60s".
    #[arg(long)]
    cooldown: Option<String>,

    /// Read headroom fraction (0.0–1.0).
    #[arg(long)]
    read_headroom: Option<f64>,

    /// Write headroom fraction (0.0–1.0).
    #[arg(long)]
    write_headroom: Option<f64>,

    /// Read throttle events tolerated per window.
    #[arg(long)]
    read_throttle_ceiling: Option<f64>,

    /// Write throttle events tolerated per window.
    #[arg(long)]
    write_throttle_ceiling: Option<f64>,
}

impl TableArgs {
    /// Resolve the config file (if any) with flags layered on top.
    fn settings(&self) -> anyhow::Result<MonitorSettings> {
        let file = match &self.config {
            Some(path) => CapwatchConfig::from_file(path)?,
            None => CapwatchConfig::default(),
        };
        Ok(file.merge(self.overrides()).resolve()?)
    }

    fn overrides(&self) -> CapwatchConfig {
        CapwatchConfig {
            table: self.table.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            poll_interval: self.poll_interval.clone(),
            cooldown: self.cooldown.clone(),
            evaluation_window: None,
            lookback: None,
            read: thresholds(self.read_headroom, self.read_throttle_ceiling),
            write: thresholds(self.write_headroom, self.write_throttle_ceiling),
        }
    }
}

fn thresholds(headroom: Option<f64>, throttle_ceiling: Option<f64>) -> Option<ThresholdsConfig> {
    (headroom.is_some() || throttle_ceiling.is_some()).then_some(ThresholdsConfig {
        headroom,
        throttle_ceiling,
    })
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,capwatch=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Monitor { table } => run::run_monitor(table.settings()?).await,
        Command::Check { table } => run::run_check(table.settings()?).await,
    }
}
