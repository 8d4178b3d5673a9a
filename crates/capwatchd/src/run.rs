//! Daemon modes: the monitor loop and the one-shot check.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use capwatch_aws::{CloudWatchMetrics, DynamoCapacity};
use capwatch_core::{Direction, MonitorSettings};
use capwatch_monitor::{Assessment, TableMonitor};

/// Output of `capwatchd check`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub table: String,
    pub scale_needed: bool,
    pub assessments: Vec<Assessment>,
}

async fn connect(settings: MonitorSettings) -> TableMonitor {
    let sdk =
        capwatch_aws::load_sdk_config(&settings.region, settings.endpoint_url.as_deref()).await;
    TableMonitor::new(
        settings,
        Arc::new(CloudWatchMetrics::new(&sdk)),
        Arc::new(DynamoCapacity::new(&sdk)),
    )
}

/// Run the monitor until Ctrl-C or a liveness violation.
pub async fn run_monitor(settings: MonitorSettings) -> anyhow::Result<()> {
    info!(table = %settings.table, region = %settings.region, "capwatchd starting");
    let monitor = Arc::new(connect(settings).await);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl-C handler");
                // Keep the sender alive so the monitor is not shut down.
                std::future::pending::<()>().await;
            }
        }
    });

    let result = monitor.run(shutdown_rx).await;
    signal.abort();

    result.context("table monitor aborted")?;
    info!("capwatchd stopped");
    Ok(())
}

/// Check both directions once and print the report.
pub async fn run_check(settings: MonitorSettings) -> anyhow::Result<()> {
    let monitor = connect(settings).await;
    let report = check_report(&monitor).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub async fn check_report(monitor: &TableMonitor) -> anyhow::Result<CheckReport> {
    let mut assessments = Vec::with_capacity(Direction::ALL.len());
    for direction in Direction::ALL {
        let assessment = monitor
            .check(direction)
            .await
            .with_context(|| format!("{} failed", direction.check_name()))?;
        assessments.push(assessment);
    }

    Ok(CheckReport {
        table: monitor.table().to_string(),
        scale_needed: assessments.iter().any(Assessment::scale_needed),
        assessments,
    })
}
