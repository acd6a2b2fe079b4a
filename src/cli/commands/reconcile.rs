//! Lifecycle reconciler CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{open_event_repository, parse_host, parse_timestamp};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, MAX_INTERVAL_SECS};
use crate::domain::ports::{Clock, EventRepository, FixedClock, NullViewInvalidator, SystemClock, ViewInvalidator};
use crate::services::{
    DaemonConfig, LifecycleReconciler, PassOutcome, PassReport, ReconcilerEvent, ReconcilerStatus,
    ReconcilerSupervisor,
};

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    #[command(subcommand)]
    pub command: ReconcileCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReconcileCommands {
    /// Run a single reconciliation pass
    Once {
        /// Host whose events are reconciled
        #[arg(long)]
        host: String,
        /// Evaluate live windows as of this instant (RFC3339) instead of now
        #[arg(long)]
        now: Option<String>,
    },
    /// Run the reconciler daemon until interrupted
    Run {
        /// Host whose events are reconciled
        #[arg(long)]
        host: String,
        /// Seconds between passes (overrides reconciler.interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct PassOutput {
    pub report: PassReport,
}

impl CommandOutput for PassOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut lines = vec![format!("Reconciliation pass for host {}:", report.host_id)];

        match report.outcome {
            PassOutcome::Completed => {}
            PassOutcome::Cancelled => lines.push("  Pass was cancelled.".to_string()),
            PassOutcome::FetchFailed(ref error) => {
                lines.push(format!("  Could not list events: {error}"));
                return lines.join("\n");
            }
        }

        lines.push(format!("  Open events:  {}", report.fetched));
        lines.push(format!("  Closed:       {}", report.closed.len()));
        for id in &report.closed {
            lines.push(format!("    - {id}"));
        }
        if !report.failed.is_empty() {
            lines.push(format!("  Failed:       {}", report.failed.len()));
            for (id, error) in &report.failed {
                lines.push(format!("    - {id}: {error}"));
            }
        }
        lines.push(format!(
            "  Views:        {}",
            if report.invalidated { "invalidated" } else { "unchanged" }
        ));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RunSummaryOutput {
    pub host_id: String,
    pub total_passes: u64,
    pub failed_passes: u64,
    pub skipped_passes: u64,
    pub total_closed: u64,
}

impl RunSummaryOutput {
    fn new(host_id: String, status: &ReconcilerStatus) -> Self {
        Self {
            host_id,
            total_passes: status.total_passes,
            failed_passes: status.failed_passes,
            skipped_passes: status.skipped_passes,
            total_closed: status.total_closed,
        }
    }
}

impl CommandOutput for RunSummaryOutput {
    fn to_human(&self) -> String {
        format!(
            "Reconciler for host {} stopped after {} pass(es): {} event(s) closed, {} failed pass(es), {} skipped tick(s)",
            self.host_id, self.total_passes, self.total_closed, self.failed_passes, self.skipped_passes
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ReconcileArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        ReconcileCommands::Once { host, now } => run_once(config, &host, now.as_deref(), json_mode).await,
        ReconcileCommands::Run { host, interval_secs } => {
            run_daemon(config, &host, interval_secs, json_mode).await
        }
    }
}

/// Wire the reconciler against the configured database.
///
/// The CLI process renders no cached views, so the invalidation signal goes
/// nowhere. Processes that serve dashboards pass a `CachedEventRepository`.
async fn build_reconciler(config: &Config, clock: Arc<dyn Clock>) -> Result<Arc<LifecycleReconciler>> {
    let repository: Arc<dyn EventRepository> = open_event_repository(config).await?;
    let invalidator: Arc<dyn ViewInvalidator> = Arc::new(NullViewInvalidator);

    Ok(Arc::new(LifecycleReconciler::new(
        repository,
        invalidator,
        clock,
        config.reconciler.live_duration(),
    )))
}

async fn run_once(config: &Config, host: &str, now: Option<&str>, json_mode: bool) -> Result<()> {
    let host_id = parse_host(host)?;
    let clock: Arc<dyn Clock> = match now {
        Some(raw) => Arc::new(FixedClock::new(parse_timestamp(raw)?)),
        None => Arc::new(SystemClock),
    };

    let reconciler = build_reconciler(config, clock).await?;
    let report = reconciler.run_pass(&host_id, &CancellationToken::new()).await;
    let fetch_failed = report.is_fetch_failure();

    output(&PassOutput { report }, json_mode);

    if fetch_failed {
        anyhow::bail!("Reconciliation pass for host {host_id} could not list events");
    }
    Ok(())
}

async fn run_daemon(config: &Config, host: &str, interval_secs: Option<u64>, json_mode: bool) -> Result<()> {
    let host_id = parse_host(host)?;

    let daemon_config = daemon_config(config, interval_secs)?;

    let reconciler = build_reconciler(config, Arc::new(SystemClock)).await?;
    let supervisor = ReconcilerSupervisor::new(reconciler, daemon_config.clone());

    if !json_mode {
        println!("Starting lifecycle reconciler for host {host_id}");
        println!("   Interval: {}s", daemon_config.interval.as_secs());
        println!("   Live window: {}s", config.reconciler.live_duration_secs);
        println!("   Press Ctrl-C to stop");
        println!();
    }

    let events = supervisor
        .activate(host_id.clone())
        .await
        .context("Reconciler did not start")?;
    let event_handler = tokio::spawn(report_events(events, json_mode));

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    tracing::info!(host_id = %host_id, "Interrupt received; stopping reconciler");

    let status = supervisor.status().await.unwrap_or_default();
    supervisor.deactivate().await;
    let _ = event_handler.await;

    output(&RunSummaryOutput::new(host_id.to_string(), &status), json_mode);
    Ok(())
}

/// Daemon settings from configuration, with the `--interval-secs` override
/// held to the same bounds as `reconciler.interval_secs`.
fn daemon_config(config: &Config, interval_secs: Option<u64>) -> Result<DaemonConfig> {
    let mut daemon_config = DaemonConfig::from(&config.reconciler);
    if let Some(secs) = interval_secs {
        anyhow::ensure!(
            (1..=MAX_INTERVAL_SECS).contains(&secs),
            "--interval-secs must be between 1 and {MAX_INTERVAL_SECS}"
        );
        daemon_config.interval = Duration::from_secs(secs);
    }
    Ok(daemon_config)
}

/// Print daemon events until the daemon stops.
async fn report_events(mut events: mpsc::Receiver<ReconcilerEvent>, json_mode: bool) {
    while let Some(event) = events.recv().await {
        match &event {
            ReconcilerEvent::Started { host_id } => {
                if !json_mode {
                    println!("Reconciler started for host {host_id}");
                }
            }
            ReconcilerEvent::PassStarted { run_number } => {
                tracing::debug!(run_number, "Pass started");
            }
            ReconcilerEvent::PassCompleted { run_number, report, duration_ms } => {
                if !json_mode && (!report.closed.is_empty() || !report.failed.is_empty()) {
                    println!(
                        "Pass #{run_number}: closed {}, failed {} ({duration_ms}ms)",
                        report.closed.len(),
                        report.failed.len()
                    );
                }
            }
            ReconcilerEvent::PassFailed { run_number, error } => {
                if !json_mode {
                    println!("Pass #{run_number} failed: {error}");
                }
            }
            ReconcilerEvent::PassSkipped { in_flight_run } => {
                tracing::debug!(in_flight_run, "Tick skipped");
            }
            ReconcilerEvent::Stopped { total_passes } => {
                if !json_mode {
                    println!("Reconciler stopped after {total_passes} pass(es)");
                }
                break;
            }
        }
    }
}
