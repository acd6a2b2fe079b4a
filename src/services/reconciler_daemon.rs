//! Lifecycle reconciler background daemon.
//!
//! Runs reconciliation passes for one host:
//! - one pass immediately on start (configurable)
//! - one pass per interval tick afterwards
//! - out-of-band passes on request via the handle
//!
//! A tick that fires while the previous pass is still running is skipped.
//! Stopping the daemon cancels its token; the token is checked before every
//! pass and before every transition, so nothing is applied after a stop.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::models::{HostId, ReconcilerConfig, MAX_INTERVAL_SECS};
use crate::services::lifecycle_reconciler::{LifecycleReconciler, PassOutcome, PassReport};

/// Capacity of the daemon event channel. Events are dropped when it is full.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Shortest tick period the timer accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timer period actually used for `requested`, kept within
/// `[MIN_INTERVAL, MAX_INTERVAL_SECS]` so the deadline arithmetic cannot overflow.
fn effective_interval(requested: Duration) -> Duration {
    requested.clamp(MIN_INTERVAL, Duration::from_secs(MAX_INTERVAL_SECS))
}

/// Configuration for the reconciler daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Interval between reconciliation passes.
    pub interval: Duration,
    /// Whether to run a pass immediately on start.
    pub run_on_startup: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
            run_on_startup: true,
        }
    }
}

impl DaemonConfig {
    /// Create config with custom interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }
}

impl From<&ReconcilerConfig> for DaemonConfig {
    fn from(config: &ReconcilerConfig) -> Self {
        Self {
            interval: config.interval(),
            run_on_startup: config.run_on_startup,
        }
    }
}

/// Event emitted by the reconciler daemon.
#[derive(Debug, Clone)]
pub enum ReconcilerEvent {
    /// Daemon started for a host.
    Started { host_id: HostId },
    /// Pass started.
    PassStarted { run_number: u64 },
    /// Pass finished (possibly cancelled part-way).
    PassCompleted {
        run_number: u64,
        report: PassReport,
        duration_ms: u64,
    },
    /// Pass could not list events, or panicked.
    PassFailed { run_number: u64, error: String },
    /// Tick skipped because a pass was still running.
    PassSkipped { in_flight_run: u64 },
    /// Daemon stopped.
    Stopped { total_passes: u64 },
}

/// Status of the reconciler daemon.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerStatus {
    /// Whether the daemon loop is running.
    pub running: bool,
    /// Passes started.
    pub total_passes: u64,
    /// Passes that failed to fetch or panicked.
    pub failed_passes: u64,
    /// Ticks skipped by the in-flight guard.
    pub skipped_passes: u64,
    /// Events closed across all passes.
    pub total_closed: u64,
    /// When the last pass finished, read from the reconciler's clock.
    pub last_pass_at: Option<DateTime<Utc>>,
}

/// State shared between the daemon loop, its pass tasks, and the handle.
struct DaemonCore {
    reconciler: Arc<LifecycleReconciler>,
    host_id: HostId,
    cancel: CancellationToken,
    status: RwLock<ReconcilerStatus>,
    in_flight: AtomicBool,
    run_counter: AtomicU64,
}

/// Clears the in-flight flag when a pass task ends, however it ends.
struct InFlightGuard(Arc<DaemonCore>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

fn emit(tx: &mpsc::Sender<ReconcilerEvent>, event: ReconcilerEvent) {
    // Never block the loop on a slow or absent listener.
    let _ = tx.try_send(event);
}

impl DaemonCore {
    /// Spawn a pass unless one is already running.
    async fn start_pass(self: &Arc<Self>, tx: &mpsc::Sender<ReconcilerEvent>) -> Option<JoinHandle<()>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let in_flight_run = self.run_counter.load(Ordering::Acquire);
            self.status.write().await.skipped_passes += 1;
            tracing::debug!(host_id = %self.host_id, in_flight_run, "Previous pass still running; skipping tick");
            emit(tx, ReconcilerEvent::PassSkipped { in_flight_run });
            return None;
        }

        let guard = InFlightGuard(Arc::clone(self));
        let run_number = self.run_counter.fetch_add(1, Ordering::AcqRel) + 1;
        self.status.write().await.total_passes += 1;

        let core = Arc::clone(self);
        let tx = tx.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            core.execute_pass(run_number, &tx).await;
        }))
    }

    async fn execute_pass(&self, run_number: u64, tx: &mpsc::Sender<ReconcilerEvent>) {
        emit(tx, ReconcilerEvent::PassStarted { run_number });

        let start = Instant::now();
        let result = AssertUnwindSafe(self.reconciler.run_pass(&self.host_id, &self.cancel))
            .catch_unwind()
            .await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut status = self.status.write().await;
        status.last_pass_at = Some(self.reconciler.now());

        match result {
            Ok(report) => {
                if let PassOutcome::FetchFailed(ref error) = report.outcome {
                    status.failed_passes += 1;
                    emit(tx, ReconcilerEvent::PassFailed { run_number, error: error.clone() });
                    return;
                }

                status.total_closed += report.closed.len() as u64;
                tracing::debug!(
                    host_id = %self.host_id,
                    run_number,
                    fetched = report.fetched,
                    closed = report.closed.len(),
                    failed = report.failed.len(),
                    duration_ms,
                    "Reconciliation pass finished"
                );
                emit(tx, ReconcilerEvent::PassCompleted { run_number, report, duration_ms });
            }
            Err(panic) => {
                let error = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                status.failed_passes += 1;
                tracing::error!(host_id = %self.host_id, run_number, error = %error, "Reconciliation pass panicked");
                emit(tx, ReconcilerEvent::PassFailed { run_number, error });
            }
        }
    }
}

/// Handle to control a running reconciler daemon.
///
/// Dropping the handle stops the daemon.
pub struct ReconcilerHandle {
    core: Arc<DaemonCore>,
    trigger: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl ReconcilerHandle {
    /// Host this daemon reconciles.
    pub fn host_id(&self) -> &HostId {
        &self.core.host_id
    }

    /// Request the daemon to stop. No pass or transition starts afterwards.
    pub fn stop(&self) {
        self.core.cancel.cancel();
    }

    /// Check if stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.core.cancel.is_cancelled()
    }

    /// Request an out-of-band pass. Skipped if a pass is already running.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Get current daemon status.
    pub async fn status(&self) -> ReconcilerStatus {
        self.core.status.read().await.clone()
    }

    /// Stop the daemon and wait for the loop and any in-flight pass to end.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(host_id = %self.core.host_id, error = %e, "Reconciler daemon task failed");
            }
        }
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.core.cancel.cancel();
    }
}

/// Lifecycle reconciler background daemon for one host.
pub struct ReconcilerDaemon {
    core: Arc<DaemonCore>,
    config: DaemonConfig,
    trigger: Arc<Notify>,
}

impl ReconcilerDaemon {
    /// Create a new daemon for `host_id`.
    pub fn new(reconciler: Arc<LifecycleReconciler>, host_id: HostId, config: DaemonConfig) -> Self {
        Self {
            core: Arc::new(DaemonCore {
                reconciler,
                host_id,
                cancel: CancellationToken::new(),
                status: RwLock::new(ReconcilerStatus::default()),
                in_flight: AtomicBool::new(false),
                run_counter: AtomicU64::new(0),
            }),
            config,
            trigger: Arc::new(Notify::new()),
        }
    }

    /// Start the daemon loop on the current tokio runtime.
    pub fn spawn(self) -> (ReconcilerHandle, mpsc::Receiver<ReconcilerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let core = Arc::clone(&self.core);
        let trigger = Arc::clone(&self.trigger);
        let task = tokio::spawn(self.run_loop(tx));

        (
            ReconcilerHandle {
                core,
                trigger,
                task: Some(task),
            },
            rx,
        )
    }

    /// Main daemon loop.
    async fn run_loop(self, tx: mpsc::Sender<ReconcilerEvent>) {
        let core = self.core;
        let interval = effective_interval(self.config.interval);
        if interval != self.config.interval {
            tracing::warn!(
                host_id = %core.host_id,
                requested_ms = u64::try_from(self.config.interval.as_millis()).unwrap_or(u64::MAX),
                interval_secs = interval.as_secs(),
                "Reconciler interval out of range; clamped"
            );
        }

        core.status.write().await.running = true;
        tracing::info!(host_id = %core.host_id, interval_secs = interval.as_secs(), "Lifecycle reconciler started");
        emit(&tx, ReconcilerEvent::Started { host_id: core.host_id.clone() });

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut current = None;
        if self.config.run_on_startup && !core.cancel.is_cancelled() {
            current = core.start_pass(&tx).await;
        }

        loop {
            tokio::select! {
                biased;
                () = core.cancel.cancelled() => break,
                _ = ticker.tick() => {}
                () = self.trigger.notified() => {}
            }

            if core.cancel.is_cancelled() {
                break;
            }
            if let Some(task) = core.start_pass(&tx).await {
                current = Some(task);
            }
        }

        // The in-flight pass observes the cancelled token and stops applying.
        if let Some(task) = current {
            let _ = task.await;
        }

        let total_passes = {
            let mut status = core.status.write().await;
            status.running = false;
            status.total_passes
        };
        tracing::info!(host_id = %core.host_id, total_passes, "Lifecycle reconciler stopped");
        emit(&tx, ReconcilerEvent::Stopped { total_passes });
    }
}
