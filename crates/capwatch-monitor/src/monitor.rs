//! Table monitor — read and write evaluators for one table.
//!
//! Each evaluator ticks on a fixed interval, runs one check under the
//! watchdog, and sleeps for the cooldown after a positive decision. The
//! two evaluators share nothing mutable; a flagged read side never delays
//! the write side.

use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use capwatch_core::{Direction, EvaluationWindow, MonitorSettings, SourceError};

use crate::decision::{Assessment, Reading};
use crate::error::{LivenessViolation, MonitorError, MonitorResult};
use crate::source::{CapacityDescriptor, MetricsSource};
use crate::watchdog::Watchdog;

/// Emitted when a direction needs more capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleSignal {
    pub table: String,
    pub assessment: Assessment,
}

/// Callback invoked with every `ScaleSignal`.
///
/// A notification hook only: the monitor never changes table capacity.
pub type ScaleCallback = Arc<dyn Fn(ScaleSignal) -> BoxFuture + Send + Sync>;

/// Future returned by a `ScaleCallback`.
pub type BoxFuture = std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;

/// Where an evaluator is in its tick cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorState {
    Idle,
    Checking,
    ScaleFlagged,
    NoAction,
    Failed,
}

/// Monitors provisioned capacity of a single table.
pub struct TableMonitor {
    settings: MonitorSettings,
    metrics: Arc<dyn MetricsSource>,
    capacity: Arc<dyn CapacityDescriptor>,
    on_scale_needed: Option<ScaleCallback>,
}

impl TableMonitor {
    pub fn new(
        settings: MonitorSettings,
        metrics: Arc<dyn MetricsSource>,
        capacity: Arc<dyn CapacityDescriptor>,
    ) -> Self {
        Self {
            settings,
            metrics,
            capacity,
            on_scale_needed: None,
        }
    }

    /// Set the callback notified when a direction needs scaling.
    pub fn with_scale_fn(mut self, f: ScaleCallback) -> Self {
        self.on_scale_needed = Some(f);
        self
    }

    pub fn table(&self) -> &str {
        &self.settings.table
    }

    /// Run one check for `direction` over the window ending now.
    pub async fn check(&self, direction: Direction) -> MonitorResult<Assessment> {
        let window = EvaluationWindow::looking_back(
            SystemTime::now(),
            self.settings.lookback,
            self.settings.evaluation_window,
        );
        self.check_window(direction, &window).await
    }

    /// Run one check for `direction` over `window`.
    ///
    /// All three fetches use the same window. The first failure cancels the
    /// remaining fetches and no decision is made.
    pub async fn check_window(
        &self,
        direction: Direction,
        window: &EvaluationWindow,
    ) -> MonitorResult<Assessment> {
        let table = self.settings.table.as_str();
        let consumed_metric = direction.consumed_metric();
        let throttle_metric = direction.throttle_metric();

        let (consumed, provisioned, throttled) = tokio::try_join!(
            async {
                self.metrics
                    .sum(consumed_metric, table, window)
                    .await
                    .map_err(fetch_failed(consumed_metric))
            },
            async {
                self.capacity
                    .describe(table)
                    .await
                    .map(|capacity| capacity.units(direction))
                    .map_err(fetch_failed(direction.provisioned_operation()))
            },
            async {
                self.metrics
                    .sum(throttle_metric, table, window)
                    .await
                    .map_err(fetch_failed(throttle_metric))
            },
        )?;

        let reading = Reading {
            consumed,
            provisioned,
            throttled,
        };
        let assessment =
            Assessment::evaluate(direction, reading, &self.settings.thresholds(direction));

        debug!(
            table,
            %direction,
            consumed,
            provisioned,
            throttled,
            limit = assessment.utilization_limit,
            scale_needed = assessment.scale_needed(),
            "capacity assessed"
        );

        Ok(assessment)
    }

    /// Run both evaluators until `shutdown` fires or a check stalls.
    ///
    /// Returns `Err` on the first liveness violation, after aborting both
    /// evaluators. On shutdown, in-flight evaluators get one poll interval to
    /// finish before they are aborted.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), LivenessViolation> {
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        let watchdog = Watchdog::new(
            self.settings.table.clone(),
            self.settings.watchdog_deadline(),
            fatal_tx,
        );

        info!(
            table = %self.settings.table,
            poll_ms = self.settings.poll_interval.as_millis() as u64,
            cooldown_secs = self.settings.cooldown.as_secs(),
            deadline_ms = watchdog.deadline().as_millis() as u64,
            "table monitor started"
        );

        let handles: Vec<(Direction, JoinHandle<()>)> = Direction::ALL
            .into_iter()
            .map(|direction| {
                let monitor = Arc::clone(&self);
                let watchdog = watchdog.clone();
                let shutdown = shutdown.clone();
                let handle = tokio::spawn(async move {
                    monitor.evaluate(direction, watchdog, shutdown).await;
                });
                (direction, handle)
            })
            .collect();
        drop(watchdog);

        tokio::select! {
            Some(violation) = fatal_rx.recv() => {
                error!(
                    table = %violation.table,
                    direction = %violation.direction,
                    error = %violation,
                    "liveness violation, stopping table monitor"
                );
                for (_, handle) in &handles {
                    handle.abort();
                }
                return Err(violation);
            }
            _ = shutdown.changed() => {
                info!(table = %self.settings.table, "table monitor shutting down");
            }
        }

        let drain = self.settings.poll_interval;
        for (direction, handle) in handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(drain, handle).await.is_err() {
                warn!(
                    table = %self.settings.table,
                    %direction,
                    "evaluator did not stop in time, aborting"
                );
                abort.abort();
            }
        }

        info!(table = %self.settings.table, "table monitor stopped");
        Ok(())
    }

    /// The tick loop for one direction.
    async fn evaluate(
        &self,
        direction: Direction,
        watchdog: Watchdog,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let table = self.settings.table.as_str();
        let poll = self.settings.poll_interval;

        let now = Instant::now();
        let mut ticker = tokio::time::interval_at(now.checked_add(poll).unwrap_or(now), poll);
        // A tick missed during cooldown fires once when the cooldown ends,
        // then the schedule resumes from there.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = EvaluatorState::Idle;
        debug!(table, %direction, ?state, "evaluator started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            state = EvaluatorState::Checking;
            info!(table, %direction, "checking {direction}: {table}");
            let guard = watchdog.arm(direction);

            let outcome = tokio::select! {
                outcome = self.check(direction) => outcome,
                _ = shutdown.changed() => break,
            };

            state = match outcome {
                Ok(assessment) if assessment.scale_needed() => {
                    tokio::select! {
                        _ = self.signal(assessment) => {}
                        _ = shutdown.changed() => break,
                    }
                    EvaluatorState::ScaleFlagged
                }
                Ok(_) => EvaluatorState::NoAction,
                Err(e) => {
                    error!(
                        table,
                        %direction,
                        operation = e.operation(),
                        error = %e,
                        "{}: check failed",
                        direction.check_name()
                    );
                    EvaluatorState::Failed
                }
            };
            guard.disarm();
            debug!(table, %direction, ?state, "check finished");

            if state == EvaluatorState::ScaleFlagged {
                info!(
                    table,
                    %direction,
                    cooldown_secs = self.settings.cooldown.as_secs(),
                    "cooling down"
                );
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.cooldown) => {}
                    _ = shutdown.changed() => break,
                }
            }
            state = EvaluatorState::Idle;
        }

        debug!(table, %direction, ?state, "evaluator stopped");
    }

    async fn signal(&self, assessment: Assessment) {
        let signal = ScaleSignal {
            table: self.settings.table.clone(),
            assessment,
        };

        match &self.on_scale_needed {
            Some(cb) => cb(signal).await,
            None => {
                let a = &signal.assessment;
                warn!(
                    table = %signal.table,
                    direction = %a.direction,
                    consumed = a.consumed,
                    provisioned = a.provisioned,
                    throttled = a.throttled,
                    over_utilized = a.over_utilized,
                    throttled_over_ceiling = a.throttled_over_ceiling,
                    "scale needed, no capacity action configured"
                );
            }
        }
    }
}

fn fetch_failed(operation: &'static str) -> impl FnOnce(SourceError) -> MonitorError {
    move |source| MonitorError::Fetch { operation, source }
}
