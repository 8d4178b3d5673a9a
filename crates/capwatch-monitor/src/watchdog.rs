//! Liveness watchdog for evaluator checks.
//!
//! Each check arms a timer. If the guard is still alive when the timer
//! fires, a `LivenessViolation` is sent on the fatal channel; dropping the
//! guard first cancels the timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use capwatch_core::Direction;

use crate::error::LivenessViolation;

/// Arms per-check deadline timers that report to a fatal channel.
#[derive(Debug, Clone)]
pub struct Watchdog {
    table: String,
    deadline: Duration,
    fatal_tx: mpsc::UnboundedSender<LivenessViolation>,
}

impl Watchdog {
    pub fn new(
        table: impl Into<String>,
        deadline: Duration,
        fatal_tx: mpsc::UnboundedSender<LivenessViolation>,
    ) -> Self {
        Self {
            table: table.into(),
            deadline,
            fatal_tx,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Start the deadline timer for one check of `direction`.
    pub fn arm(&self, direction: Direction) -> WatchdogGuard {
        let violation = LivenessViolation {
            table: self.table.clone(),
            direction,
            check: direction.check_name(),
            deadline: self.deadline,
        };
        let deadline = self.deadline;
        let fatal_tx = self.fatal_tx.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            error!(
                table = %violation.table,
                %direction,
                deadline_ms = deadline.as_millis() as u64,
                "{} deadlock detected",
                violation.check
            );
            // The runner may already be gone during shutdown.
            let _ = fatal_tx.send(violation);
        });

        WatchdogGuard { timer }
    }
}

/// Disarms its timer when dropped.
#[derive(Debug)]
pub struct WatchdogGuard {
    timer: JoinHandle<()>,
}

impl WatchdogGuard {
    pub fn disarm(self) {}
}

impl Drop for WatchdogGuard {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watchdog(deadline: Duration) -> (Watchdog, mpsc::UnboundedReceiver<LivenessViolation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Watchdog::new("orders", deadline, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_check_fires_exactly_once() {
        let (dog, mut rx) = watchdog(Duration::from_secs(10));

        let guard = dog.arm(Direction::Read);
        tokio::time::sleep(Duration::from_secs(60)).await;

        let violation = rx.try_recv().unwrap();
        assert_eq!(violation.direction, Direction::Read);
        assert_eq!(violation.check, "checkReads");
        assert_eq!(violation.table, "orders");
        assert_eq!(violation.deadline, Duration::from_secs(10));
        assert_eq!(violation.deadline, dog.deadline());
        assert!(rx.try_recv().is_err());

        drop(guard);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_check_never_fires() {
        let (dog, mut rx) = watchdog(Duration::from_secs(10));

        let guard = dog.arm(Direction::Write);
        tokio::time::sleep(Duration::from_secs(9)).await;
        guard.disarm();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn each_armed_check_is_independent() {
        let (dog, mut rx) = watchdog(Duration::from_secs(10));

        let read = dog.arm(Direction::Read);
        let write = dog.arm(Direction::Write);
        write.disarm();
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(rx.try_recv().unwrap().direction, Direction::Read);
        assert!(rx.try_recv().is_err());
        drop(read);
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_is_harmless() {
        let (dog, rx) = watchdog(Duration::from_millis(1));
        drop(rx);
        let guard = dog.arm(Direction::Read);
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
    }
}
