//! Remote collaborators the monitor polls.
//!
//! Implementations must be safe to share between the read and write
//! evaluators; the monitor holds them behind `Arc` and adds no locking.

use async_trait::async_trait;

use capwatch_core::{
    EvaluationWindow, ProvisionedCapacity, SourceResult, CONSUMED_READ_CAPACITY_UNITS,
    CONSUMED_WRITE_CAPACITY_UNITS, READ_THROTTLE_EVENTS, WRITE_THROTTLE_EVENTS,
};

/// Sum-aggregated table metrics.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Sum of `metric` for `table` over `window`.
    ///
    /// A window with no datapoints yields `Ok(0.0)`.
    async fn sum(
        &self,
        metric: &str,
        table: &str,
        window: &EvaluationWindow,
    ) -> SourceResult<f64>;

    async fn read_throttle_events(
        &self,
        table: &str,
        window: &EvaluationWindow,
    ) -> SourceResult<f64> {
        self.sum(READ_THROTTLE_EVENTS, table, window).await
    }

    async fn write_throttle_events(
        &self,
        table: &str,
        window: &EvaluationWindow,
    ) -> SourceResult<f64> {
        self.sum(WRITE_THROTTLE_EVENTS, table, window).await
    }

    async fn consumed_read_capacity_units(
        &self,
        table: &str,
        window: &EvaluationWindow,
    ) -> SourceResult<f64> {
        self.sum(CONSUMED_READ_CAPACITY_UNITS, table, window).await
    }

    async fn consumed_write_capacity_units(
        &self,
        table: &str,
        window: &EvaluationWindow,
    ) -> SourceResult<f64> {
        self.sum(CONSUMED_WRITE_CAPACITY_UNITS, table, window).await
    }
}

/// Current provisioned throughput of a table.
///
/// Never cached: capacity may change between ticks.
#[async_trait]
pub trait CapacityDescriptor: Send + Sync {
    async fn describe(&self, table: &str) -> SourceResult<ProvisionedCapacity>;
}
