//! Scale-needed decision for one direction of one tick.

use serde::Serialize;

use capwatch_core::{Direction, Thresholds};

/// The three values a check fetches for one direction, from the same window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub consumed: f64,
    pub provisioned: i64,
    pub throttled: f64,
}

/// Outcome of a completed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub direction: Direction,
    pub consumed: f64,
    pub provisioned: i64,
    pub throttled: f64,
    /// `provisioned * (1 - headroom)`.
    pub utilization_limit: f64,
    pub throttle_ceiling: f64,
    /// Consumed units crossed the utilization limit.
    pub over_utilized: bool,
    /// Throttle events crossed the ceiling.
    pub throttled_over_ceiling: bool,
}

impl Assessment {
    /// Apply the decision rule to `reading`.
    ///
    /// Either clause alone is enough; they are not weighted.
    pub fn evaluate(direction: Direction, reading: Reading, thresholds: &Thresholds) -> Self {
        let utilization_limit = thresholds.utilization_limit(reading.provisioned);
        Self {
            direction,
            consumed: reading.consumed,
            provisioned: reading.provisioned,
            throttled: reading.throttled,
            utilization_limit,
            throttle_ceiling: thresholds.throttle_ceiling,
            over_utilized: reading.consumed > utilization_limit,
            throttled_over_ceiling: reading.throttled > thresholds.throttle_ceiling,
        }
    }

    pub fn scale_needed(&self) -> bool {
        self.over_utilized || self.throttled_over_ceiling
    }
}
