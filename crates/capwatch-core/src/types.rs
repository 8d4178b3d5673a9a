//! Domain types shared by the monitor and its collaborators.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};

/// CloudWatch namespace that scopes every DynamoDB table metric.
pub const DYNAMODB_NAMESPACE: &str = "AWS/DynamoDB";

/// Metric dimension that identifies the table.
pub const TABLE_NAME_DIMENSION: &str = "TableName";

pub const CONSUMED_READ_CAPACITY_UNITS: &str = "ConsumedReadCapacityUnits";
pub const CONSUMED_WRITE_CAPACITY_UNITS: &str = "ConsumedWriteCapacityUnits";
pub const READ_THROTTLE_EVENTS: &str = "ReadThrottleEvents";
pub const WRITE_THROTTLE_EVENTS: &str = "WriteThrottleEvents";

// ── Direction ──────────────────────────────────────────────────────

/// Which side of the table's capacity an evaluator watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// Both directions, in evaluator start order.
    pub const ALL: [Direction; 2] = [Direction::Read, Direction::Write];

    /// Metric holding consumed capacity units for this direction.
    pub fn consumed_metric(self) -> &'static str {
        match self {
            Direction::Read => CONSUMED_READ_CAPACITY_UNITS,
            Direction::Write => CONSUMED_WRITE_CAPACITY_UNITS,
        }
    }

    /// Metric holding throttled request counts for this direction.
    pub fn throttle_metric(self) -> &'static str {
        match self {
            Direction::Read => READ_THROTTLE_EVENTS,
            Direction::Write => WRITE_THROTTLE_EVENTS,
        }
    }

    /// Operation name attached to a failed provisioned-capacity lookup.
    pub fn provisioned_operation(self) -> &'static str {
        match self {
            Direction::Read => "ReadUnitsProvisioned",
            Direction::Write => "WriteUnitsProvisioned",
        }
    }

    /// Name of the check this direction runs, used for logs and the watchdog.
    pub fn check_name(self) -> &'static str {
        match self {
            Direction::Read => "checkReads",
            Direction::Write => "checkWrites",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

// ── Thresholds ─────────────────────────────────────────────────────

/// Decision thresholds for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Fraction of provisioned capacity kept as slack (0.0–1.0).
    pub headroom: f64,
    /// Throttle events tolerated per window before flagging.
    pub throttle_ceiling: f64,
}

impl Thresholds {
    pub const DEFAULT_HEADROOM: f64 = 0.1;
    pub const DEFAULT_THROTTLE_CEILING: f64 = 0.0;

    pub fn new(headroom: f64, throttle_ceiling: f64) -> Self {
        Self {
            headroom,
            throttle_ceiling,
        }
    }

    /// Consumed units above which utilization alone flags a scale.
    pub fn utilization_limit(&self, provisioned: i64) -> f64 {
        provisioned as f64 * (1.0 - self.headroom)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HEADROOM, Self::DEFAULT_THROTTLE_CEILING)
    }
}

// ── Capacity ───────────────────────────────────────────────────────

/// Provisioned throughput reported for a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedCapacity {
    pub read: i64,
    pub write: i64,
}

impl ProvisionedCapacity {
    pub fn units(&self, direction: Direction) -> i64 {
        match direction {
            Direction::Read => self.read,
            Direction::Write => self.write,
        }
    }
}

// ── Evaluation window ──────────────────────────────────────────────

/// The span `[start, start + length)` a metric sum is aggregated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationWindow {
    pub start: SystemTime,
    pub length: Duration,
}

impl EvaluationWindow {
    pub fn new(start: SystemTime, length: Duration) -> Self {
        Self { start, length }
    }

    /// Window starting `lookback` before `now`.
    pub fn looking_back(now: SystemTime, lookback: Duration, length: Duration) -> Self {
        let start = now.checked_sub(lookback).unwrap_or(SystemTime::UNIX_EPOCH);
        Self { start, length }
    }

    pub fn end(&self) -> SystemTime {
        self.start + self.length
    }

    /// Aggregation period in seconds.
    ///
    /// CloudWatch only accepts periods that are positive multiples of 60.
    pub fn period_secs(&self) -> SourceResult<i32> {
        let secs = self.length.as_secs();
        if secs == 0 || secs % 60 != 0 || self.length.subsec_nanos() != 0 {
            return Err(SourceError::InvalidWindow(format!(
                "length must be a whole number of minutes, got {}s",
                self.length.as_secs_f64()
            )));
        }
        i32::try_from(secs)
            .map_err(|_| SourceError::InvalidWindow(format!("length {secs}s is too long")))
    }
}
