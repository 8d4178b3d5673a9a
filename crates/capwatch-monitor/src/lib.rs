//! capwatch-monitor — capacity monitoring for a single DynamoDB table.
//!
//! Two evaluators (read, write) poll the table's consumed capacity,
//! provisioned capacity and throttle counters, and flag when the table is
//! running hot. A flagged direction cools down before it evaluates again.
//!
//! # Architecture
//!
//! ```text
//! TableMonitor::run()
//!   ├── read evaluator task ──┐
//!   │     tick → Watchdog::arm → check(Read) → decide → cooldown?
//!   ├── write evaluator task ─┤
//!   │     tick → Watchdog::arm → check(Write) → decide → cooldown?
//!   └── fatal channel ◄───────┘ LivenessViolation ends the run
//! ```
//!
//! # Decision
//!
//! ```text
//! limit        = provisioned * (1 - headroom)
//! scale_needed = consumed > limit  ||  throttled > throttle_ceiling
//! ```
//!
//! Detection only: a flagged direction emits a `ScaleSignal` to an
//! optional callback. No capacity update is ever issued.

pub mod decision;
pub mod error;
pub mod monitor;
pub mod source;
pub mod watchdog;

pub use decision::{Assessment, Reading};
pub use error::{LivenessViolation, MonitorError};
pub use monitor::{BoxFuture, EvaluatorState, ScaleCallback, ScaleSignal, TableMonitor};
pub use source::{CapacityDescriptor, MetricsSource};
pub use watchdog::{Watchdog, WatchdogGuard};
