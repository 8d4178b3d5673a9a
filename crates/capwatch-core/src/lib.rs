//! capwatch-core — shared types and configuration for capwatch.
//!
//! Holds the pieces every other crate agrees on: the `Direction`
//! descriptor, per-direction `Thresholds`, the `EvaluationWindow` a tick
//! queries, the provisioned capacity shape, the error type returned by
//! remote collaborators, and the `capwatch.toml` file model.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CapwatchConfig, ConfigError, MonitorSettings};
pub use error::{SourceError, SourceResult};
pub use types::*;
