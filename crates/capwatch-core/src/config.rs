//! capwatch.toml configuration parser.
//!
//! Every field is optional in the file. `CapwatchConfig::resolve` fills in
//! defaults, validates, and produces the `MonitorSettings` a monitor is
//! constructed from.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::types::{Direction, Thresholds};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);
pub const DEFAULT_EVALUATION_WINDOW: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(5 * 60);

/// Upper bound for `poll_interval` and `cooldown`.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("table must be set")]
    MissingTable,

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapwatchConfig {
    pub table: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub poll_interval: Option<String>,
    pub cooldown: Option<String>,
    pub evaluation_window: Option<String>,
    pub lookback: Option<String>,
    pub read: Option<ThresholdsConfig>,
    pub write: Option<ThresholdsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    pub headroom: Option<f64>,
    pub throttle_ceiling: Option<f64>,
}

/// Fully resolved settings for one monitored table.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub table: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub evaluation_window: Duration,
    pub lookback: Duration,
    pub read: Thresholds,
    pub write: Thresholds,
}

impl MonitorSettings {
    /// Settings with all defaults for `table`.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cooldown: DEFAULT_COOLDOWN,
            evaluation_window: DEFAULT_EVALUATION_WINDOW,
            lookback: DEFAULT_LOOKBACK,
            read: Thresholds::default(),
            write: Thresholds::default(),
        }
    }

    pub fn thresholds(&self, direction: Direction) -> Thresholds {
        match direction {
            Direction::Read => self.read,
            Direction::Write => self.write,
        }
    }

    /// How long a single check may run before the watchdog fires.
    pub fn watchdog_deadline(&self) -> Duration {
        self.poll_interval.saturating_mul(2)
    }
}

impl CapwatchConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merge(mut self, other: CapwatchConfig) -> Self {
        self.table = other.table.or(self.table);
        self.region = other.region.or(self.region);
        self.endpoint_url = other.endpoint_url.or(self.endpoint_url);
        self.poll_interval = other.poll_interval.or(self.poll_interval);
        self.cooldown = other.cooldown.or(self.cooldown);
        self.evaluation_window = other.evaluation_window.or(self.evaluation_window);
        self.lookback = other.lookback.or(self.lookback);
        self.read = merge_thresholds(self.read, other.read);
        self.write = merge_thresholds(self.write, other.write);
        self
    }

    /// Apply defaults and validate.
    pub fn resolve(&self) -> Result<MonitorSettings, ConfigError> {
        let table = self
            .table
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingTable)?;

        let mut settings = MonitorSettings::for_table(table);
        if let Some(region) = &self.region {
            settings.region = region.clone();
        }
        settings.endpoint_url = self.endpoint_url.clone();

        settings.poll_interval =
            duration_field("poll_interval", &self.poll_interval, DEFAULT_POLL_INTERVAL)?;
        settings.cooldown = duration_field("cooldown", &self.cooldown, DEFAULT_COOLDOWN)?;
        settings.evaluation_window = duration_field(
            "evaluation_window",
            &self.evaluation_window,
            DEFAULT_EVALUATION_WINDOW,
        )?;
        settings.lookback = duration_field("lookback", &self.lookback, DEFAULT_LOOKBACK)?;
        settings.read = resolve_thresholds(Direction::Read, self.read.as_ref())?;
        settings.write = resolve_thresholds(Direction::Write, self.write.as_ref())?;

        if settings.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll_interval must be positive".into()));
        }
        for (field, value) in [
            ("poll_interval", settings.poll_interval),
            ("cooldown", settings.cooldown),
        ] {
            if value > MAX_INTERVAL {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be at most {}h, got {}s",
                    MAX_INTERVAL.as_secs() / 3600,
                    value.as_secs()
                )));
            }
        }
        let window_secs = settings.evaluation_window.as_secs();
        if window_secs == 0
            || window_secs % 60 != 0
            || settings.evaluation_window.subsec_nanos() != 0
            || settings.evaluation_window > MAX_INTERVAL
        {
            return Err(ConfigError::Invalid(
                "evaluation_window must be a whole number of minutes between 1m and 24h".into(),
            ));
        }
        if settings.lookback != settings.evaluation_window {
            warn!(
                lookback_secs = settings.lookback.as_secs(),
                window_secs,
                "lookback differs from evaluation window; consecutive ticks will leave gaps or overlap"
            );
        }

        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn merge_thresholds(
    base: Option<ThresholdsConfig>,
    over: Option<ThresholdsConfig>,
) -> Option<ThresholdsConfig> {
    match (base, over) {
        (Some(b), Some(o)) => Some(ThresholdsConfig {
            headroom: o.headroom.or(b.headroom),
            throttle_ceiling: o.throttle_ceiling.or(b.throttle_ceiling),
        }),
        (b, o) => o.or(b),
    }
}

fn resolve_thresholds(
    direction: Direction,
    cfg: Option<&ThresholdsConfig>,
) -> Result<Thresholds, ConfigError> {
    let headroom = cfg
        .and_then(|c| c.headroom)
        .unwrap_or(Thresholds::DEFAULT_HEADROOM);
    let ceiling = cfg
        .and_then(|c| c.throttle_ceiling)
        .unwrap_or(Thresholds::DEFAULT_THROTTLE_CEILING);

    if !(0.0..=1.0).contains(&headroom) {
        return Err(ConfigError::Invalid(format!(
            "{direction}.headroom must be within 0.0..=1.0, got {headroom}"
        )));
    }
    if !ceiling.is_finite() || ceiling < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{direction}.throttle_ceiling must be a non-negative number, got {ceiling}"
        )));
    }
    Ok(Thresholds::new(headroom, ceiling))
}

fn duration_field(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
            field,
            value: raw.clone(),
        }),
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_table(table: &str) -> CapwatchConfig {
        CapwatchConfig {
            table: Some(table.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_applies_defaults() {
        let settings = with_table("orders").resolve().unwrap();
        assert_eq!(settings, MonitorSettings::for_table("orders"));
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.evaluation_window, Duration::from_secs(300));
        assert_eq!(settings.watchdog_deadline(), Duration::from_secs(10));
    }

    #[test]
    fn missing_or_blank_table_is_rejected() {
        assert!(matches!(
            CapwatchConfig::default().resolve(),
            Err(ConfigError::MissingTable)
        ));
        assert!(matches!(
            with_table("  ").resolve(),
            Err(ConfigError::MissingTable)
        ));
    }

    #[test]
    fn parse_full_file() {
        let toml_str = r#"
table = "orders"
region = "eu-west-1"
endpoint_url = "http://localhost:4566"
poll_interval = "10s"
cooldown = "2m"
evaluation_window = "5m"
lookback = "5m"

[read]
headroom = 0.25
throttle_ceiling = 3

[write]
headroom = 0.5
"#;
        let settings = CapwatchConfig::from_toml_str(toml_str)
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert_eq!(settings.poll_interval, Duration::from_secs(10));
        assert_eq!(settings.cooldown, Duration::from_secs(120));
        assert_eq!(settings.read, Thresholds::new(0.25, 3.0));
        assert_eq!(settings.write, Thresholds::new(0.5, 0.0));
        assert_eq!(settings.thresholds(Direction::Write).headroom, 0.5);
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capwatch.toml");
        std::fs::write(&path, "table = \"events\"\ncooldown = \"30s\"\n").unwrap();

        let settings = CapwatchConfig::from_file(&path).unwrap().resolve().unwrap();
        assert_eq!(settings.table, "events");
        assert_eq!(settings.cooldown, Duration::from_secs(30));
    }

    #[test]
    fn from_file_missing_path_is_read_error() {
        let err = CapwatchConfig::from_file(Path::new("/nonexistent/capwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn merge_prefers_overrides() {
        let file = CapwatchConfig {
            table: Some("from-file".into()),
            region: Some("eu-west-1".into()),
            read: Some(ThresholdsConfig {
                headroom: Some(0.3),
                throttle_ceiling: Some(2.0),
            }),
            ..Default::default()
        };
        let cli = CapwatchConfig {
            table: Some("from-cli".into()),
            read: Some(ThresholdsConfig {
                headroom: Some(0.2),
                throttle_ceiling: None,
            }),
            ..Default::default()
        };

        let settings = file.merge(cli).resolve().unwrap();
        assert_eq!(settings.table, "from-cli");
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.read, Thresholds::new(0.2, 2.0));
    }

    #[test]
    fn headroom_out_of_range_is_rejected() {
        let mut cfg = with_table("orders");
        cfg.write = Some(ThresholdsConfig {
            headroom: Some(1.5),
            throttle_ceiling: None,
        });
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("write.headroom"));
    }

    #[test]
    fn negative_ceiling_is_rejected() {
        let mut cfg = with_table("orders");
        cfg.read = Some(ThresholdsConfig {
            headroom: None,
            throttle_ceiling: Some(-1.0),
        });
        assert!(matches!(cfg.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn window_must_be_whole_minutes() {
        let mut cfg = with_table("orders");
        cfg.evaluation_window = Some("90s".into());
        assert!(matches!(cfg.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut cfg = with_table("orders");
        cfg.poll_interval = Some("0s".into());
        assert!(matches!(cfg.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_duration_names_the_field() {
        let mut cfg = with_table("orders");
        cfg.cooldown = Some("soon".into());
        let err = cfg.resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration { field: "cooldown", .. }
        ));
    }

    #[test]
    fn round_trips_through_toml() {
        let mut cfg = with_table("orders");
        cfg.poll_interval = Some("5s".into());
        let text = cfg.to_toml_string().unwrap();
        assert!(text.contains("orders"));
        let back = CapwatchConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.poll_interval.as_deref(), Some("5s"));
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn parse_duration_rejects_minute_overflow() {
        assert_eq!(parse_duration("307445734561825861m"), None);

        let mut cfg = with_table("orders");
        cfg.cooldown = Some("307445734561825861m".into());
        assert!(matches!(
            cfg.resolve(),
            Err(ConfigError::InvalidDuration { field: "cooldown", .. })
        ));
    }

    #[test]
    fn oversized_intervals_are_rejected() {
        let mut cfg = with_table("orders");
        cfg.poll_interval = Some("18446744073709551615s".into());
        let err = cfg.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("poll_interval"));

        let mut cfg = with_table("orders");
        cfg.cooldown = Some("90000s".into());
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("cooldown"));

        let mut cfg = with_table("orders");
        cfg.evaluation_window = Some("1500m".into());
        assert!(matches!(cfg.resolve(), Err(ConfigError::Invalid(_))));

        let mut cfg = with_table("orders");
        cfg.poll_interval = Some("1440m".into());
        let settings = cfg.resolve().unwrap();
        assert_eq!(settings.watchdog_deadline(), Duration::from_secs(2 * 24 * 60 * 60));
    }

    #[test]
    fn watchdog_deadline_saturates() {
        let mut settings = MonitorSettings::for_table("orders");
        settings.poll_interval = Duration::MAX;
        assert_eq!(settings.watchdog_deadline(), Duration::MAX);
    }

    #[test]
    fn lookback_differing_from_window_is_accepted() {
        let mut cfg = with_table("orders");
        cfg.evaluation_window = Some("5m".into());
        cfg.lookback = Some("10m".into());
        let settings = cfg.resolve().unwrap();
        assert_eq!(settings.lookback, Duration::from_secs(600));
        assert_eq!(settings.evaluation_window, Duration::from_secs(300));
    }
}
