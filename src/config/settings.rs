//! Application configuration loaded from config.toml
//!
//! The file is read once at startup. The resulting [`Settings`] value is passed
//! by reference into every operation that needs it; nothing below `main` reads
//! the environment.

use crate::config::cafes::CafeConfig;
use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Engine behaviour switches
    #[serde(default)]
    pub settings: Settings,
    /// Push notification collaborator
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Cafes and their tables to seed
    #[serde(default)]
    pub cafes: Vec<CafeConfig>,
}

/// Tunables for the ordering engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Café local time offset from UTC, in minutes (330 = Asia/Kolkata)
    pub utc_offset_minutes: i32,
    /// Reject check-ins for tables that are not registered for the cafe
    pub validate_tables: bool,
    /// Reject cart mutations whose declared total disagrees with the server total
    pub reject_total_mismatch: bool,
    /// Allowed difference between declared and computed cart totals
    pub total_tolerance: f64,
    /// Deadline for the whole order placement write path
    pub place_order_timeout_ms: u64,
    /// Attach the cafe's running advertisement to order summaries
    pub attach_advertisements: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            validate_tables: true,
            reject_total_mismatch: true,
            total_tolerance: 0.01,
            place_order_timeout_ms: 5_000,
            attach_advertisements: true,
        }
    }
}

impl Settings {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.local_offset()?;
        if !self.total_tolerance.is_finite() || self.total_tolerance < 0.0 {
            return Err(Error::Config {
                message: format!(
                    "total_tolerance must be a non-negative number, got {}",
                    self.total_tolerance
                ),
            });
        }
        if self.place_order_timeout_ms == 0 {
            return Err(Error::Config {
                message: "place_order_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// The café's fixed UTC offset.
    pub fn local_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| Error::Config {
            message: format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes),
        })
    }

    /// Converts a stored UTC timestamp to café local time.
    pub fn to_local(&self, at: DateTime<Utc>) -> Result<DateTime<FixedOffset>> {
        Ok(at.with_timezone(&self.local_offset()?))
    }

    /// Deadline for `place_order`.
    #[must_use]
    pub const fn place_order_timeout(&self) -> Duration {
        Duration::from_millis(self.place_order_timeout_ms)
    }
}

/// Push notification settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationConfig {
    /// Expo push endpoint; when absent notifications are only logged
    pub expo_endpoint: Option<String>,
}

/// Loads and validates the configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A setting is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    parse_config(&contents)
}

/// Parses and validates configuration text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.settings.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [settings]
            utc_offset_minutes = 0
            validate_tables = false
            total_tolerance = 0.5
            place_order_timeout_ms = 250

            [notifications]
            expo_endpoint = "http://localhost:9999/push"

            [[cafes]]
            id = 7
            name = "Mustache Test"
            complete_pos = true
            tables = ["T1", "T2"]
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.settings.utc_offset_minutes, 0);
        assert!(!config.settings.validate_tables);
        // Unspecified fields fall back to defaults
        assert!(config.settings.reject_total_mismatch);
        assert_eq!(config.settings.total_tolerance, 0.5);
        assert_eq!(config.settings.place_order_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.notifications.expo_endpoint.as_deref(),
            Some("http://localhost:9999/push")
        );
        assert_eq!(config.cafes.len(), 1);
        assert_eq!(config.cafes[0].tables, vec!["T1", "T2"]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.settings, Settings::default());
        assert!(config.cafes.is_empty());
        assert!(config.notifications.expo_endpoint.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_settings() {
        let bad_offset = parse_config("[settings]\nutc_offset_minutes = 5000\n");
        assert!(matches!(bad_offset, Err(Error::Config { .. })));

        let bad_timeout = parse_config("[settings]\nplace_order_timeout_ms = 0\n");
        assert!(matches!(bad_timeout, Err(Error::Config { .. })));

        let bad_tolerance = parse_config("[settings]\ntotal_tolerance = -1.0\n");
        assert!(matches!(bad_tolerance, Err(Error::Config { .. })));
    }

    #[test]
    fn test_to_local_applies_offset() {
        let settings = Settings::default();
        let at = Utc.with_ymd_and_hms(2026, 3, 31, 20, 0, 0).unwrap();
        let local = settings.to_local(at).unwrap();
        assert_eq!(local.to_rfc3339(), "2026-04-01T01:30:00+05:30");
    }
}
