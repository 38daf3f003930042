//! Module configuration.
//!
//! The polling period sets both the presence-check cadence and the granularity
//! of the debounce countdown. The grant period is the refractory window after
//! a successful detection during which the indicator stays on and the bus is
//! left alone.

use crate::error::DetectorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_POLLING_PERIOD_MS: u64 = 100;
pub const DEFAULT_GRANT_PERIOD_S: u64 = 5;
pub const DEFAULT_MODULE_ID: u8 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Presence-check cadence in milliseconds
    #[serde(default = "default_polling_period_ms")]
    pub polling_period_ms: u64,
    /// Indicator hold time after a detection, in seconds
    #[serde(default = "default_grant_period_s")]
    pub grant_period_s: u64,
    /// Identity tag written as byte 0 of every outbound record
    #[serde(default = "default_module_id")]
    pub module_id: u8,
}

fn default_polling_period_ms() -> u64 {
    DEFAULT_POLLING_PERIOD_MS
}

fn default_grant_period_s() -> u64 {
    DEFAULT_GRANT_PERIOD_S
}

fn default_module_id() -> u8 {
    DEFAULT_MODULE_ID
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            polling_period_ms: default_polling_period_ms(),
            grant_period_s: default_grant_period_s(),
            module_id: default_module_id(),
        }
    }
}

impl DetectorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, DetectorError> {
        let config: DetectorConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, DetectorError> {
        if !path.exists() {
            info!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| DetectorError::Config(format!("reading {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.polling_period_ms == 0 {
            return Err(DetectorError::Config("polling_period_ms must be non-zero".into()));
        }
        Ok(())
    }

    pub fn polling_period(&self) -> Duration {
        Duration::from_millis(self.polling_period_ms)
    }

    pub fn grant_period(&self) -> Duration {
        Duration::from_secs(self.grant_period_s)
    }

    /// Number of ticks the indicator stays on after a detection.
    ///
    /// Never less than one, even when the grant period is shorter than a tick.
    pub fn countdown_ticks(&self) -> u32 {
        let grant_ms = self.grant_period_s.saturating_mul(1000);
        let ticks = grant_ms / self.polling_period_ms.max(1);
        ticks.clamp(1, u64::from(u32::MAX)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.polling_period_ms, 100);
        assert_eq!(config.grant_period_s, 5);
        assert_eq!(config.countdown_ticks(), 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_countdown_never_below_one() {
        let config = DetectorConfig {
            polling_period_ms: 2000,
            grant_period_s: 1,
            module_id: 1,
        };
        assert_eq!(config.countdown_ticks(), 1);

        let config = DetectorConfig {
            polling_period_ms: 100,
            grant_period_s: 0,
            module_id: 1,
        };
        assert_eq!(config.countdown_ticks(), 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = DetectorConfig::from_toml_str("polling_period_ms = 250\n").unwrap();
        assert_eq!(config.polling_period_ms, 250);
        assert_eq!(config.grant_period_s, DEFAULT_GRANT_PERIOD_S);
        assert_eq!(config.module_id, DEFAULT_MODULE_ID);
        assert_eq!(config.countdown_ticks(), 20);
    }

    #[test]
    fn test_zero_polling_period_rejected() {
        let result = DetectorConfig::from_toml_str("polling_period_ms = 0\n");
        assert!(matches!(result, Err(DetectorError::Config(_))));
    }

    #[test]
    fn test_bad_toml_rejected() {
        let result = DetectorConfig::from_toml_str("polling_period_ms = \"fast\"\n");
        assert!(matches!(result, Err(DetectorError::Config(_))));
    }
}
