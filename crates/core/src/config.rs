//! Coalescing configuration (TOML)

use crate::policy::{CoalesceMode, CoalescePolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default coalescing interval in milliseconds
const DEFAULT_INTERVAL_MS: i64 = 250;

/// Longest accepted interval (1 hour)
const MAX_INTERVAL_MS: i64 = 3_600_000;

/// Coalescing configuration
///
/// `interval_ms` is kept signed so a hand-edited config with a negative
/// value still loads; `interval()` normalizes it to zero, which degrades
/// to "fire as soon as the runtime allows" instead of failing the
/// scheduling path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoalesceConfig {
    /// Coalescing mode: off, debounce, or throttle
    pub mode: CoalesceMode,
    /// Coalescing interval in milliseconds
    pub interval_ms: i64,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            mode: CoalesceMode::Off,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("interval_ms {0} exceeds maximum of {MAX_INTERVAL_MS} (1 hour)")]
    IntervalTooLong(i64),
}

impl CoalesceConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Check configured values are in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms > MAX_INTERVAL_MS {
            return Err(ConfigError::IntervalTooLong(self.interval_ms));
        }
        Ok(())
    }

    /// The coalescing interval, with negative values normalized to zero
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(0) as u64)
    }

    /// Resolve the configured mode and interval into a policy
    ///
    /// Call sites resolve this on every invocation rather than caching
    /// it, so edits to the config take effect on the next call.
    pub fn policy(&self) -> CoalescePolicy {
        CoalescePolicy::from_mode(self.mode, self.interval())
    }
}

/// Example configuration with comments
pub fn example_config() -> &'static str {
    r#"# Coalesce configuration

# Coalescing mode: "off", "debounce", or "throttle"
#   off      - every request invokes the action immediately
#   debounce - fire once, interval_ms after the last request in a burst
#   throttle - fire at most once per interval_ms, at the start of each window
mode = "debounce"

# Coalescing interval in milliseconds (0 = fire as soon as possible)
interval_ms = 250
"#
}
