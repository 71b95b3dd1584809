//! Coalescing policy selection: Off / Debounce / Throttle

use crate::Dispatcher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configured coalescing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoalesceMode {
    /// Every call invokes the action immediately
    #[default]
    Off,
    /// Fire once, `interval` after the last call in a burst
    Debounce,
    /// Fire at most once per `interval`, using the first call of each window
    Throttle,
}

/// Error parsing a coalescing mode name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown coalescing mode: {0:?} (expected 'off', 'debounce', or 'throttle')")]
pub struct ParseModeError(String);

impl FromStr for CoalesceMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "debounce" => Ok(Self::Debounce),
            "throttle" => Ok(Self::Throttle),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

impl fmt::Display for CoalesceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Debounce => write!(f, "debounce"),
            Self::Throttle => write!(f, "throttle"),
        }
    }
}

/// Mode resolved with its interval into an explicit strategy value
///
/// Callers resolve this per invocation (it is cheap and `Copy`), so a
/// mode or interval change takes effect on the very next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescePolicy {
    /// Invoke immediately on the caller's thread
    Off,
    /// Route through `Dispatcher::debounce` with this interval
    Debounce(Duration),
    /// Route through `Dispatcher::throttle` with this interval
    Throttle(Duration),
}

impl CoalescePolicy {
    /// Pair a mode with its interval
    pub fn from_mode(mode: CoalesceMode, interval: Duration) -> Self {
        match mode {
            CoalesceMode::Off => Self::Off,
            CoalesceMode::Debounce => Self::Debounce(interval),
            CoalesceMode::Throttle => Self::Throttle(interval),
        }
    }

    /// The mode this policy was built from
    pub fn mode(&self) -> CoalesceMode {
        match self {
            Self::Off => CoalesceMode::Off,
            Self::Debounce(_) => CoalesceMode::Debounce,
            Self::Throttle(_) => CoalesceMode::Throttle,
        }
    }
}

impl Dispatcher {
    /// Route one call through the given policy
    ///
    /// Off invokes the action synchronously with no dispatcher state
    /// touched: no suppression counting, every call fires. Debounce and
    /// throttle are fire-and-forget registrations against the pending
    /// timer slot.
    pub fn dispatch<F>(&self, policy: CoalescePolicy, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match policy {
            CoalescePolicy::Off => action(),
            CoalescePolicy::Debounce(interval) => self.debounce(interval, action),
            CoalescePolicy::Throttle(interval) => self.throttle(interval, action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("off".parse::<CoalesceMode>().unwrap(), CoalesceMode::Off);
        assert_eq!(
            "Debounce".parse::<CoalesceMode>().unwrap(),
            CoalesceMode::Debounce
        );
        assert_eq!(
            "THROTTLE".parse::<CoalesceMode>().unwrap(),
            CoalesceMode::Throttle
        );
        assert!("pulse".parse::<CoalesceMode>().is_err());
    }

    #[test]
    fn test_mode_display_roundtrip() {
        for mode in [
            CoalesceMode::Off,
            CoalesceMode::Debounce,
            CoalesceMode::Throttle,
        ] {
            assert_eq!(mode.to_string().parse::<CoalesceMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_policy_from_mode() {
        let interval = Duration::from_millis(250);
        assert_eq!(
            CoalescePolicy::from_mode(CoalesceMode::Off, interval),
            CoalescePolicy::Off
        );
        assert_eq!(
            CoalescePolicy::from_mode(CoalesceMode::Debounce, interval),
            CoalescePolicy::Debounce(interval)
        );
        assert_eq!(
            CoalescePolicy::from_mode(CoalesceMode::Throttle, interval).mode(),
            CoalesceMode::Throttle
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_mode_is_synchronous_passthrough() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let dispatcher = Dispatcher::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let fired = Arc::clone(&fired);
            dispatcher.dispatch(CoalescePolicy::Off, move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        // No timer involved: all five ran before this line
        assert_eq!(fired.load(Ordering::SeqCst), 5);
        assert_eq!(dispatcher.suppressed_count(), 0);
        assert!(dispatcher.window_started_at().is_none());
    }
}
