//! Synthetic burst driver for the coalescing dispatcher

use anyhow::{Context, Result};
use coalesce_core::{CoalesceConfig, CoalesceMode, Dispatcher};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one simulated burst
#[derive(Debug, Serialize)]
struct SimulationStats {
    mode: String,
    interval_ms: i64,
    requests: u32,
    invocations: usize,
    /// Which requests' payloads actually ran, in firing order
    fired_requests: Vec<u32>,
    /// Highest suppressed count observed during the burst
    max_suppressed: u64,
}

pub async fn run(
    mode: Option<CoalesceMode>,
    interval_ms: Option<i64>,
    events: u32,
    spacing_ms: u64,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = resolve_config(mode, interval_ms, config_path)?;

    let dispatcher = Dispatcher::new();
    let fired: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let mut max_suppressed = 0u64;

    for id in 1..=events {
        let fired = Arc::clone(&fired);
        dispatcher.dispatch(config.policy(), move || {
            fired.lock().push(id);
        });
        max_suppressed = max_suppressed.max(dispatcher.suppressed_count());

        if spacing_ms > 0 && id < events {
            tokio::time::sleep(Duration::from_millis(spacing_ms)).await;
        }
    }

    // Let the trailing window close before reading the results
    tokio::time::sleep(config.interval() + Duration::from_millis(50)).await;
    dispatcher.dispose();

    let fired_requests = fired.lock().clone();
    let stats = SimulationStats {
        mode: config.mode.to_string(),
        interval_ms: config.interval_ms,
        requests: events,
        invocations: fired_requests.len(),
        fired_requests,
        max_suppressed,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?
        );
    } else {
        print_human(&stats);
    }

    Ok(())
}

/// Merge config file values with command-line overrides
fn resolve_config(
    mode: Option<CoalesceMode>,
    interval_ms: Option<i64>,
    config_path: Option<PathBuf>,
) -> Result<CoalesceConfig> {
    let mut config = match config_path {
        Some(path) => {
            let config = CoalesceConfig::load(&path)?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            config
        }
        None => CoalesceConfig::default(),
    };

    if let Some(mode) = mode {
        config.mode = mode;
    }
    if let Some(interval_ms) = interval_ms {
        config.interval_ms = interval_ms;
    }
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

fn print_human(stats: &SimulationStats) {
    println!("{}", "Coalescing Simulation".bold());
    println!("  {} = {}", "mode".cyan(), stats.mode);
    println!("  {} = {}ms", "interval".cyan(), stats.interval_ms);
    println!();
    println!("  {:>5} requests issued", stats.requests);
    println!("  {:>5} actions invoked", stats.invocations);
    println!("  {:>5} peak suppressed", stats.max_suppressed);

    if !stats.fired_requests.is_empty() {
        let fired: Vec<String> = stats
            .fired_requests
            .iter()
            .map(|id| format!("#{id}"))
            .collect();
        println!("  fired payloads: {}", fired.join(", ").yellow());
    }

    let avoided = u64::from(stats.requests).saturating_sub(stats.invocations as u64);
    println!();
    println!(
        "{} {} duplicate invocations avoided",
        "✓".green(),
        avoided
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_file_values() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("coalesce.toml");
        std::fs::write(&path, "mode = \"throttle\"\ninterval_ms = 100\n")?;

        let config = resolve_config(
            Some(CoalesceMode::Debounce),
            Some(40),
            Some(path),
        )?;
        assert_eq!(config.mode, CoalesceMode::Debounce);
        assert_eq!(config.interval_ms, 40);
        Ok(())
    }

    #[test]
    fn test_defaults_without_config_file() -> Result<()> {
        let config = resolve_config(None, None, None)?;
        assert_eq!(config, CoalesceConfig::default());
        Ok(())
    }

    #[test]
    fn test_out_of_range_override_rejected() {
        let result = resolve_config(Some(CoalesceMode::Debounce), Some(86_400_000), None);
        assert!(result.is_err());
    }
}
