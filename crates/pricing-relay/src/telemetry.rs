//! # Telemetry
//!
//! Installs the global `tracing` subscriber.
//!
//! ## Log Levels
//! - `PRICING_LOG=debug` - filter for the pricing engine only
//! - `RUST_LOG=pricing_core=trace` - standard fallback
//! - Default: INFO, DEBUG for the pricing crates

use tracing_subscriber::EnvFilter;

use crate::error::{RelayError, RelayResult};

/// Filter used when neither variable is set.
pub const DEFAULT_FILTER: &str = "info,pricing_core=debug,pricing_relay=debug";

/// Builds the filter from `PRICING_LOG`, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`]. Malformed directives fall through to the next source.
pub fn env_filter() -> EnvFilter {
    filter_from(|key| std::env::var(key).ok())
}

fn filter_from(lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    ["PRICING_LOG", "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes the tracing subscriber for structured logging.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> RelayResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .map_err(|e| RelayError::TracingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_log_wins_over_rust_log() {
        let filter = filter_from(|key| match key {
            "PRICING_LOG" => Some("warn".to_string()),
            "RUST_LOG" => Some("trace".to_string()),
            _ => None,
        });
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_falls_back_to_default() {
        let filter = filter_from(|_| None);
        assert!(filter.to_string().contains("pricing_core=debug"));
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing();
        assert!(matches!(init_tracing(), Err(RelayError::TracingInit(_))));
    }
}
