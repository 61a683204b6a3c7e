use std::str::FromStr;
use std::time::Duration;

use crate::collab::coordinator::{DEFAULT_SESSION_TIMEOUT, DEFAULT_SWEEP_INTERVAL};

/// Collab API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket server binds to.
    pub port: u16,
    /// How often inactive project sessions are swept.
    pub sweep_interval: Duration,
    /// Inactivity after which a project session is evicted by the sweep.
    pub session_timeout: Duration,
    /// A connection that sends nothing for this long is closed.
    pub client_idle_timeout: Duration,
    /// Per-connection outbound queue size.
    pub outbound_queue_capacity: usize,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4003,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            client_idle_timeout: Duration::from_secs(120),
            outbound_queue_capacity: 256,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable is optional; unparsable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            parsed_var(&lookup, name, default.as_secs()).map_or(default, Duration::from_secs)
        };
        // Timer periods must be non-zero.
        let period = |name: &str, default: Duration| {
            let value = secs(name, default);
            if value.is_zero() {
                tracing::warn!(%name, default_secs = default.as_secs(), "zero period, using default");
                return default;
            }
            value
        };

        Self {
            port: parsed_var(&lookup, "PORT", defaults.port).unwrap_or(defaults.port),
            sweep_interval: period("SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            session_timeout: secs("SESSION_TIMEOUT_SECS", defaults.session_timeout),
            client_idle_timeout: period("CLIENT_IDLE_TIMEOUT_SECS", defaults.client_idle_timeout),
            outbound_queue_capacity: parsed_var(
                &lookup,
                "OUTBOUND_QUEUE_CAPACITY",
                defaults.outbound_queue_capacity,
            )
            .filter(|n| *n > 0)
            .unwrap_or(defaults.outbound_queue_capacity),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Parse `name` if set. Logs and returns `None` when the value does not parse.
fn parsed_var<T: FromStr + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(%name, value = %raw, %default, "invalid value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_match_reference_cadence() {
        let config = config_from(&[]);
        assert_eq!(config.port, 4003);
        assert_eq!(config.sweep_interval, Duration::from_secs(15 * 60));
        assert_eq!(config.session_timeout, Duration::from_secs(30 * 60));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("SWEEP_INTERVAL_SECS", "60"),
            ("SESSION_TIMEOUT_SECS", "120"),
            ("CLIENT_IDLE_TIMEOUT_SECS", "5"),
            ("OUTBOUND_QUEUE_CAPACITY", "8"),
            ("CORS_ORIGINS", "http://localhost:3000, https://nuvia.app,"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.session_timeout, Duration::from_secs(120));
        assert_eq!(config.client_idle_timeout, Duration::from_secs(5));
        assert_eq!(config.outbound_queue_capacity, 8);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000".to_string(), "https://nuvia.app".to_string()]
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("SESSION_TIMEOUT_SECS", "-1"),
            ("OUTBOUND_QUEUE_CAPACITY", "0"),
        ]);
        let defaults = Config::default();
        assert_eq!(config.port, defaults.port);
        assert_eq!(config.session_timeout, defaults.session_timeout);
        assert_eq!(config.outbound_queue_capacity, defaults.outbound_queue_capacity);
    }

    #[test]
    fn zero_periods_fall_back_to_defaults() {
        let config = config_from(&[
            ("SWEEP_INTERVAL_SECS", "0"),
            ("CLIENT_IDLE_TIMEOUT_SECS", "0"),
            ("SESSION_TIMEOUT_SECS", "0"),
        ]);
        let defaults = Config::default();
        assert_eq!(config.sweep_interval, defaults.sweep_interval);
        assert_eq!(config.client_idle_timeout, defaults.client_idle_timeout);
        // A zero session timeout is a valid (aggressive) eviction policy.
        assert_eq!(config.session_timeout, Duration::ZERO);
    }
}
