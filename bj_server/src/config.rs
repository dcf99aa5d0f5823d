//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use blackjack::TableConfig;
use std::{net::SocketAddr, str::FromStr, time::Duration};

/// Default TCP bind: every interface, ephemeral port. Clients learn the
/// port from the offers.
const DEFAULT_BIND: ([u8; 4], u16) = ([0, 0, 0, 0], 0);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP bind address for player connections
    pub bind: SocketAddr,
    /// Table timings and identity
    pub table: TableConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `name_override` - Optional server name override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        name_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), bind_override, name_override)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        bind_override: Option<SocketAddr>,
        name_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = TableConfig::default();

        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_or(&lookup, "SERVER_BIND", SocketAddr::from(DEFAULT_BIND))?,
        };

        let server_name = name_override
            .or_else(|| lookup("SERVER_NAME"))
            .unwrap_or(defaults.server_name);

        let table = TableConfig {
            server_name,
            broadcast_addr: parse_or(&lookup, "BROADCAST_ADDR", defaults.broadcast_addr)?,
            offer_interval: millis_or(&lookup, "OFFER_INTERVAL_MS", defaults.offer_interval)?,
            poll_interval: millis_or(&lookup, "POLL_INTERVAL_MS", defaults.poll_interval)?,
            join_window: secs_or(&lookup, "JOIN_WINDOW_SECS", defaults.join_window)?,
            turn_timeout: secs_or(&lookup, "TURN_TIMEOUT_SECS", defaults.turn_timeout)?,
            registration_timeout: secs_or(
                &lookup,
                "REGISTRATION_TIMEOUT_SECS",
                defaults.registration_timeout,
            )?,
            send_timeout: millis_or(&lookup, "SEND_TIMEOUT_MS", defaults.send_timeout)?,
            dealer_stand_value: defaults.dealer_stand_value,
        };

        Ok(ServerConfig { bind, table })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(self.table.validate()?)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error(transparent)]
    Table(#[from] blackjack::table::ConfigError),
}

/// Parses `key` if set, falling back to `default` if it isn't.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Can't parse {raw:?}"),
        }),
    }
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(_) => parse_or(lookup, key, 0).map(Duration::from_millis),
    }
}

fn secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(_) => parse_or(lookup, key, 0).map(Duration::from_secs),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned(), None, None)
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:0".parse().unwrap());
        assert_eq!(config.table, TableConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = load(&[
            ("SERVER_BIND", "127.0.0.1:7000"),
            ("SERVER_NAME", "Lucky Seven"),
            ("BROADCAST_ADDR", "192.168.1.255:13122"),
            ("OFFER_INTERVAL_MS", "250"),
            ("JOIN_WINDOW_SECS", "3"),
            ("TURN_TIMEOUT_SECS", "30"),
            ("SEND_TIMEOUT_MS", "500"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 7000);
        assert_eq!(config.table.server_name, "Lucky Seven");
        assert_eq!(config.table.broadcast_addr.port(), 13122);
        assert_eq!(config.table.offer_interval, Duration::from_millis(250));
        assert_eq!(config.table.join_window, Duration::from_secs(3));
        assert_eq!(config.table.turn_timeout, Duration::from_secs(30));
        assert_eq!(config.table.send_timeout, Duration::from_millis(500));
        assert_eq!(config.table.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_cli_overrides_environment() {
        let vars: HashMap<&str, &str> = [("SERVER_BIND", "127.0.0.1:7000"), ("SERVER_NAME", "env")]
            .into_iter()
            .collect();
        let config = ServerConfig::from_lookup(
            |key| vars.get(key).map(|v| v.to_string()),
            Some("127.0.0.1:8000".parse().unwrap()),
            Some("cli".to_string()),
        )
        .unwrap();
        assert_eq!(config.bind.port(), 8000);
        assert_eq!(config.table.server_name, "cli");
    }

    #[test]
    fn test_unparseable_value_is_an_error() {
        let err = load(&[("TURN_TIMEOUT_SECS", "soon")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("TURN_TIMEOUT_SECS"));
        assert!(msg.contains("soon"));
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let config = load(&[("TURN_TIMEOUT_SECS", "0")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Table(_)));
    }
}
