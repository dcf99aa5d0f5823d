//! Table configuration models.

use std::{net::SocketAddr, time::Duration};

/// UDP port clients listen on for offers.
pub const DISCOVERY_PORT: u16 = 13122;

/// Configuration error types
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Timings and identity of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Name advertised in offers (at most 32 bytes survive on the wire)
    pub server_name: String,

    /// Destination of offer broadcasts
    pub broadcast_addr: SocketAddr,

    /// Time between two offers
    pub offer_interval: Duration,

    /// How often an idle table checks for new players
    pub poll_interval: Duration,

    /// How long to wait for more players once the first one is seated
    pub join_window: Duration,

    /// Deadline for each hit/stand decision before the player auto-stands
    pub turn_timeout: Duration,

    /// Deadline for a new connection to send its join request
    pub registration_timeout: Duration,

    /// Upper bound on a single frame write to one player
    pub send_timeout: Duration,

    /// Dealer keeps drawing while below this value
    pub dealer_stand_value: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            server_name: "BlackjackServer".to_string(),
            broadcast_addr: SocketAddr::from(([255, 255, 255, 255], DISCOVERY_PORT)),
            offer_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            join_window: Duration::from_secs(10),
            turn_timeout: Duration::from_secs(15),
            registration_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(2),
            dealer_stand_value: 17,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "server_name",
                reason: "Must not be empty".to_string(),
            });
        }

        let durations = [
            ("offer_interval", self.offer_interval),
            ("poll_interval", self.poll_interval),
            ("turn_timeout", self.turn_timeout),
            ("registration_timeout", self.registration_timeout),
            ("send_timeout", self.send_timeout),
        ];
        for (field, duration) in durations {
            if duration.is_zero() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        if !(2..=21).contains(&self.dealer_stand_value) {
            return Err(ConfigError::Invalid {
                field: "dealer_stand_value",
                reason: format!("Must be between 2 and 21, got {}", self.dealer_stand_value),
            });
        }

        Ok(())
    }
}
