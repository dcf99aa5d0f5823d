//! Structured logging configuration.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the server's own `tracing` events.

use std::net::SocketAddr;

use blackjack::TableConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var and default to
/// `info`.
///
/// # Example
///
/// ```no_run
/// use bj_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Log the effective table settings once at startup
pub fn log_startup(addr: SocketAddr, config: &TableConfig) {
    tracing::info!(
        server_name = %config.server_name,
        tcp_addr = %addr,
        broadcast_addr = %config.broadcast_addr,
        join_window_ms = config.join_window.as_millis() as u64,
        turn_timeout_ms = config.turn_timeout.as_millis() as u64,
        "Blackjack server starting"
    );
}
