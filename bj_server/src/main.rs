//! Blackjack table server.
//!
//! Advertises itself over UDP broadcast and seats players who connect over
//! TCP at a single shared table.

mod config;
mod logging;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use blackjack::{Table, server};
use config::ServerConfig;
use ctrlc::set_handler;
use pico_args::Arguments;
use tokio::net::TcpListener;

const HELP: &str = "\
Run a blackjack table server

USAGE:
  bj_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 0.0.0.0:0]
  --name       NAME        Name advertised in offers   [default: env SERVER_NAME or BlackjackServer]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  TCP bind address (port 0 picks a free port)
  SERVER_NAME                  Advertised server name
  BROADCAST_ADDR               Offer destination [default: 255.255.255.255:13122]
  OFFER_INTERVAL_MS            Time between offers
  POLL_INTERVAL_MS             How often an idle table checks for players
  JOIN_WINDOW_SECS             Wait for more players before dealing
  TURN_TIMEOUT_SECS            Decision deadline before auto-stand
  REGISTRATION_TIMEOUT_SECS    Deadline for a join request
  SEND_TIMEOUT_MS              Bound on a single frame write
  RUST_LOG                     Log filter [default: info]
";

struct Args {
    bind: Option<SocketAddr>,
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        name: pargs.opt_value_from_str("--name")?,
    };

    let config = ServerConfig::from_env(args.bind, args.name)?;
    config.validate()?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    logging::log_startup(listener.local_addr()?, &config.table);

    server::serve(listener, Arc::new(Table::new()), config.table).await
}
