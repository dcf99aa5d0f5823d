//! # Blackjack
//!
//! A multi-seat blackjack session server. Clients discover the server
//! through a periodic UDP offer, join over TCP with a single fixed-size
//! request frame, and then play rounds against a shared dealer using a
//! 14-byte payload frame for every in-game message.
//!
//! ## Architecture
//!
//! Three kinds of task run concurrently:
//!
//! - **Discovery**: broadcasts an offer frame every [`TableConfig::offer_interval`]
//! - **Registration**: one short-lived task per accepted TCP connection that reads
//!   the join request and seats the player at the [`Table`]
//! - **Scheduler**: a single task that opens join windows and drives each round
//!   from the deal through settlement
//!
//! All of them share one [`Table`], whose membership is guarded by a single lock
//! that is never held across network I/O.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, hands, and the round engine
//! - [`net`]: Wire codec, sockets, discovery, acceptor, and a blocking client
//! - [`table`]: Shared table state, fanout, scheduling, and configuration
//!
//! ## Example
//!
//! ```no_run
//! use blackjack::{TableConfig, server};
//!
//! let addr = "0.0.0.0:0".parse().unwrap();
//! server::run(addr, TableConfig::default()).unwrap();
//! ```

/// Networking components for discovery, registration, and framing.
pub mod net;
pub use net::{client::Client, messages, server, utils};

/// Card entities and the round engine.
pub mod game;
pub use game::entities::{self, Card, Deck, Hand, Outcome, Suit};

/// Shared table state and the round scheduler.
pub mod table;
pub use table::{Player, PlayerId, Table, TableConfig, TableStatus};
