//! Table module: the shared session state and everything that drives it.
//!
//! - [`state`]: the [`Table`] every task shares, guarded by a single lock
//! - [`fanout`]: delivery of frames to seated players
//! - [`scheduler`]: the single task that opens join windows and runs rounds
//! - [`config`]: timings and identity of the table

pub mod config;
pub mod fanout;
pub mod scheduler;
pub mod state;

pub use config::{ConfigError, TableConfig};
pub use scheduler::{Phase, Scheduler};
pub use state::{Player, PlayerId, Seating, Table, TableStatus};
