//! Networking layer for discovery and client-server communication.
//!
//! Every frame on the wire is fixed-size and big-endian. Offers travel over
//! UDP broadcast; join requests and game payloads travel over TCP.

/// Blocking TCP/UDP client, mainly a testing utility.
pub mod client;

/// Periodic UDP offer broadcaster.
pub mod discovery;

/// Protocol and connection error types.
pub mod errors;

/// Frame types and the fixed-layout codec.
pub mod messages;

/// Connection acceptor, registration, and server entry points.
pub mod server;

/// Framed socket I/O and the per-player connection handle.
pub mod utils;
