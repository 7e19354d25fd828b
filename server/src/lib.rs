//! # Relay Server Library
//!
//! The relay keeps a shared arena consistent across every connected
//! client. It is not an authoritative game server: it runs no simulation
//! and validates no gameplay. Its job is to register connections, remember
//! the last known state of every persisted entity, replay that state to
//! late joiners, and fan every gameplay event out to all other connections
//! with minimal latency.
//!
//! ## Responsibilities
//!
//! - **Connection lifecycle**: register each source address, assign it a
//!   connection id, sweep out connections that stop sending.
//! - **World snapshot**: hold the last create/move state of every
//!   persisted entity; replay the whole snapshot to each new connection as
//!   its only catch-up mechanism.
//! - **Fan-out**: rebroadcast entity creation, movement, projectile,
//!   hit, and colour events to every other live connection.
//!
//! ## Trust model
//!
//! Combat adjudication is client-authoritative by design: a reported hit
//! is rebroadcast as-is, never checked for plausibility. The relay is a
//! message switch with memory, suitable for trusted peers, not a referee.
//!
//! ## Module organization
//!
//! - [`clients`]: the live connection registry and timeout sweep.
//! - [`snapshot`]: the world snapshot store.
//! - [`hub`]: protocol side effects as data, free of socket I/O.
//! - [`network`]: the UDP socket tasks and the processing loop.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         16,                      // max concurrent connections
//!         Duration::from_secs(5),  // heartbeat timeout
//!         Vec::new(),              // pre-seeded level entities
//!     )
//!     .await?;
//!
//!     server.run().await
//! }
//! ```

pub mod clients;
pub mod hub;
pub mod network;
pub mod snapshot;
