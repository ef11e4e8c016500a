//! # MultiChat Relay Client
//!
//! Maintains the persistent websocket to the MultiChat hub: registration
//! handshake, outbound `client-message` frames, inbound hub traffic, and
//! exponential-backoff reconnection after every loss. Local chat lines and
//! game events reach it through [`RelayControl`]; everything shown to
//! local players leaves through the host's `ChatOutput` sink.
//!
//! The crate splits into a pure state machine ([`connection::Connection`])
//! that decides, and a tokio driver ([`client::spawn`]) that performs.

pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;

pub use backoff::{RetryBackoff, RETRY_INTERVAL_MAX, RETRY_INTERVAL_MIN};
pub use client::{spawn, RelayControl, RelayHandle};
pub use config::RelayConfig;
pub use connection::{Connection, ConnectionState, Transport, HUB_MESSAGE_COLOR};
pub use error::RelayError;
