//! Wire protocol for the MultiChat relay.
//!
//! Frames are single-line UTF-8 JSON objects discriminated by an `action`
//! field. Exactly four message kinds exist; the protocol is deliberately
//! not generalized beyond them. Decoding is total: any input either yields
//! a [`RelayMessage`] or a [`ProtocolError`], never a panic.

mod message;

pub use message::{decode, encode, RelayMessage};

/// Errors produced by the frame codec.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A message could not be encoded to JSON
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    /// An inbound frame was not valid JSON, had an unrecognized `action`,
    /// or was missing a mandatory field for its kind
    #[error("malformed or unrecognized frame: {0}")]
    Decode(#[source] serde_json::Error),
}
