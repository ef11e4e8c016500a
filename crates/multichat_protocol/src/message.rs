//! Relay message kinds and the text-frame codec.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// A message exchanged with the relay hub.
///
/// The `action` field on the wire selects the variant; field names use the
/// hub's kebab-case convention. Unknown fields on a recognized action are
/// ignored so newer hubs can add fields without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum RelayMessage {
    /// Client → hub: handshake carrying the display name and shared secret.
    #[serde(rename = "register")]
    Register {
        #[serde(rename = "client-name")]
        client_name: String,
        #[serde(rename = "secret-key")]
        secret_key: String,
    },

    /// Hub → client: the registration was accepted.
    #[serde(rename = "register-ack")]
    RegisterAck,

    /// Client → hub: a line of local activity to fan out to other clients.
    #[serde(rename = "client-message")]
    ClientMessage { content: String },

    /// Hub → client: a line originating from another client.
    #[serde(rename = "forwarding-message")]
    ForwardingMessage {
        #[serde(rename = "source-client-name")]
        source_client_name: String,
        content: String,
    },
}

/// Encodes a message as a single-line JSON frame.
pub fn encode(message: &RelayMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

/// Decodes a received text frame.
///
/// Never panics; every failure mode surfaces as [`ProtocolError::Decode`]
/// so callers can log and discard the frame.
pub fn decode(frame: &str) -> Result<RelayMessage, ProtocolError> {
    serde_json::from_str(frame).map_err(ProtocolError::Decode)
}
