//! Relay client error types.

use thiserror::Error;

/// Errors raised inside the relay client.
///
/// None of these escape to the host: transport failures feed the reconnect
/// loop and protocol failures discard the offending frame. The type exists
/// so the driver's fallible internals compose with `?`.
#[derive(Error, Debug)]
pub enum RelayError {
    /// WebSocket transport error (refused, reset, timed out, ...)
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Frame codec error
    #[error("protocol error: {0}")]
    Protocol(#[from] multichat_protocol::ProtocolError),
}
