//! Relay client configuration.

use multichat_events::Lang;

/// Immutable configuration for the relay client, built once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Hub websocket URL (e.g., `ws://hub.example.net:8765/`), with the
    /// trailing slash already normalized by the loader.
    pub url: String,
    /// Shared secret presented during registration.
    pub secret_key: String,
    /// Optional server display name; folded into the client name.
    pub server_name: Option<String>,
    /// Forward local activity to the hub.
    pub listen: bool,
    /// Forward hub messages into local chat.
    pub post: bool,
    /// Chat lines starting with any of these prefixes are never forwarded.
    pub ignore_prefix: Vec<String>,
    /// Language used for join/leave and game-message templates.
    pub lang: Lang,
}

impl RelayConfig {
    /// Returns the display name sent in the `register` frame: `MC-<name>`,
    /// or the bare `MC` tag when no server name is configured.
    pub fn client_name(&self) -> String {
        match self.server_name.as_deref() {
            Some(name) if !name.is_empty() => format!("MC-{name}"),
            _ => "MC".to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8765/".to_string(),
            secret_key: String::new(),
            server_name: None,
            listen: true,
            post: true,
            ignore_prefix: Vec::new(),
            lang: Lang::En,
        }
    }
}
