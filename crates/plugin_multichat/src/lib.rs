//! # MultiChat Plugin
//!
//! The event relay between the local game server and the hub link. On
//! construction it holds the immutable relay configuration plus handles to
//! its two collaborators (the running relay client and the local chat
//! sink); `register_handlers` then wires one typed handler per event
//! category onto the bus. Policy lives here — what gets forwarded, how it
//! is formatted, and which chat lines are commands — while all socket
//! lifecycle handling stays in `multichat_client`.

use std::sync::Arc;

use multichat_client::{RelayConfig, RelayControl};
use multichat_events::{
    AdvancementEvent, DeathEvent, EventBus, EventError, PlayerChatEvent, PlayerLoginEvent,
    PlayerLogoutEvent,
};
use tracing::debug;

mod templates;

pub use templates::{login_line, logout_line};

/// Chat line that triggers a manual reconnect instead of being forwarded.
pub const RECONNECT_COMMAND: &str = "!multichat connect";

/// The MultiChat event relay.
pub struct MultiChatPlugin {
    config: Arc<RelayConfig>,
    relay: Arc<dyn RelayControl>,
}

impl MultiChatPlugin {
    /// Creates the relay around an already-running client.
    pub fn new(config: Arc<RelayConfig>, relay: Arc<dyn RelayControl>) -> Self {
        Self { config, relay }
    }

    /// Registers one handler per event category on the bus.
    ///
    /// Called once at startup; there is no unregistration — the relay
    /// lives as long as the host process.
    pub async fn register_handlers(&self, bus: &EventBus) -> Result<(), EventError> {
        self.register_chat(bus).await?;
        self.register_login(bus).await?;
        self.register_logout(bus).await?;
        self.register_advancement(bus).await?;
        self.register_death(bus).await?;
        Ok(())
    }

    async fn register_chat(&self, bus: &EventBus) -> Result<(), EventError> {
        let config = self.config.clone();
        let relay = self.relay.clone();
        bus.on("player_chat", move |event: PlayerChatEvent| {
            debug!("multichat player_chat handler called");
            if event.text == RECONNECT_COMMAND {
                relay.reconnect();
                return Ok(());
            }
            if !config.listen {
                return Ok(());
            }
            if event.player.is_console() {
                // Console chatter is administrative, never relayed.
                return Ok(());
            }
            if config
                .ignore_prefix
                .iter()
                .any(|prefix| event.text.starts_with(prefix.as_str()))
            {
                return Ok(());
            }
            relay.send(&format!("<{}> {}", event.player.name, event.text));
            Ok(())
        })
        .await
    }

    async fn register_login(&self, bus: &EventBus) -> Result<(), EventError> {
        let config = self.config.clone();
        let relay = self.relay.clone();
        bus.on("player_login", move |event: PlayerLoginEvent| {
            debug!("multichat player_login handler called");
            relay.send(&templates::login_line(config.lang, &event.player.name));
            Ok(())
        })
        .await
    }

    async fn register_logout(&self, bus: &EventBus) -> Result<(), EventError> {
        let config = self.config.clone();
        let relay = self.relay.clone();
        bus.on("player_logout", move |event: PlayerLogoutEvent| {
            debug!("multichat player_logout handler called");
            relay.send(&templates::logout_line(config.lang, &event.player.name));
            Ok(())
        })
        .await
    }

    async fn register_advancement(&self, bus: &EventBus) -> Result<(), EventError> {
        let config = self.config.clone();
        let relay = self.relay.clone();
        bus.on("advancement", move |event: AdvancementEvent| {
            debug!("multichat advancement handler called");
            relay.send(event.format(config.lang));
            Ok(())
        })
        .await
    }

    async fn register_death(&self, bus: &EventBus) -> Result<(), EventError> {
        let config = self.config.clone();
        let relay = self.relay.clone();
        bus.on("death", move |event: DeathEvent| {
            debug!("multichat death handler called");
            relay.send(event.format(config.lang));
            Ok(())
        })
        .await
    }
}
