//! # MultiChat Event Interface
//!
//! The narrow contract between the local game server and the relay. The
//! host emits game events onto an [`EventBus`]; the relay registers one
//! typed handler per event category at startup and receives them as plain
//! structs. Text travelling the other way (hub messages, connection
//! notices) goes through the [`ChatOutput`] sink.
//!
//! ## Event Categories
//!
//! | event name     | payload type          |
//! |----------------|-----------------------|
//! | `player_chat`  | [`PlayerChatEvent`]   |
//! | `player_login` | [`PlayerLoginEvent`]  |
//! | `player_logout`| [`PlayerLogoutEvent`] |
//! | `advancement`  | [`AdvancementEvent`]  |
//! | `death`        | [`DeathEvent`]        |
//!
//! Handlers are registered explicitly and dispatched sequentially; there is
//! no global or implicit wiring. A failing handler is logged and skipped so
//! one misbehaving subscriber cannot starve the others.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

mod types;

pub use types::{
    AdvancementEvent, ChatOutput, DeathEvent, Lang, Player, PlayerChatEvent, PlayerLoginEvent,
    PlayerLogoutEvent, UnsupportedLang,
};

// ============================================================================
// Event Trait
// ============================================================================

/// Core trait for events that can travel over the bus.
///
/// Blanket-implemented for every `Serialize + DeserializeOwned` type, so
/// event structs only need the serde derives.
pub trait Event: Send + Sync + Any + std::fmt::Debug + 'static {
    /// Returns the type name for debugging and handler naming.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Serializes the event to bytes for dispatch.
    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    /// Deserializes an event from bytes.
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(EventError::Deserialization)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler trait for processing events from serialized data.
///
/// Most users never implement this directly; [`EventBus::on`] wraps plain
/// closures in a [`TypedEventHandler`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles an event from serialized data.
    async fn handle(&self, data: &[u8]) -> Result<(), EventError>;

    /// Returns the TypeId of the event type this handler expects.
    fn expected_type_id(&self) -> TypeId;

    /// Returns a human-readable name for this handler for debugging.
    fn handler_name(&self) -> &str;
}

/// Type-safe wrapper bridging a typed closure to the generic
/// [`EventHandler`] interface.
pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    /// Creates a new typed event handler with a debugging name.
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    async fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// In-process event bus connecting the game server host to the relay.
///
/// Thread-safe behind `Arc`; registration and emission take `&self`.
/// Events are serialized once per emission and dispatched sequentially to
/// every registered handler for the event name.
pub struct EventBus {
    /// Map of event names to their registered handlers
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    /// Bus statistics for monitoring
    stats: RwLock<EventBusStats>,
}

impl EventBus {
    /// Creates a new bus with no registered handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            stats: RwLock::new(EventBusStats::default()),
        }
    }

    /// Registers a typed handler for an event name.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// bus.on("player_chat", |event: PlayerChatEvent| {
    ///     println!("{} said {}", event.player, event.text);
    ///     Ok(())
    /// }).await?;
    /// ```
    pub async fn on<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler_name = format!("{}::{}", event_name, T::type_name());
        let typed_handler = TypedEventHandler::new(handler_name, handler);
        let handler_arc: Arc<dyn EventHandler> = Arc::new(typed_handler);

        let mut handlers = self.handlers.write().await;
        handlers
            .entry(event_name.to_string())
            .or_insert_with(Vec::new)
            .push(handler_arc);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        info!("📝 Registered handler for {}", event_name);
        Ok(())
    }

    /// Emits an event to every handler registered for `event_name`.
    ///
    /// The event is serialized once; individual handler failures are
    /// logged but do not fail the emission or stop later handlers.
    pub async fn emit<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let data = event.serialize()?;
        let handlers = self.handlers.read().await;

        if let Some(event_handlers) = handlers.get(event_name) {
            debug!(
                "📤 Emitting {} to {} handlers",
                event_name,
                event_handlers.len()
            );

            for handler in event_handlers {
                if let Err(e) = handler.handle(&data).await {
                    error!("❌ Handler {} failed: {}", handler.handler_name(), e);
                }
            }

            let mut stats = self.stats.write().await;
            stats.events_emitted += 1;
        } else {
            warn!("⚠️ No handlers for event: {}", event_name);
        }

        Ok(())
    }

    /// Returns current bus statistics.
    pub async fn get_stats(&self) -> EventBusStats {
        let stats = self.stats.read().await;
        stats.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about bus usage.
#[derive(Debug, Default, Clone)]
pub struct EventBusStats {
    /// Total number of registered event handlers
    pub total_handlers: usize,
    /// Total number of events emitted since bus creation
    pub events_emitted: u64,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during event bus operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Serialization failed when converting event to bytes
    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),
    /// Deserialization failed when converting bytes to event
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// A handler rejected the event
    #[error("Handler error: {0}")]
    Handler(String),
}
