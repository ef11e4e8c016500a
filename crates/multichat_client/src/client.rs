//! WebSocket driver for the connection state machine.
//!
//! One spawned task owns the socket, the single-shot retry timer, and the
//! [`Connection`] itself; everything reaches it through channels. That
//! sequential callback dispatch is the concurrency discipline — the state
//! machine needs no locks because only this task ever touches it.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use multichat_events::ChatOutput;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, Sleep};
use tokio_tungstenite::{
    connect_async, tungstenite, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, warn};

use crate::config::RelayConfig;
use crate::connection::{Connection, ConnectionState, Transport};
use crate::error::RelayError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Operations the host can invoke on the running relay client.
///
/// The trait is the seam between the event relay and the driver; tests
/// substitute a recording implementation.
pub trait RelayControl: Send + Sync {
    /// Forward one line of local activity to the hub (dropped with a
    /// warning when the link is not registered).
    fn send(&self, text: &str);
    /// User-triggered reconnect: notifies when already registered,
    /// otherwise retries immediately.
    fn reconnect(&self);
}

/// Commands delivered to the driver task.
#[derive(Debug)]
enum RelayCommand {
    Send(String),
    Reconnect,
}

/// Cloneable handle to the spawned driver task.
///
/// Dropping every handle shuts the driver down.
#[derive(Clone)]
pub struct RelayHandle {
    commands: mpsc::UnboundedSender<RelayCommand>,
}

impl RelayControl for RelayHandle {
    fn send(&self, text: &str) {
        let _ = self.commands.send(RelayCommand::Send(text.to_string()));
    }

    fn reconnect(&self) {
        let _ = self.commands.send(RelayCommand::Reconnect);
    }
}

/// Spawns the relay client driver.
///
/// The returned handle is the only way to talk to the task. The first
/// connection attempt starts immediately.
pub fn spawn(config: RelayConfig, output: Arc<dyn ChatOutput>) -> RelayHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    tokio::spawn(run(config, output, commands_rx));
    RelayHandle {
        commands: commands_tx,
    }
}

/// Transport effects queued by the state machine for the driver to execute.
#[derive(Debug)]
enum Effect {
    Dial(String),
    Frame(String),
    Retry(Duration),
}

/// [`Transport`] implementation that queues effects on a channel.
struct EffectQueue {
    effects: mpsc::UnboundedSender<Effect>,
}

impl Transport for EffectQueue {
    fn connect(&mut self, url: &str) {
        let _ = self.effects.send(Effect::Dial(url.to_string()));
    }

    fn send_frame(&mut self, frame: String) {
        let _ = self.effects.send(Effect::Frame(frame));
    }

    fn schedule_retry(&mut self, delay: Duration) {
        let _ = self.effects.send(Effect::Retry(delay));
    }
}

async fn dial(url: &str) -> Result<WsStream, RelayError> {
    let (stream, _response) = connect_async(url).await?;
    Ok(stream)
}

/// Resolves to the next socket event, or pends forever while no socket is
/// open (the command and retry branches keep the loop alive).
async fn next_socket_event(
    socket: &mut Option<WsStream>,
) -> Option<Result<Message, tungstenite::Error>> {
    match socket.as_mut() {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

/// Resolves when the pending retry timer fires; pends forever while no
/// retry is scheduled.
async fn retry_elapsed(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry.as_mut() {
        Some(timer) => timer.await,
        None => std::future::pending().await,
    }
}

/// Driver main loop: drain state-machine effects, then wait for the next
/// command, socket event, or retry expiry.
async fn run(
    config: RelayConfig,
    output: Arc<dyn ChatOutput>,
    mut commands: mpsc::UnboundedReceiver<RelayCommand>,
) {
    let (effects_tx, mut effects_rx) = mpsc::unbounded_channel();
    let mut conn = Connection::new(
        Arc::new(config),
        EffectQueue {
            effects: effects_tx,
        },
        output,
    );

    let mut socket: Option<WsStream> = None;
    let mut retry: Option<Pin<Box<Sleep>>> = None;

    // The first dial goes through the retry path so startup produces the
    // same notices as any later reconnect.
    conn.on_retry_timer();

    loop {
        // Execute everything the last callback asked for before waiting.
        while let Ok(effect) = effects_rx.try_recv() {
            match effect {
                Effect::Dial(url) => match dial(&url).await {
                    Ok(stream) => {
                        socket = Some(stream);
                        conn.on_open();
                    }
                    Err(e) => {
                        warn!("failed to open websocket: {e}");
                        conn.on_close();
                    }
                },
                Effect::Frame(frame) => {
                    if let Some(ws) = socket.as_mut() {
                        if let Err(e) = ws.send(Message::Text(frame.into())).await {
                            error!("websocket write failed: {e}");
                            socket = None;
                            conn.on_close();
                        }
                    } else {
                        debug!("no socket for outbound frame, dropping");
                    }
                }
                Effect::Retry(delay) => {
                    // Single-shot: replacing the slot disarms any pending
                    // timer before the new one is armed.
                    retry = Some(Box::pin(sleep(delay)));
                }
            }
        }

        tokio::select! {
            command = commands.recv() => match command {
                Some(RelayCommand::Send(text)) => conn.send(&text),
                Some(RelayCommand::Reconnect) => {
                    if conn.state() == ConnectionState::Registered {
                        conn.start();
                    } else {
                        conn.on_retry_timer();
                    }
                }
                None => {
                    debug!("all relay handles dropped, stopping driver");
                    break;
                }
            },
            message = next_socket_event(&mut socket) => {
                match message {
                    Some(Ok(Message::Text(text))) => conn.on_frame(text.as_str()),
                    Some(Ok(Message::Ping(payload))) => {
                        if let Some(ws) = socket.as_mut() {
                            let _ = ws.send(Message::Pong(payload)).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("websocket closed by peer");
                        socket = None;
                        conn.on_close();
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("websocket error: {e}");
                        socket = None;
                        conn.on_close();
                    }
                }
            },
            _ = retry_elapsed(&mut retry) => {
                retry = None;
                conn.on_retry_timer();
            },
        }
    }
}
