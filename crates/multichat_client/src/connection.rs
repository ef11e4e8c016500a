//! Connection lifecycle state machine.
//!
//! Owns every decision about the hub link: when to dial, what to write,
//! what to tell local players, and how long to wait before retrying. All
//! I/O goes through the [`Transport`] seam and all user-visible text
//! through [`ChatOutput`], so the machine is fully testable without a
//! socket.
//!
//! ## State Diagram
//!
//! ```text
//! ┌──────────────┐  start() / dial   ┌──────────────┐
//! │ Disconnected │ ────────────────► │  Connecting  │
//! └──────────────┘                   └──────┬───────┘
//!        ▲                                  │ on_open: send register
//!        │ on_close:                        │ on_frame(register-ack):
//!        │  notice + schedule retry,        │  reset backoff, notice
//!        │  then double interval            ▼
//!        │                           ┌──────────────┐
//!        └────────────────────────── │  Registered  │
//!                                    └──────────────┘
//! ```
//!
//! The retry timer is single-shot: `on_close` re-arms it and the driver
//! replaces any pending one, so at most one retry is outstanding. There is
//! no terminal state; the client retries forever.

use std::sync::Arc;
use std::time::Duration;

use multichat_events::ChatOutput;
use multichat_protocol::{decode, encode, RelayMessage};
use tracing::{debug, info, warn};

use crate::backoff::RetryBackoff;
use crate::config::RelayConfig;

/// Display color for hub-originated lines in local chat.
pub const HUB_MESSAGE_COLOR: &str = "#777777";

/// Lifecycle state of the hub link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket; a retry may be pending.
    Disconnected,
    /// Socket being opened, or open and awaiting `register-ack`.
    Connecting,
    /// Registration acknowledged; sends are permitted.
    Registered,
}

/// Transport effects emitted by the state machine.
///
/// Calls must not block; the driver executes them asynchronously and feeds
/// completions back as `on_*` callbacks.
pub trait Transport: Send {
    /// Begin opening a socket to `url`.
    fn connect(&mut self, url: &str);
    /// Write one text frame to the open socket.
    fn send_frame(&mut self, frame: String);
    /// Arm the single-shot retry timer, replacing any pending one.
    fn schedule_retry(&mut self, delay: Duration);
}

/// The connection state machine.
///
/// Mutated only from `on_*` callbacks and the public operations, which the
/// driver invokes sequentially from one task; no internal locking.
pub struct Connection<T: Transport> {
    config: Arc<RelayConfig>,
    transport: T,
    output: Arc<dyn ChatOutput>,
    state: ConnectionState,
    backoff: RetryBackoff,
}

impl<T: Transport> Connection<T> {
    /// Creates the machine in `Disconnected`. The driver fires
    /// [`on_retry_timer`](Self::on_retry_timer) immediately afterwards so
    /// the first dial behaves exactly like any later retry.
    pub fn new(config: Arc<RelayConfig>, transport: T, output: Arc<dyn ChatOutput>) -> Self {
        Self {
            config,
            transport,
            output,
            state: ConnectionState::Disconnected,
            backoff: RetryBackoff::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Begins a connection attempt if none is underway.
    ///
    /// Safe to call repeatedly: while `Connecting` it is a no-op, and while
    /// `Registered` it only tells local players the link is already up.
    pub fn start(&mut self) {
        match self.state {
            ConnectionState::Registered => {
                self.output
                    .broadcast("multichat is already connected to server", None);
            }
            ConnectionState::Connecting => {}
            ConnectionState::Disconnected => {
                self.state = ConnectionState::Connecting;
                self.transport.connect(&self.config.url);
            }
        }
    }

    /// Sends one line of local activity to the hub.
    ///
    /// Outside `Registered` the message is dropped with a warning — never
    /// queued, never retried.
    pub fn send(&mut self, text: &str) {
        if self.state != ConnectionState::Registered {
            warn!("tried to write to the hub while not registered, message dropped");
            return;
        }
        let message = RelayMessage::ClientMessage {
            content: text.to_string(),
        };
        self.write(&message);
    }

    /// The socket finished opening: send the `register` frame and stay in
    /// `Connecting` until the hub acknowledges.
    pub fn on_open(&mut self) {
        info!("successfully connected to {}", self.config.url);
        self.state = ConnectionState::Connecting;
        let register = RelayMessage::Register {
            client_name: self.config.client_name(),
            secret_key: self.config.secret_key.clone(),
        };
        self.write(&register);
    }

    /// A text frame arrived from the hub.
    ///
    /// Malformed frames are logged and discarded without touching
    /// connection state. A duplicate `register-ack` while already
    /// `Registered` is ignored.
    pub fn on_frame(&mut self, frame: &str) {
        debug!("relay received: {frame}");
        match decode(frame) {
            Ok(RelayMessage::RegisterAck) => {
                if self.state != ConnectionState::Registered {
                    self.state = ConnectionState::Registered;
                    self.backoff.reset();
                    info!("successfully registered");
                    self.output.broadcast("multichat: server connected", None);
                }
            }
            Ok(RelayMessage::ForwardingMessage {
                source_client_name,
                content,
            }) => {
                if self.config.post {
                    self.output.broadcast(
                        &format!("[{source_client_name}]{content}"),
                        Some(HUB_MESSAGE_COLOR),
                    );
                }
            }
            Ok(other) => {
                debug!(?other, "ignoring unexpected client-bound frame");
            }
            Err(e) => {
                warn!("discarding malformed frame from hub: {e}");
            }
        }
    }

    /// The socket closed or a dial failed.
    ///
    /// Reports the delay about to be used, arms the retry timer with it,
    /// and only then doubles the interval for the next failure.
    pub fn on_close(&mut self) {
        self.state = ConnectionState::Disconnected;
        let delay = self.backoff.next();
        let millis = delay.as_millis();
        info!("connection broken, retry after {millis}ms");
        self.output.broadcast(
            &format!("multichat connection broken, retry after {millis}ms"),
            None,
        );
        self.transport.schedule_retry(delay);
    }

    /// The retry timer fired (the driver has already disarmed it).
    pub fn on_retry_timer(&mut self) {
        info!("connecting to multichat server");
        self.output.broadcast("multichat: connecting to server", None);
        self.start();
    }

    fn write(&mut self, message: &RelayMessage) {
        match encode(message) {
            Ok(frame) => {
                debug!("relay sending: {frame}");
                self.transport.send_frame(frame);
            }
            Err(e) => {
                warn!("failed to encode outbound frame: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Everything the machine asked the transport to do.
    #[derive(Default)]
    struct Effects {
        dials: Vec<String>,
        frames: Vec<String>,
        retries: Vec<Duration>,
    }

    /// Transport double that records every effect; clones share the log.
    #[derive(Default, Clone)]
    struct RecordingTransport {
        effects: Arc<Mutex<Effects>>,
    }

    impl RecordingTransport {
        fn dials(&self) -> Vec<String> {
            self.effects.lock().unwrap().dials.clone()
        }
        fn frames(&self) -> Vec<String> {
            self.effects.lock().unwrap().frames.clone()
        }
        fn retries(&self) -> Vec<Duration> {
            self.effects.lock().unwrap().retries.clone()
        }
    }

    impl Transport for RecordingTransport {
        fn connect(&mut self, url: &str) {
            self.effects.lock().unwrap().dials.push(url.to_string());
        }
        fn send_frame(&mut self, frame: String) {
            self.effects.lock().unwrap().frames.push(frame);
        }
        fn schedule_retry(&mut self, delay: Duration) {
            self.effects.lock().unwrap().retries.push(delay);
        }
    }

    /// Chat sink double that records every broadcast.
    #[derive(Default)]
    struct RecordingChat {
        lines: Mutex<Vec<(String, Option<String>)>>,
    }

    impl RecordingChat {
        fn texts(&self) -> Vec<String> {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .map(|(text, _)| text.clone())
                .collect()
        }

        fn colored(&self) -> Vec<(String, Option<String>)> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl ChatOutput for RecordingChat {
        fn broadcast(&self, text: &str, color: Option<&str>) {
            self.lines
                .lock()
                .unwrap()
                .push((text.to_string(), color.map(str::to_string)));
        }
    }

    struct Harness {
        conn: Connection<RecordingTransport>,
        transport: RecordingTransport,
        chat: Arc<RecordingChat>,
    }

    fn harness(config: RelayConfig) -> Harness {
        let transport = RecordingTransport::default();
        let chat = Arc::new(RecordingChat::default());
        let conn = Connection::new(Arc::new(config), transport.clone(), chat.clone());
        Harness {
            conn,
            transport,
            chat,
        }
    }

    fn test_config() -> RelayConfig {
        RelayConfig {
            url: "ws://hub.test:8765/".to_string(),
            secret_key: "hunter2".to_string(),
            server_name: Some("survival".to_string()),
            ..Default::default()
        }
    }

    fn register(conn: &mut Connection<RecordingTransport>) {
        conn.start();
        conn.on_open();
        conn.on_frame(r#"{"action":"register-ack"}"#);
    }

    #[test]
    fn test_start_dials_configured_url() {
        let mut h = harness(test_config());

        assert_eq!(h.conn.state(), ConnectionState::Disconnected);
        h.conn.start();
        assert_eq!(h.conn.state(), ConnectionState::Connecting);
        assert_eq!(h.transport.dials(), vec!["ws://hub.test:8765/"]);
    }

    #[test]
    fn test_start_while_connecting_is_noop() {
        let mut h = harness(test_config());

        h.conn.start();
        h.conn.start();
        h.conn.start();
        assert_eq!(h.transport.dials().len(), 1);
    }

    #[test]
    fn test_start_while_registered_notifies_only() {
        let mut h = harness(test_config());

        register(&mut h.conn);
        h.conn.start();

        assert_eq!(h.transport.dials().len(), 1);
        assert!(h
            .chat
            .texts()
            .contains(&"multichat is already connected to server".to_string()));
    }

    #[test]
    fn test_open_sends_register_frame() {
        let mut h = harness(test_config());

        h.conn.start();
        h.conn.on_open();
        assert_eq!(h.conn.state(), ConnectionState::Connecting);

        let frames = h.transport.frames();
        let decoded = decode(&frames[0]).unwrap();
        assert_eq!(
            decoded,
            RelayMessage::Register {
                client_name: "MC-survival".to_string(),
                secret_key: "hunter2".to_string(),
            }
        );
    }

    #[test]
    fn test_register_ack_transitions_and_notifies() {
        let mut h = harness(test_config());

        register(&mut h.conn);
        assert_eq!(h.conn.state(), ConnectionState::Registered);
        assert!(h
            .chat
            .texts()
            .contains(&"multichat: server connected".to_string()));
    }

    #[test]
    fn test_duplicate_register_ack_is_ignored() {
        let mut h = harness(test_config());

        register(&mut h.conn);
        h.conn.on_frame(r#"{"action":"register-ack"}"#);

        // The connected notice fired exactly once.
        let connected = h
            .chat
            .texts()
            .iter()
            .filter(|line| line.as_str() == "multichat: server connected")
            .count();
        assert_eq!(connected, 1);
        assert_eq!(h.conn.state(), ConnectionState::Registered);
    }

    // Scenario: inbound forwarding-message with post enabled is broadcast
    // as "[source]content" in the hub color.
    #[test]
    fn test_forwarding_message_posts_to_local_chat() {
        let mut h = harness(test_config());

        register(&mut h.conn);
        h.conn.on_frame(
            r#"{"action":"forwarding-message","source-client-name":"Hub1","content":"hi"}"#,
        );

        let posted = h
            .chat
            .colored()
            .into_iter()
            .find(|(text, _)| text == "[Hub1]hi")
            .expect("hub message should be broadcast");
        assert_eq!(posted.1.as_deref(), Some(HUB_MESSAGE_COLOR));
    }

    #[test]
    fn test_forwarding_message_suppressed_when_post_disabled() {
        let mut h = harness(RelayConfig {
            post: false,
            ..RelayConfig::default()
        });

        register(&mut h.conn);
        h.conn.on_frame(
            r#"{"action":"forwarding-message","source-client-name":"Hub1","content":"hi"}"#,
        );

        assert!(!h.chat.texts().iter().any(|line| line.contains("[Hub1]")));
    }

    #[test]
    fn test_malformed_frame_does_not_change_state() {
        let mut h = harness(test_config());

        register(&mut h.conn);
        h.conn.on_frame("not json at all");
        h.conn.on_frame(r#"{"action":"mystery"}"#);
        assert_eq!(h.conn.state(), ConnectionState::Registered);
    }

    // Scenario: send while not registered drops the message and writes
    // nothing to the transport.
    #[test]
    fn test_send_while_disconnected_is_dropped() {
        let mut h = harness(test_config());

        h.conn.send("x");
        assert!(h.transport.frames().is_empty());
    }

    #[test]
    fn test_send_while_connecting_is_dropped() {
        let mut h = harness(test_config());

        h.conn.start();
        h.conn.on_open();
        h.conn.send("x");

        // Only the register frame went out.
        let frames = h.transport.frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("register"));
    }

    #[test]
    fn test_send_while_registered_writes_client_message() {
        let mut h = harness(test_config());

        register(&mut h.conn);
        h.conn.send("<Bob> hello");

        let frames = h.transport.frames();
        assert_eq!(
            decode(frames.last().unwrap()).unwrap(),
            RelayMessage::ClientMessage {
                content: "<Bob> hello".to_string(),
            }
        );
    }

    // Scenario: three consecutive closes with no registration between them
    // schedule 5000, 10000, 20000 ms — each notice reports the delay about
    // to be used, then the backoff advances.
    #[test]
    fn test_consecutive_closes_grow_backoff() {
        let mut h = harness(test_config());

        h.conn.start();
        h.conn.on_close();
        h.conn.on_retry_timer();
        h.conn.on_close();
        h.conn.on_retry_timer();
        h.conn.on_close();

        assert_eq!(
            h.transport.retries(),
            vec![
                Duration::from_millis(5000),
                Duration::from_millis(10000),
                Duration::from_millis(20000),
            ]
        );
        let texts = h.chat.texts();
        assert!(texts.contains(&"multichat connection broken, retry after 5000ms".to_string()));
        assert!(texts.contains(&"multichat connection broken, retry after 10000ms".to_string()));
        assert!(texts.contains(&"multichat connection broken, retry after 20000ms".to_string()));
    }

    #[test]
    fn test_registration_resets_backoff() {
        let mut h = harness(test_config());

        h.conn.start();
        h.conn.on_close();
        h.conn.on_retry_timer();
        h.conn.on_close();
        h.conn.on_retry_timer();

        // Link comes up and registers; backoff returns to the minimum.
        h.conn.on_open();
        h.conn.on_frame(r#"{"action":"register-ack"}"#);
        h.conn.on_close();

        assert_eq!(
            h.transport.retries(),
            vec![
                Duration::from_millis(5000),
                Duration::from_millis(10000),
                Duration::from_millis(5000),
            ]
        );
    }

    #[test]
    fn test_retry_timer_reconnects() {
        let mut h = harness(test_config());

        h.conn.start();
        h.conn.on_close();
        assert_eq!(h.conn.state(), ConnectionState::Disconnected);
        h.conn.on_retry_timer();
        assert_eq!(h.conn.state(), ConnectionState::Connecting);

        assert_eq!(h.transport.dials().len(), 2);
        assert!(h
            .chat
            .texts()
            .contains(&"multichat: connecting to server".to_string()));
    }

    #[test]
    fn test_close_while_registered_disconnects() {
        let mut h = harness(test_config());

        register(&mut h.conn);
        h.conn.on_close();
        assert_eq!(h.conn.state(), ConnectionState::Disconnected);

        // Sends after the loss are dropped again.
        h.conn.send("lost");
        assert_eq!(h.transport.frames().len(), 1); // just the register frame
    }
}
