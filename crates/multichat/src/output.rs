//! Local chat sink for the standalone runner.

use multichat_events::ChatOutput;
use tracing::info;

/// Chat sink that prints broadcasts to the log.
///
/// A real deployment embeds the relay crates in a game server host whose
/// sink writes into player chat; the runner has only a terminal, so
/// broadcasts land on the `chat` log target and the color hint is dropped.
pub struct ChatLog;

impl ChatOutput for ChatLog {
    fn broadcast(&self, text: &str, _color: Option<&str>) {
        info!(target: "chat", "{text}");
    }
}
