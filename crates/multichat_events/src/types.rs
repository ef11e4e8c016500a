//! # Core Type Definitions
//!
//! Fundamental types shared by the event interface: player identity, the
//! supported language set, and the five game-event categories the relay
//! consumes.

use serde::{Deserialize, Serialize};

// ============================================================================
// Players
// ============================================================================

/// A local actor on the game server.
///
/// Chat input can originate either from a human player or from the server
/// console. Console input is administrative and must never be relayed, so
/// the flag travels with the actor everywhere chat events do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Display name of the actor
    pub name: String,
    /// Whether this actor is the server console rather than a player
    pub console: bool,
}

impl Player {
    /// Creates a regular (non-console) player with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            console: false,
        }
    }

    /// Creates the server console actor.
    pub fn console() -> Self {
        Self {
            name: "console".to_string(),
            console: true,
        }
    }

    /// Returns true if this actor is the server console.
    pub fn is_console(&self) -> bool {
        self.console
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ============================================================================
// Languages
// ============================================================================

/// Languages the relay can render join/leave and game messages in.
///
/// The set is closed: adding a language means adding a variant here and a
/// template arm in every formatter that matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lang {
    /// English (primary language; fallback for unsupported codes)
    En,
    /// Simplified Chinese
    ZhCn,
}

impl Lang {
    /// The string codes accepted in configuration files.
    pub const SUPPORTED: [&'static str; 2] = ["en", "zh-cn"];

    /// Returns the configuration-file code for this language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::ZhCn => "zh-cn",
        }
    }
}

impl Default for Lang {
    fn default() -> Self {
        Lang::En
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing a language code outside [`Lang::SUPPORTED`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("not supported language: {0}")]
pub struct UnsupportedLang(pub String);

impl std::str::FromStr for Lang {
    type Err = UnsupportedLang;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Lang::En),
            "zh-cn" => Ok(Lang::ZhCn),
            other => Err(UnsupportedLang(other.to_string())),
        }
    }
}

// ============================================================================
// Game Events
// ============================================================================

/// Chat input typed by an actor on the local server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerChatEvent {
    /// The actor who typed the line
    pub player: Player,
    /// The raw chat text
    pub text: String,
}

/// A player finished logging in. The actor is never the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLoginEvent {
    pub player: Player,
}

/// A player logged out. The actor is never the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLogoutEvent {
    pub player: Player,
}

/// A player earned an advancement.
///
/// The game layer renders the announcement text per language before the
/// event reaches the bus; the relay only selects which rendering to
/// forward. This keeps advancement naming tables out of the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancementEvent {
    pub player: Player,
    /// English rendering of the announcement
    pub text_en: String,
    /// Simplified-Chinese rendering of the announcement
    pub text_zh_cn: String,
}

impl AdvancementEvent {
    /// Returns the announcement text for the given language.
    pub fn format(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.text_en,
            Lang::ZhCn => &self.text_zh_cn,
        }
    }
}

/// A player died. Same per-language rendering contract as
/// [`AdvancementEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathEvent {
    pub player: Player,
    pub text_en: String,
    pub text_zh_cn: String,
}

impl DeathEvent {
    /// Returns the death message for the given language.
    pub fn format(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.text_en,
            Lang::ZhCn => &self.text_zh_cn,
        }
    }
}

// ============================================================================
// Chat Output
// ============================================================================

/// Sink for text shown to every actor on the local server.
///
/// Implemented by the host embedding the relay. Broadcasts are best-effort
/// and must not block; the optional color is a hex string such as
/// `"#777777"` and may be ignored by hosts without colored chat.
pub trait ChatOutput: Send + Sync {
    /// Broadcasts `text` to all local actors.
    fn broadcast(&self, text: &str, color: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_player_constructors() {
        let bob = Player::named("Bob");
        assert_eq!(bob.name, "Bob");
        assert!(!bob.is_console());

        let console = Player::console();
        assert!(console.is_console());
    }

    #[test]
    fn test_lang_parse_supported() {
        assert_eq!(Lang::from_str("en").unwrap(), Lang::En);
        assert_eq!(Lang::from_str("zh-cn").unwrap(), Lang::ZhCn);
    }

    #[test]
    fn test_lang_parse_unsupported() {
        let err = Lang::from_str("fr").unwrap_err();
        assert_eq!(err.0, "fr");
        assert!(err.to_string().contains("fr"));
    }

    #[test]
    fn test_lang_roundtrip_str() {
        for code in Lang::SUPPORTED {
            let lang = Lang::from_str(code).unwrap();
            assert_eq!(lang.as_str(), code);
        }
    }

    #[test]
    fn test_lang_default_is_primary() {
        assert_eq!(Lang::default(), Lang::En);
    }

    #[test]
    fn test_advancement_format_selects_language() {
        let event = AdvancementEvent {
            player: Player::named("Alice"),
            text_en: "Alice has made the advancement [Stone Age]".to_string(),
            text_zh_cn: "Alice取得了进度[石器时代]".to_string(),
        };
        assert_eq!(
            event.format(Lang::En),
            "Alice has made the advancement [Stone Age]"
        );
        assert_eq!(event.format(Lang::ZhCn), "Alice取得了进度[石器时代]");
    }

    #[test]
    fn test_death_format_selects_language() {
        let event = DeathEvent {
            player: Player::named("Alice"),
            text_en: "Alice fell from a high place".to_string(),
            text_zh_cn: "Alice从高处摔了下来".to_string(),
        };
        assert_eq!(event.format(Lang::En), "Alice fell from a high place");
        assert_eq!(event.format(Lang::ZhCn), "Alice从高处摔了下来");
    }

    #[test]
    fn test_chat_event_serialization() {
        let event = PlayerChatEvent {
            player: Player::named("Bob"),
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Bob"));
        assert!(json.contains("hello"));
    }
}
