//! Configuration management for the relay runner.
//!
//! Handles loading, validation, and conversion of settings from a TOML
//! file into the immutable `RelayConfig` the core consumes. The file keys
//! keep the kebab-case names the hub ecosystem has always used
//! (`multichat-url`, `multichat-key`, ...).

use multichat_client::RelayConfig;
use multichat_events::Lang;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Default for the `lang` key
fn default_lang() -> String {
    "en".to_string()
}

/// Default for ignored prefixes (none)
fn default_ignore_prefix() -> Vec<String> {
    Vec::new()
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relay settings
    pub relay: RelaySettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Relay connection and policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Hub websocket URL
    #[serde(rename = "multichat-url")]
    pub url: String,
    /// Shared secret presented during registration
    #[serde(rename = "multichat-key")]
    pub key: String,
    /// Optional server display name folded into the client name
    #[serde(rename = "server-name", default)]
    pub server_name: Option<String>,
    /// Forward local activity to the hub
    pub listen: bool,
    /// Forward hub messages into local chat
    pub post: bool,
    /// Chat prefixes that are never forwarded
    #[serde(rename = "ignore-prefix", default = "default_ignore_prefix")]
    pub ignore_prefix: Vec<String>,
    /// Language code for message templates ("en" or "zh-cn")
    #[serde(default = "default_lang")]
    pub lang: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay: RelaySettings {
                url: "ws://127.0.0.1:8765/".to_string(),
                key: String::new(),
                server_name: None,
                listen: true,
                post: true,
                ignore_prefix: vec![],
                lang: "en".to_string(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes a default configuration there and
    /// returns it; the default fails validation until a secret key is
    /// filled in, which keeps a fresh install from dialing a hub with an
    /// empty credential.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if !self.relay.url.starts_with("ws://") && !self.relay.url.starts_with("wss://") {
            return Err(format!(
                "multichat-url must be a ws:// or wss:// URL: {}",
                self.relay.url
            ));
        }

        if self.relay.key.is_empty() {
            return Err("multichat-key must be set".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }

    /// Converts the file settings into the immutable relay configuration.
    ///
    /// Normalizes the URL's trailing slash to exactly one and resolves the
    /// language code, falling back to English with a warning for codes
    /// outside the supported set — here, at startup, never at send time.
    pub fn to_relay_config(&self) -> RelayConfig {
        let lang = match self.relay.lang.parse::<Lang>() {
            Ok(lang) => lang,
            Err(e) => {
                warn!("{e}, falling back to {}", Lang::En);
                Lang::En
            }
        };

        RelayConfig {
            url: format!("{}/", self.relay.url.trim_end_matches('/')),
            secret_key: self.relay.key.clone(),
            server_name: self.relay.server_name.clone(),
            listen: self.relay.listen,
            post: self.relay.post,
            ignore_prefix: self.relay.ignore_prefix.clone(),
            lang,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use tokio::fs;

    #[test]
    fn test_default_config_shape() {
        let config = AppConfig::default();
        assert_eq!(config.relay.url, "ws://127.0.0.1:8765/");
        assert!(config.relay.key.is_empty());
        assert!(config.relay.listen);
        assert!(config.relay.post);
        assert!(config.relay.ignore_prefix.is_empty());
        assert_eq!(config.relay.lang, "en");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_config_needs_a_key() {
        let config = AppConfig::default();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("multichat-key"));
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r##"
[relay]
multichat-url = "wss://hub.example.net:8765"
multichat-key = "hunter2"
server-name = "survival"
listen = true
post = false
ignore-prefix = ["!", "#"]
lang = "zh-cn"

[logging]
level = "debug"
json_format = true
"##;
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&temp_file.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(config.relay.url, "wss://hub.example.net:8765");
        assert_eq!(config.relay.key, "hunter2");
        assert_eq!(config.relay.server_name, Some("survival".to_string()));
        assert!(config.relay.listen);
        assert!(!config.relay.post);
        assert_eq!(config.relay.ignore_prefix, vec!["!", "#"]);
        assert_eq!(config.relay.lang, "zh-cn");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.relay.url, "ws://127.0.0.1:8765/");
        assert!(path.exists());

        // The created file parses back to the same settings.
        let reread = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reread.relay.url, config.relay.url);
    }

    #[tokio::test]
    async fn test_missing_required_key_fails_to_parse() {
        // `listen` and `post` are mandatory; leaving them out is a
        // configuration error, not a silent default.
        let toml_content = r#"
[relay]
multichat-url = "ws://hub:8765/"
multichat-key = "k"

[logging]
level = "info"
json_format = false
"#;
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let result = AppConfig::load_from_file(&temp_file.path().to_path_buf()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_url_scheme() {
        let mut config = AppConfig::default();
        config.relay.key = "k".to_string();
        config.relay.url = "http://hub:8765/".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("ws://"));
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let mut config = AppConfig::default();
        config.relay.key = "k".to_string();
        config.logging.level = "chatty".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_url_trailing_slash_normalized() {
        let mut config = AppConfig::default();
        config.relay.key = "k".to_string();

        config.relay.url = "ws://hub:8765".to_string();
        assert_eq!(config.to_relay_config().url, "ws://hub:8765/");

        config.relay.url = "ws://hub:8765///".to_string();
        assert_eq!(config.to_relay_config().url, "ws://hub:8765/");

        config.relay.url = "ws://hub:8765/".to_string();
        assert_eq!(config.to_relay_config().url, "ws://hub:8765/");
    }

    #[test]
    fn test_unsupported_lang_falls_back_to_english() {
        let mut config = AppConfig::default();
        config.relay.key = "k".to_string();
        config.relay.lang = "fr".to_string();

        assert_eq!(config.to_relay_config().lang, Lang::En);
    }

    #[test]
    fn test_supported_lang_is_used() {
        let mut config = AppConfig::default();
        config.relay.key = "k".to_string();
        config.relay.lang = "zh-cn".to_string();

        assert_eq!(config.to_relay_config().lang, Lang::ZhCn);
    }
}
