//! Standalone runner for the MultiChat relay client.
//!
//! Loads the TOML configuration, initializes logging, connects the relay
//! to the configured hub, and keeps it registered until SIGINT/SIGTERM.
//! Lines typed on stdin are fed into the bus as chat from a local player,
//! which makes the runner a convenient manual harness: type anything to
//! relay it, or `!multichat connect` to force a reconnect.

use std::sync::Arc;

use multichat_events::{ChatOutput, EventBus, Player, PlayerChatEvent};
use plugin_multichat::MultiChatPlugin;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod config;
mod output;
mod signals;

use config::{AppConfig, LoggingSettings};

/// Initialize the logging system.
///
/// `RUST_LOG` overrides the configured level when set.
fn setup_logging(settings: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);

    if settings.json_format {
        registry.with(fmt::layer().json().with_target(false)).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }

    Ok(())
}

/// Feeds stdin lines into the bus as chat from a synthetic local player.
async fn stdin_loop(bus: Arc<EventBus>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let text = line.trim().to_string();
        if text.is_empty() {
            continue;
        }
        let event = PlayerChatEvent {
            player: Player::named("local"),
            text,
        };
        if let Err(e) = bus.emit("player_chat", &event).await {
            warn!("failed to emit stdin chat: {e}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    let mut app_config = AppConfig::load_from_file(&args.config_path).await?;

    // Apply CLI overrides
    if let Some(url) = args.url {
        app_config.relay.url = url;
    }
    if let Some(log_level) = args.log_level {
        app_config.logging.level = log_level;
    }
    if args.json_logs {
        app_config.logging.json_format = true;
    }

    if let Err(e) = app_config.validate() {
        eprintln!("Configuration validation failed: {e}");
        std::process::exit(1);
    }

    setup_logging(&app_config.logging)?;

    let relay_config = app_config.to_relay_config();
    info!("🚀 MultiChat relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "🌐 Hub: {} | client name: {}",
        relay_config.url,
        relay_config.client_name()
    );

    let bus = Arc::new(EventBus::new());
    let chat: Arc<dyn ChatOutput> = Arc::new(output::ChatLog);

    let handle = multichat_client::spawn(relay_config.clone(), chat);
    let plugin = MultiChatPlugin::new(Arc::new(relay_config), Arc::new(handle));
    if let Err(e) = plugin.register_handlers(&bus).await {
        error!("Failed to register event handlers: {e}");
        std::process::exit(1);
    }

    let stdin_task = tokio::spawn(stdin_loop(bus.clone()));

    info!("✅ MultiChat relay is running (Ctrl+C to stop)");
    signals::setup_signal_handlers().await?;

    info!("🛑 Shutdown signal received");
    stdin_task.abort();

    Ok(())
}
