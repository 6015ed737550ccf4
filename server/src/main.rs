//! Kryptochat Relay – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet das Relay.

use anyhow::Result;
use kryptochat_observability::logging_initialisieren;
use kryptochat_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("KRYPTOCHAT_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = ServerConfig::laden(&config_pfad)?;
    logging_initialisieren(&config.logging.level, &config.logging.format);
    config.validieren()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Kryptochat Relay wird initialisiert"
    );

    Server::neu(config).starten().await
}
