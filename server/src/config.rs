//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass das Relay ohne Konfigurationsdatei
//! lauffaehig ist.

use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use kryptochat_observability::{log_format_gueltig, log_level_gueltig};
use kryptochat_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Weiterleitung und Mitgliederliste
    pub relay: RelayEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Relays (nur fuer Logs)
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Kryptochat Relay".into(),
            max_clients: 128,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 6664,
        }
    }
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Abstand zwischen zwei Mitgliederlisten pro Verbindung
    pub mitgliederliste_intervall_ms: u64,
    /// Groesse der Sende-Queue pro Client
    pub sende_warteschlange: usize,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            mitgliederliste_intervall_ms: 3000,
            sende_warteschlange: 64,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl RelayEinstellungen {
    pub fn mitgliederliste_intervall(&self) -> Duration {
        Duration::from_millis(self.mitgliederliste_intervall_ms)
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Konfigurationsdatei '{pfad}' nicht lesbar"))
            }
        }
    }

    /// Prueft Werte, die serde nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.netzwerk.port == 0 {
            bail!("netzwerk.port darf nicht 0 sein");
        }
        if self.server.max_clients == 0 {
            bail!("server.max_clients darf nicht 0 sein");
        }
        if self.relay.mitgliederliste_intervall_ms == 0 {
            bail!("relay.mitgliederliste_intervall_ms darf nicht 0 sein");
        }
        if self.relay.sende_warteschlange == 0 {
            bail!("relay.sende_warteschlange darf nicht 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekannter Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }
}
