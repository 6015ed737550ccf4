//! Structured Logging Setup via tracing-subscriber
//!
//! Reihenfolge der Quellen:
//! - Filter: `RUST_LOG`, sonst der uebergebene Level, sonst `info`
//! - Format: `KC_LOG_FORMAT`, sonst das uebergebene Format (text/json)

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable, die das konfigurierte Format ueberschreibt
pub const FORMAT_ENV: &str = "KC_LOG_FORMAT";

/// Ausgabeformat der Logzeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unbekanntes Log-Format: {other}")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// Ein zweiter Aufruf (z.B. aus mehreren Tests) aendert nichts und liefert
/// `false`.
pub fn logging_initialisieren(level: &str, format: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(FORMAT_ENV)
        .ok()
        .and_then(|f| f.parse().ok())
        .or_else(|| format.parse().ok())
        .unwrap_or_default();

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    if ergebnis.is_ok() {
        tracing::debug!(?format, "Logging initialisiert");
    }
    ergebnis.is_ok()
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level}");
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_parsen() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("JSON".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn log_format_gueltige_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig(""));
    }

    #[test]
    fn doppelte_initialisierung_ist_harmlos() {
        logging_initialisieren("warn", "text");
        assert!(!logging_initialisieren("debug", "json"));
    }
}
