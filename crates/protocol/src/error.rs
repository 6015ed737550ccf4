//! Fehlertypen fuer das Protokoll-Crate

use thiserror::Error;

/// Fehler beim Bauen oder Parsen von Protokoll-Nutzdaten
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Handshake-Payload ohne Wert fuer Tag '{tag}'")]
    FehlenderWert { tag: &'static str },

    #[error("Handshake-Payload hat ungerade Anzahl Elemente ({anzahl})")]
    UngeradeAnzahl { anzahl: usize },

    #[error("Nachricht ist keine Mitgliederliste")]
    KeineMitgliederliste,

    #[error("Unbekannter Header: '{0}'")]
    UngueltigerHeader(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
