//! Fehlertypen fuer das Kryptografie-Subsystem

use kryptochat_protocol::{Header, ProtocolError};
use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Ungueltige Schluessel-Laenge: erwartet 16, 24 oder 32 Bytes, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erhalten: usize },

    #[error("Letzter Block zu lang fuer das Auffuellen: {laenge} Bytes")]
    UeberlangerBlock { laenge: usize },

    #[error("Ungueltige Parameter: {0}")]
    UngueltigeParameter(String),

    #[error("Einmal-Exponent ist nicht teilerfremd zu p-1")]
    KeinInverses,

    #[error("Ungueltige Handshake-Nutzdaten: {0}")]
    Payload(#[from] ProtocolError),

    #[error("Ungueltige Zahl fuer Tag '{tag}': '{wert}'")]
    UngueltigeZahl { tag: &'static str, wert: String },

    #[error("Stufe {stufe} ist im Zustand {zustand} nicht erlaubt")]
    UngueltigerUebergang { zustand: &'static str, stufe: Header },

    #[error("Keine Sitzung mit '{peer}'")]
    KeineSitzung { peer: String },

    #[error("Mit '{peer}' laeuft bereits eine Sitzung")]
    SitzungAktiv { peer: String },

    #[error("Noch kein Sitzungsschluessel fuer '{peer}'")]
    KeinSchluessel { peer: String },

    #[error("Paket ohne {feld}")]
    UnvollstaendigesPaket { feld: &'static str },
}

pub type CryptoResult<T> = Result<T, CryptoError>;
