//! Stufen-Tags der Nachrichten
//!
//! Jedes `DataPackage` traegt genau einen Header. `ID_SENDING` und
//! `CLIENTS_LIST` gehoeren zur Relay-Schicht, alle anderen werden vom
//! Relay unveraendert zwischen zwei Teilnehmern weitergereicht.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Header (Stufen-Tag) eines `DataPackage`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Header {
    /// Erste Nachricht nach dem Verbindungsaufbau: Anmeldung mit Namen
    IdSending,
    /// Vom Relay periodisch verteilte Liste der verbundenen Teilnehmer
    ClientsList,
    /// Handshake-Start des Initiators
    Init,
    /// Antwort des Responders auf `Init`
    BackwardInit,
    /// Abschliessende Bestaetigung des Initiators
    SignatureEnding,
    /// Gespraech beenden
    Destroy,
    /// Verschluesselte Nutzlast
    Msg,
}

impl Header {
    /// Alle Header in Protokoll-Reihenfolge
    pub const ALLE: [Header; 7] = [
        Header::IdSending,
        Header::ClientsList,
        Header::Init,
        Header::BackwardInit,
        Header::SignatureEnding,
        Header::Destroy,
        Header::Msg,
    ];

    /// Wire-Name des Headers
    pub fn als_str(&self) -> &'static str {
        match self {
            Header::IdSending => "ID_SENDING",
            Header::ClientsList => "CLIENTS_LIST",
            Header::Init => "INIT",
            Header::BackwardInit => "BACKWARD_INIT",
            Header::SignatureEnding => "SIGNATURE_ENDING",
            Header::Destroy => "DESTROY",
            Header::Msg => "MSG",
        }
    }

    /// `true` fuer die drei Handshake-Stufen
    pub fn ist_handshake(&self) -> bool {
        matches!(
            self,
            Header::Init | Header::BackwardInit | Header::SignatureEnding
        )
    }

    /// `true` fuer Header, die nur zwischen Client und Relay vorkommen
    pub fn ist_relay_intern(&self) -> bool {
        matches!(self, Header::IdSending | Header::ClientsList)
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

impl std::str::FromStr for Header {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Header::ALLE
            .into_iter()
            .find(|h| h.als_str() == s)
            .ok_or_else(|| ProtocolError::UngueltigerHeader(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
