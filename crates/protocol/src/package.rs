//! DataPackage – die Transporteinheit zwischen Client und Relay
//!
//! Das Relay liest nur `header`, `from` und `to`. Der Inhalt von
//! `administration_msg` (Handshake-Werte, Mitgliederliste) und
//! `encrypted_msg` (Chiffrat) bleibt fuer das Relay undurchsichtig.

use serde::{Deserialize, Serialize};

use crate::header::Header;
use crate::payload::{mitgliederliste_bauen, HandshakePayload};

/// Absendername fuer Pakete, die das Relay selbst erzeugt
pub const SERVER_ABSENDER: &str = "SERVER";

/// Eine Nachricht auf dem Draht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPackage {
    pub header: Header,
    /// Name des Absenders
    pub from: String,
    /// Name des Empfaengers (fehlt bei `ID_SENDING` und `CLIENTS_LIST`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Verwaltungsdaten im `<tag><wert>`-Format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administration_msg: Option<String>,
    /// Chiffrat (im JSON als Base64)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub encrypted_msg: Option<Vec<u8>>,
}

impl DataPackage {
    fn leer(header: Header, from: impl Into<String>, to: Option<String>) -> Self {
        Self {
            header,
            from: from.into(),
            to,
            administration_msg: None,
            encrypted_msg: None,
        }
    }

    /// Anmeldung beim Relay
    pub fn id_senden(name: impl Into<String>) -> Self {
        Self::leer(Header::IdSending, name, None)
    }

    /// Mitgliederliste des Relays
    pub fn mitgliederliste(namen: &[String]) -> Self {
        let mut paket = Self::leer(Header::ClientsList, SERVER_ABSENDER, None);
        paket.administration_msg = Some(mitgliederliste_bauen(namen));
        paket
    }

    /// Handshake-Stufe mit `<tag><wert>`-Nutzdaten
    pub fn handshake(
        header: Header,
        from: impl Into<String>,
        to: impl Into<String>,
        payload: &HandshakePayload,
    ) -> Self {
        let mut paket = Self::leer(header, from, Some(to.into()));
        paket.administration_msg = Some(payload.to_string());
        paket
    }

    /// Verschluesselte Nachricht
    pub fn nachricht(from: impl Into<String>, to: impl Into<String>, chiffrat: Vec<u8>) -> Self {
        let mut paket = Self::leer(Header::Msg, from, Some(to.into()));
        paket.encrypted_msg = Some(chiffrat);
        paket
    }

    /// Gespraechsende
    pub fn zerstoeren(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::leer(Header::Destroy, from, Some(to.into()))
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(wert: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match wert {
            Some(bytes) => s.serialize_str(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let text: Option<String> = Option::deserialize(d)?;
        text.map(|t| STANDARD.decode(t).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadTag;

    #[test]
    fn chiffrat_wird_als_base64_serialisiert() {
        let paket = DataPackage::nachricht("alice", "bob", vec![0, 1, 2, 255]);
        let json = serde_json::to_value(&paket).unwrap();
        assert_eq!(json["header"], "MSG");
        assert_eq!(json["encrypted_msg"], "AAEC/w==");
        assert!(json.get("administration_msg").is_none());

        let zurueck: DataPackage = serde_json::from_value(json).unwrap();
        assert_eq!(zurueck, paket);
    }

    #[test]
    fn id_senden_hat_keinen_empfaenger() {
        let paket = DataPackage::id_senden("alice");
        assert_eq!(paket.header, Header::IdSending);
        assert_eq!(paket.from, "alice");
        assert!(paket.to.is_none());
    }

    #[test]
    fn mitgliederliste_kommt_vom_server() {
        let paket = DataPackage::mitgliederliste(&["alice".into(), "bob".into()]);
        assert_eq!(paket.from, SERVER_ABSENDER);
        assert_eq!(
            paket.administration_msg.as_deref(),
            Some("<clients><alice><bob>")
        );
    }

    #[test]
    fn handshake_paket_traegt_payload_text() {
        let mut payload = HandshakePayload::neu();
        payload.setzen(PayloadTag::P, "23").setzen(PayloadTag::G, "5");
        let paket = DataPackage::handshake(Header::Init, "alice", "bob", &payload);
        assert_eq!(paket.to.as_deref(), Some("bob"));
        assert_eq!(paket.administration_msg.as_deref(), Some("<p><23><g><5>"));
    }

    #[test]
    fn ungueltiges_base64_wird_abgelehnt() {
        let json = r#"{"header":"MSG","from":"a","to":"b","encrypted_msg":"%%%"}"#;
        assert!(serde_json::from_str::<DataPackage>(json).is_err());
    }
}
