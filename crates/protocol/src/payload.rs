//! Flache `<tag><wert>`-Formate
//!
//! Handshake-Nutzdaten bestehen aus wiederholten `<tag><wert>`-Paaren mit
//! den Tags `p`, `g`, `B`, `y1`, `y2` und `b`. Beim Parsen wird an jeder
//! Folge von `<`/`>` getrennt, leere Stuecke fallen weg, der Rest wird
//! paarweise gelesen. Die Reihenfolge ist beliebig, Tags muessen exakt
//! passen.
//!
//! Die Mitgliederliste des Relays nutzt dasselbe Trennzeichen:
//! `<clients><alice><bob>`.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};
use crate::package::SERVER_ABSENDER;

/// Kennung der Mitgliederliste
const MITGLIEDER_KENNUNG: &str = "clients";

/// Maximale Laenge eines Teilnehmernamens
pub const MAX_NAME_LAENGE: usize = 32;

// ---------------------------------------------------------------------------
// PayloadTag
// ---------------------------------------------------------------------------

/// Tag eines Handshake-Werts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadTag {
    /// Primzahl-Modulus
    P,
    /// Generator
    G,
    /// Oeffentlicher Diffie-Hellman-Wert des Absenders
    B,
    /// Erste Signaturkomponente
    Y1,
    /// Zweite Signaturkomponente
    Y2,
    /// Oeffentlicher Verifikationswert des Signaturschluessels
    VerifWert,
}

impl PayloadTag {
    pub const ALLE: [PayloadTag; 6] = [
        PayloadTag::P,
        PayloadTag::G,
        PayloadTag::B,
        PayloadTag::Y1,
        PayloadTag::Y2,
        PayloadTag::VerifWert,
    ];

    pub fn als_str(&self) -> &'static str {
        match self {
            PayloadTag::P => "p",
            PayloadTag::G => "g",
            PayloadTag::B => "B",
            PayloadTag::Y1 => "y1",
            PayloadTag::Y2 => "y2",
            PayloadTag::VerifWert => "b",
        }
    }

    fn aus_str(s: &str) -> Option<Self> {
        PayloadTag::ALLE.into_iter().find(|t| t.als_str() == s)
    }
}

// ---------------------------------------------------------------------------
// HandshakePayload
// ---------------------------------------------------------------------------

/// Geordnete Sammlung von Handshake-Werten
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakePayload {
    eintraege: Vec<(PayloadTag, String)>,
}

impl HandshakePayload {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Setzt einen Wert; ein bereits vorhandener Wert desselben Tags wird ersetzt
    pub fn setzen(&mut self, tag: PayloadTag, wert: impl Into<String>) -> &mut Self {
        let wert = wert.into();
        match self.eintraege.iter_mut().find(|(t, _)| *t == tag) {
            Some(eintrag) => eintrag.1 = wert,
            None => self.eintraege.push((tag, wert)),
        }
        self
    }

    /// Liefert den Wert zu `tag` oder `FehlenderWert`
    pub fn wert(&self, tag: PayloadTag) -> ProtocolResult<&str> {
        self.eintraege
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, w)| w.as_str())
            .ok_or(ProtocolError::FehlenderWert { tag: tag.als_str() })
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// Parst `<tag><wert>...`
    ///
    /// Unbekannte Tags werden uebersprungen, bei doppelten Tags gilt das
    /// erste Vorkommen.
    pub fn parsen(text: &str) -> ProtocolResult<Self> {
        let teile = stuecke(text);
        if teile.len() % 2 != 0 {
            return Err(ProtocolError::UngeradeAnzahl {
                anzahl: teile.len(),
            });
        }

        let mut payload = Self::neu();
        for paar in teile.chunks_exact(2) {
            let Some(tag) = PayloadTag::aus_str(paar[0]) else {
                continue;
            };
            if payload.wert(tag).is_err() {
                payload.eintraege.push((tag, paar[1].to_string()));
            }
        }
        Ok(payload)
    }
}

impl fmt::Display for HandshakePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (tag, wert) in &self.eintraege {
            write!(f, "<{}><{}>", tag.als_str(), wert)?;
        }
        Ok(())
    }
}

/// Zerlegt an jeder Folge von `<`/`>` und verwirft leere Stuecke
fn stuecke(text: &str) -> Vec<&str> {
    text.split(['<', '>']).filter(|s| !s.is_empty()).collect()
}

// ---------------------------------------------------------------------------
// Mitgliederliste
// ---------------------------------------------------------------------------

/// Baut `<clients><name1><name2>...`
pub fn mitgliederliste_bauen(namen: &[String]) -> String {
    let mut text = format!("<{MITGLIEDER_KENNUNG}>");
    for name in namen {
        text.push('<');
        text.push_str(name);
        text.push('>');
    }
    text
}

/// Parst eine Mitgliederliste
pub fn mitgliederliste_parsen(text: &str) -> ProtocolResult<Vec<String>> {
    let mut teile = stuecke(text).into_iter();
    match teile.next() {
        Some(MITGLIEDER_KENNUNG) => Ok(teile.map(str::to_string).collect()),
        _ => Err(ProtocolError::KeineMitgliederliste),
    }
}

/// Prueft einen Teilnehmernamen
///
/// Namen duerfen die Trennzeichen `<`/`>` und Leerraum nicht enthalten und
/// nicht den reservierten Absender des Relays tragen.
pub fn name_gueltig(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_NAME_LAENGE
        && name != SERVER_ABSENDER
        && !name.chars().any(|c| c == '<' || c == '>' || c.is_whitespace())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
