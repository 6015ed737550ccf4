//! Sitzungen eines Teilnehmers, eine pro Peer
//!
//! Der Manager gehoert exklusiv der Empfangsschleife einer Verbindung und
//! verarbeitet ein Paket nach dem anderen. Er uebersetzt zwischen
//! `DataPackage` und den Eingaengen/Aktionen der Zustandsmaschine.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kryptochat_protocol::{DataPackage, HandshakePayload, Header};

use super::sitzung::{Aktion, Eingang, KeyAgreementSession, SessionState};
use crate::dh::DhKonfig;
use crate::error::{CryptoError, CryptoResult};

/// Ergebnis eines verarbeiteten Pakets fuer die Anwendungsschicht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEreignis {
    /// Paket an das Relay senden
    Senden(DataPackage),
    Etabliert { peer: String, autorisiert: bool },
    Nachricht {
        peer: String,
        klartext: Vec<u8>,
        autorisiert: bool,
    },
    Beendet { peer: String },
}

/// Verwaltung aller Sitzungen eines lokalen Teilnehmers
pub struct SessionManager<R: Rng = StdRng> {
    eigener_name: String,
    dh_konfig: DhKonfig,
    sitzungen: HashMap<String, KeyAgreementSession>,
    rng: R,
}

impl SessionManager<StdRng> {
    pub fn neu(eigener_name: impl Into<String>, dh_konfig: DhKonfig) -> Self {
        Self::mit_rng(eigener_name, dh_konfig, StdRng::from_entropy())
    }
}

impl<R: Rng> SessionManager<R> {
    /// Manager mit vorgegebener Zufallsquelle
    pub fn mit_rng(eigener_name: impl Into<String>, dh_konfig: DhKonfig, rng: R) -> Self {
        Self {
            eigener_name: eigener_name.into(),
            dh_konfig,
            sitzungen: HashMap::new(),
            rng,
        }
    }

    pub fn eigener_name(&self) -> &str {
        &self.eigener_name
    }

    pub fn sitzung(&self, peer: &str) -> Option<&KeyAgreementSession> {
        self.sitzungen.get(peer)
    }

    /// Peers mit laufender oder etablierter Sitzung, sortiert
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.sitzungen.keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Startet einen Handshake als Initiator und liefert das INIT-Paket
    pub fn gespraech_starten(&mut self, peer: &str) -> CryptoResult<DataPackage> {
        if self.sitzungen.get(peer).is_some_and(|s| s.ist_aktiv()) {
            return Err(CryptoError::SitzungAktiv {
                peer: peer.to_string(),
            });
        }

        let mut sitzung = KeyAgreementSession::neu(peer);
        let payload = sitzung.initiieren(&self.dh_konfig, &mut self.rng)?;
        self.sitzungen.insert(peer.to_string(), sitzung);

        tracing::info!(peer, "Handshake gestartet");
        Ok(DataPackage::handshake(
            Header::Init,
            &self.eigener_name,
            peer,
            &payload,
        ))
    }

    /// Verschluesselt `text` fuer `peer`
    pub fn nachricht_senden(&mut self, peer: &str, text: &str) -> CryptoResult<DataPackage> {
        let sitzung = self
            .sitzungen
            .get(peer)
            .ok_or_else(|| CryptoError::KeineSitzung {
                peer: peer.to_string(),
            })?;
        let chiffrat = sitzung.verschluesseln(text.as_bytes())?;
        Ok(DataPackage::nachricht(&self.eigener_name, peer, chiffrat))
    }

    /// Entfernt die Sitzung und liefert die DESTROY-Nachricht, falls es eine gab
    pub fn gespraech_beenden(&mut self, peer: &str) -> Option<DataPackage> {
        let mut sitzung = self.sitzungen.remove(peer)?;
        if let Err(e) = sitzung.verarbeiten(Eingang::Destroy, &mut self.rng) {
            tracing::debug!(peer, fehler = %e, "Sitzung nicht sauber zerstoert");
        }
        tracing::info!(peer, "Gespraech beendet");
        Some(DataPackage::zerstoeren(&self.eigener_name, peer))
    }

    /// Verarbeitet ein eingehendes Paket
    ///
    /// Schlaegt ein Handshake-Schritt fehl, wird die Sitzung verworfen.
    pub fn paket_verarbeiten(&mut self, paket: DataPackage) -> CryptoResult<Vec<SessionEreignis>> {
        let peer = paket.from.clone();

        match paket.header {
            Header::IdSending | Header::ClientsList => {
                tracing::debug!(header = %paket.header, "Relay-Paket ignoriert");
                Ok(Vec::new())
            }
            Header::Msg => self.nachricht_empfangen(&peer, paket),
            Header::Destroy => self.destroy_empfangen(&peer),
            Header::Init => {
                let payload = self.payload_lesen(&peer, &paket)?;
                self.init_vorbereiten(&peer);
                self.handshake_verarbeiten(&peer, Eingang::Init(payload))
            }
            Header::BackwardInit => {
                let payload = self.payload_lesen(&peer, &paket)?;
                self.handshake_verarbeiten(&peer, Eingang::BackwardInit(payload))
            }
            Header::SignatureEnding => {
                let payload = self.payload_lesen(&peer, &paket)?;
                self.handshake_verarbeiten(&peer, Eingang::SignatureEnding(payload))
            }
        }
    }

    fn nachricht_empfangen(
        &mut self,
        peer: &str,
        paket: DataPackage,
    ) -> CryptoResult<Vec<SessionEreignis>> {
        let sitzung = self
            .sitzungen
            .get(peer)
            .ok_or_else(|| CryptoError::KeineSitzung {
                peer: peer.to_string(),
            })?;
        let chiffrat = paket
            .encrypted_msg
            .ok_or(CryptoError::UnvollstaendigesPaket {
                feld: "encrypted_msg",
            })?;
        let nachricht = sitzung.entschluesseln(&chiffrat)?;
        if !nachricht.autorisiert {
            tracing::warn!(peer, "Nachricht aus nicht autorisierter Sitzung");
        }

        Ok(vec![SessionEreignis::Nachricht {
            peer: peer.to_string(),
            klartext: nachricht.klartext,
            autorisiert: nachricht.autorisiert,
        }])
    }

    fn destroy_empfangen(&mut self, peer: &str) -> CryptoResult<Vec<SessionEreignis>> {
        let Some(mut sitzung) = self.sitzungen.remove(peer) else {
            tracing::debug!(peer, "DESTROY ohne Sitzung");
            return Ok(Vec::new());
        };
        let aktionen = sitzung.verarbeiten(Eingang::Destroy, &mut self.rng)?;
        tracing::info!(peer, "Gegenseite hat das Gespraech beendet");
        Ok(self.aktionen_umsetzen(peer, aktionen))
    }

    /// Nicht lesbare Nutzdaten verwerfen die Sitzung
    fn payload_lesen(&mut self, peer: &str, paket: &DataPackage) -> CryptoResult<HandshakePayload> {
        let text = paket
            .administration_msg
            .as_deref()
            .ok_or(CryptoError::UnvollstaendigesPaket {
                feld: "administration_msg",
            })?;
        HandshakePayload::parsen(text).map_err(|e| {
            self.sitzungen.remove(peer);
            e.into()
        })
    }

    fn handshake_verarbeiten(
        &mut self,
        peer: &str,
        eingang: Eingang,
    ) -> CryptoResult<Vec<SessionEreignis>> {
        let sitzung = self
            .sitzungen
            .get_mut(peer)
            .ok_or_else(|| CryptoError::KeineSitzung {
                peer: peer.to_string(),
            })?;

        match sitzung.verarbeiten(eingang, &mut self.rng) {
            Ok(aktionen) => Ok(self.aktionen_umsetzen(peer, aktionen)),
            Err(e) => {
                self.sitzungen.remove(peer);
                Err(e)
            }
        }
    }

    fn aktionen_umsetzen(&self, peer: &str, aktionen: Vec<Aktion>) -> Vec<SessionEreignis> {
        aktionen
            .into_iter()
            .map(|aktion| match aktion {
                Aktion::Senden { stufe, payload } => SessionEreignis::Senden(
                    DataPackage::handshake(stufe, &self.eigener_name, peer, &payload),
                ),
                Aktion::Etabliert { autorisiert } => SessionEreignis::Etabliert {
                    peer: peer.to_string(),
                    autorisiert,
                },
                Aktion::Zerstoert => SessionEreignis::Beendet {
                    peer: peer.to_string(),
                },
            })
            .collect()
    }

    /// Waehlt die Sitzung, die ein eingehendes INIT verarbeitet
    ///
    /// Haben beide Seiten initiiert, behaelt der Teilnehmer mit dem kleineren
    /// Namen die Initiatorrolle und sendet sein INIT erneut, falls das erste
    /// verloren ging. Der andere verwirft seinen Versuch und antwortet.
    fn init_vorbereiten(&mut self, peer: &str) {
        let ersetzen = match self.sitzungen.get(peer).map(|s| s.zustand()) {
            None => true,
            Some(SessionState::Initiiert { .. }) => {
                let bleibt_initiator = self.eigener_name.as_str() < peer;
                tracing::debug!(peer, bleibt_initiator, "Gleichzeitiges INIT");
                !bleibt_initiator
            }
            Some(_) => false,
        };
        if ersetzen {
            self.sitzungen
                .insert(peer.to_string(), KeyAgreementSession::neu(peer));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
