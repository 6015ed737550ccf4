//! Zustandsmaschine einer Schluesselvereinbarung mit genau einem Peer
//!
//! ```text
//! Leerlauf --initiieren--> Initiiert --BACKWARD_INIT--> Etabliert
//! Leerlauf --INIT--> WartetAufBestaetigung --SIGNATURE_ENDING--> Etabliert
//! Initiiert --INIT--> Initiiert (eigenes INIT erneut senden)
//! WartetAufBestaetigung/Etabliert --neues INIT--> WartetAufBestaetigung
//! jeder Zustand --DESTROY--> Zerstoert
//! ```
//!
//! Jede Nachricht signiert den Wert, den sie neu einfuehrt: INIT den
//! oeffentlichen Wert des Initiators, BACKWARD_INIT den des Responders.
//! SIGNATURE_ENDING fuehrt keinen neuen Wert ein; der Initiator signiert
//! darin den empfangenen Wert des Responders mit einem frischen
//! Einmal-Exponenten.
//!
//! Eine fehlgeschlagene Signaturpruefung bricht den Handshake nicht ab,
//! sondern setzt `autorisiert` dauerhaft auf `false`.

use std::mem;

use num_bigint::BigUint;
use rand::Rng;

use kryptochat_protocol::{HandshakePayload, Header, PayloadTag};

use crate::aes;
use crate::dh::{DhKonfig, DhParameter, DhSchluesselpaar};
use crate::elgamal::{self, Signatur, SignaturSchluessel};
use crate::error::{CryptoError, CryptoResult};
use crate::types::CipherKey;

/// Zustand einer Sitzung
#[derive(Debug)]
pub enum SessionState {
    Leerlauf,
    /// INIT gesendet, Antwort steht aus
    Initiiert {
        dh: DhSchluesselpaar,
        signatur: SignaturSchluessel,
    },
    /// INIT beantwortet, Schluessel abgeleitet, SIGNATURE_ENDING steht aus
    WartetAufBestaetigung {
        dh: DhSchluesselpaar,
        peer_verifwert: BigUint,
        schluessel: CipherKey,
        autorisiert: bool,
    },
    Etabliert {
        schluessel: CipherKey,
        autorisiert: bool,
    },
    Zerstoert,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Leerlauf => "Leerlauf",
            SessionState::Initiiert { .. } => "Initiiert",
            SessionState::WartetAufBestaetigung { .. } => "WartetAufBestaetigung",
            SessionState::Etabliert { .. } => "Etabliert",
            SessionState::Zerstoert => "Zerstoert",
        }
    }
}

/// Eingehende Handshake-Stufe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eingang {
    Init(HandshakePayload),
    BackwardInit(HandshakePayload),
    SignatureEnding(HandshakePayload),
    Destroy,
}

impl Eingang {
    pub fn stufe(&self) -> Header {
        match self {
            Eingang::Init(_) => Header::Init,
            Eingang::BackwardInit(_) => Header::BackwardInit,
            Eingang::SignatureEnding(_) => Header::SignatureEnding,
            Eingang::Destroy => Header::Destroy,
        }
    }
}

/// Nebenwirkung eines Zustandsuebergangs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aktion {
    /// Handshake-Stufe an den Peer senden
    Senden {
        stufe: Header,
        payload: HandshakePayload,
    },
    /// Sitzung hat `Etabliert` erreicht
    Etabliert { autorisiert: bool },
    Zerstoert,
}

/// Entschluesselte Nachricht mit dem Autorisierungsstatus der Sitzung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntschluesselteNachricht {
    pub klartext: Vec<u8>,
    /// `false`, wenn eine Signaturpruefung im Handshake fehlschlug
    pub autorisiert: bool,
}

/// Schluesselvereinbarung mit einem Peer
#[derive(Debug)]
pub struct KeyAgreementSession {
    peer: String,
    zustand: SessionState,
}

impl KeyAgreementSession {
    pub fn neu(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            zustand: SessionState::Leerlauf,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn zustand(&self) -> &SessionState {
        &self.zustand
    }

    /// `true` zwischen Handshake-Beginn und Zerstoerung
    pub fn ist_aktiv(&self) -> bool {
        !matches!(
            self.zustand,
            SessionState::Leerlauf | SessionState::Zerstoert
        )
    }

    pub fn ist_etabliert(&self) -> bool {
        matches!(self.zustand, SessionState::Etabliert { .. })
    }

    /// Autorisierungsstatus, sobald ein Schluessel existiert
    pub fn autorisiert(&self) -> Option<bool> {
        match &self.zustand {
            SessionState::WartetAufBestaetigung { autorisiert, .. }
            | SessionState::Etabliert { autorisiert, .. } => Some(*autorisiert),
            _ => None,
        }
    }

    /// Abgeleiteter Sitzungsschluessel (ab `WartetAufBestaetigung`)
    pub fn schluessel(&self) -> Option<&CipherKey> {
        match &self.zustand {
            SessionState::WartetAufBestaetigung { schluessel, .. }
            | SessionState::Etabliert { schluessel, .. } => Some(schluessel),
            _ => None,
        }
    }

    /// Startet den Handshake als Initiator und liefert die INIT-Nutzdaten
    pub fn initiieren<R: Rng + ?Sized>(
        &mut self,
        konfig: &DhKonfig,
        rng: &mut R,
    ) -> CryptoResult<HandshakePayload> {
        if !matches!(self.zustand, SessionState::Leerlauf) {
            return Err(CryptoError::UngueltigerUebergang {
                zustand: self.zustand.name(),
                stufe: Header::Init,
            });
        }

        let parameter = DhParameter::generieren(konfig, rng)?;
        let dh = DhSchluesselpaar::zufaellig(parameter.clone(), rng);
        let signatur = SignaturSchluessel::erzeugen(parameter, rng);
        let payload = init_payload(&dh, &signatur, rng)?;

        tracing::debug!(peer = %self.peer, bits = konfig.primzahl_bits, "INIT vorbereitet");
        self.zustand = SessionState::Initiiert { dh, signatur };
        Ok(payload)
    }

    /// Verarbeitet eine eingehende Stufe
    ///
    /// Bei einem Fehler ist die Sitzung danach `Zerstoert`.
    pub fn verarbeiten<R: Rng + ?Sized>(
        &mut self,
        eingang: Eingang,
        rng: &mut R,
    ) -> CryptoResult<Vec<Aktion>> {
        let zustand = mem::replace(&mut self.zustand, SessionState::Zerstoert);
        let stufe = eingang.stufe();

        let ergebnis = match (zustand, eingang) {
            (_, Eingang::Destroy) => {
                tracing::debug!(peer = %self.peer, "Sitzung zerstoert");
                Ok((SessionState::Zerstoert, vec![Aktion::Zerstoert]))
            }
            (SessionState::Leerlauf, Eingang::Init(payload)) => {
                self.init_beantworten(&payload, rng)
            }
            (SessionState::Etabliert { .. }, Eingang::Init(payload)) => {
                tracing::info!(peer = %self.peer, "Gegenseite startet neu");
                self.init_beantworten(&payload, rng)
            }
            (SessionState::Initiiert { dh, signatur }, Eingang::Init(_)) => {
                self.init_wiederholen(dh, signatur, rng)
            }
            (
                SessionState::WartetAufBestaetigung {
                    dh,
                    peer_verifwert,
                    schluessel,
                    autorisiert,
                },
                Eingang::Init(payload),
            ) => {
                match zahl(&payload, PayloadTag::VerifWert) {
                    Ok(b) if b == peer_verifwert => {
                        tracing::debug!(peer = %self.peer, "INIT bereits beantwortet");
                        Ok((
                            SessionState::WartetAufBestaetigung {
                                dh,
                                peer_verifwert,
                                schluessel,
                                autorisiert,
                            },
                            Vec::new(),
                        ))
                    }
                    _ => {
                        tracing::info!(peer = %self.peer, "Gegenseite startet neu");
                        self.init_beantworten(&payload, rng)
                    }
                }
            }
            (SessionState::Initiiert { dh, signatur }, Eingang::BackwardInit(payload)) => {
                self.antwort_abschliessen(dh, signatur, &payload, rng)
            }
            (
                SessionState::WartetAufBestaetigung {
                    dh,
                    peer_verifwert,
                    schluessel,
                    autorisiert,
                },
                Eingang::SignatureEnding(payload),
            ) => self.bestaetigung_pruefen(dh, peer_verifwert, schluessel, autorisiert, &payload),
            (zustand, _) => Err(CryptoError::UngueltigerUebergang {
                zustand: zustand.name(),
                stufe,
            }),
        };

        match ergebnis {
            Ok((neuer_zustand, aktionen)) => {
                self.zustand = neuer_zustand;
                Ok(aktionen)
            }
            Err(e) => {
                tracing::warn!(peer = %self.peer, %stufe, error = %e, "Handshake abgebrochen");
                Err(e)
            }
        }
    }

    /// Responder: Parameter uebernehmen, antworten, Schluessel ableiten
    fn init_beantworten<R: Rng + ?Sized>(
        &self,
        payload: &HandshakePayload,
        rng: &mut R,
    ) -> CryptoResult<(SessionState, Vec<Aktion>)> {
        let parameter = DhParameter::neu(zahl(payload, PayloadTag::P)?, zahl(payload, PayloadTag::G)?)?;
        let peer_wert = zahl(payload, PayloadTag::B)?;
        let peer_signatur = signatur_lesen(payload)?;
        let peer_verifwert = zahl(payload, PayloadTag::VerifWert)?;

        let autorisiert = elgamal::verifizieren(&parameter, &peer_wert, &peer_signatur, &peer_verifwert);
        if !autorisiert {
            tracing::warn!(peer = %self.peer, "Signatur in INIT ungueltig");
        }

        let mut dh = DhSchluesselpaar::zufaellig(parameter.clone(), rng);
        dh.peer_wert_annehmen(peer_wert)?;
        let schluessel = dh.gemeinsames_geheimnis_ableiten()?.schluessel;

        let signatur = SignaturSchluessel::erzeugen(parameter, rng);
        let sig = signatur.signieren(dh.oeffentlich(), rng)?;

        let mut antwort = HandshakePayload::neu();
        antwort
            .setzen(PayloadTag::B, dh.oeffentlich().to_string())
            .setzen(PayloadTag::Y1, sig.y1.to_string())
            .setzen(PayloadTag::Y2, sig.y2.to_string())
            .setzen(PayloadTag::VerifWert, signatur.verifikationswert().to_string());

        tracing::debug!(peer = %self.peer, autorisiert, "INIT beantwortet");
        Ok((
            SessionState::WartetAufBestaetigung {
                dh,
                peer_verifwert,
                schluessel,
                autorisiert,
            },
            vec![Aktion::Senden {
                stufe: Header::BackwardInit,
                payload: antwort,
            }],
        ))
    }

    /// Initiator: eigenes INIT erneut senden, die Rolle bleibt
    ///
    /// Ein INIT des Peers im Zustand `Initiiert` kann heissen, dass unser
    /// INIT ihn nie erreicht hat. Der Peer erkennt die Wiederholung am
    /// unveraenderten Verifikationswert `b`.
    fn init_wiederholen<R: Rng + ?Sized>(
        &self,
        dh: DhSchluesselpaar,
        signatur: SignaturSchluessel,
        rng: &mut R,
    ) -> CryptoResult<(SessionState, Vec<Aktion>)> {
        let payload = init_payload(&dh, &signatur, rng)?;
        tracing::debug!(peer = %self.peer, "INIT erneut gesendet");
        Ok((
            SessionState::Initiiert { dh, signatur },
            vec![Aktion::Senden {
                stufe: Header::Init,
                payload,
            }],
        ))
    }

    /// Initiator: Antwort pruefen, Schluessel ableiten, bestaetigen
    fn antwort_abschliessen<R: Rng + ?Sized>(
        &self,
        mut dh: DhSchluesselpaar,
        signatur: SignaturSchluessel,
        payload: &HandshakePayload,
        rng: &mut R,
    ) -> CryptoResult<(SessionState, Vec<Aktion>)> {
        let peer_wert = zahl(payload, PayloadTag::B)?;
        let peer_signatur = signatur_lesen(payload)?;
        let peer_verifwert = zahl(payload, PayloadTag::VerifWert)?;

        let autorisiert =
            elgamal::verifizieren(dh.parameter(), &peer_wert, &peer_signatur, &peer_verifwert);
        if !autorisiert {
            tracing::warn!(peer = %self.peer, "Signatur in BACKWARD_INIT ungueltig");
        }

        dh.peer_wert_annehmen(peer_wert.clone())?;
        let schluessel = dh.gemeinsames_geheimnis_ableiten()?.schluessel;

        let sig = signatur.signieren(&peer_wert, rng)?;
        let mut bestaetigung = HandshakePayload::neu();
        bestaetigung
            .setzen(PayloadTag::Y1, sig.y1.to_string())
            .setzen(PayloadTag::Y2, sig.y2.to_string());

        tracing::info!(peer = %self.peer, autorisiert, "Sitzung etabliert (Initiator)");
        Ok((
            SessionState::Etabliert {
                schluessel,
                autorisiert,
            },
            vec![
                Aktion::Senden {
                    stufe: Header::SignatureEnding,
                    payload: bestaetigung,
                },
                Aktion::Etabliert { autorisiert },
            ],
        ))
    }

    /// Responder: Signatur ueber den eigenen Wert pruefen
    fn bestaetigung_pruefen(
        &self,
        dh: DhSchluesselpaar,
        peer_verifwert: BigUint,
        schluessel: CipherKey,
        autorisiert: bool,
        payload: &HandshakePayload,
    ) -> CryptoResult<(SessionState, Vec<Aktion>)> {
        let sig = signatur_lesen(payload)?;
        let gueltig = elgamal::verifizieren(dh.parameter(), dh.oeffentlich(), &sig, &peer_verifwert);
        if !gueltig {
            tracing::warn!(peer = %self.peer, "Signatur in SIGNATURE_ENDING ungueltig");
        }
        let autorisiert = autorisiert && gueltig;

        tracing::info!(peer = %self.peer, autorisiert, "Sitzung etabliert (Responder)");
        Ok((
            SessionState::Etabliert {
                schluessel,
                autorisiert,
            },
            vec![Aktion::Etabliert { autorisiert }],
        ))
    }

    /// Verschluesselt mit dem Sitzungsschluessel
    pub fn verschluesseln(&self, klartext: &[u8]) -> CryptoResult<Vec<u8>> {
        let schluessel = self.schluessel().ok_or_else(|| CryptoError::KeinSchluessel {
            peer: self.peer.clone(),
        })?;
        aes::verschluesseln(klartext, schluessel.as_bytes())
    }

    /// Entschluesselt und markiert das Ergebnis mit `autorisiert`
    pub fn entschluesseln(&self, chiffrat: &[u8]) -> CryptoResult<EntschluesselteNachricht> {
        let (schluessel, autorisiert) = match &self.zustand {
            SessionState::WartetAufBestaetigung {
                schluessel,
                autorisiert,
                ..
            }
            | SessionState::Etabliert {
                schluessel,
                autorisiert,
            } => (schluessel, *autorisiert),
            _ => {
                return Err(CryptoError::KeinSchluessel {
                    peer: self.peer.clone(),
                })
            }
        };
        Ok(EntschluesselteNachricht {
            klartext: aes::entschluesseln(chiffrat, schluessel.as_bytes())?,
            autorisiert,
        })
    }
}

/// INIT-Nutzdaten mit frischer Signatur ueber den eigenen oeffentlichen Wert
fn init_payload<R: Rng + ?Sized>(
    dh: &DhSchluesselpaar,
    signatur: &SignaturSchluessel,
    rng: &mut R,
) -> CryptoResult<HandshakePayload> {
    let parameter = dh.parameter();
    let sig = signatur.signieren(dh.oeffentlich(), rng)?;

    let mut payload = HandshakePayload::neu();
    payload
        .setzen(PayloadTag::P, parameter.p().to_string())
        .setzen(PayloadTag::G, parameter.g().to_string())
        .setzen(PayloadTag::B, dh.oeffentlich().to_string())
        .setzen(PayloadTag::Y1, sig.y1.to_string())
        .setzen(PayloadTag::Y2, sig.y2.to_string())
        .setzen(PayloadTag::VerifWert, signatur.verifikationswert().to_string());
    Ok(payload)
}

fn zahl(payload: &HandshakePayload, tag: PayloadTag) -> CryptoResult<BigUint> {
    let wert = payload.wert(tag)?;
    wert.parse::<BigUint>()
        .map_err(|_| CryptoError::UngueltigeZahl {
            tag: tag.als_str(),
            wert: wert.to_string(),
        })
}

fn signatur_lesen(payload: &HandshakePayload) -> CryptoResult<Signatur> {
    Ok(Signatur {
        y1: zahl(payload, PayloadTag::Y1)?,
        y2: zahl(payload, PayloadTag::Y2)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn konfig() -> DhKonfig {
        DhKonfig::neu(128).unwrap()
    }

    fn gesendet(aktionen: &[Aktion]) -> (Header, HandshakePayload) {
        aktionen
            .iter()
            .find_map(|a| match a {
                Aktion::Senden { stufe, payload } => Some((*stufe, payload.clone())),
                _ => None,
            })
            .expect("keine Sende-Aktion")
    }

    /// Fuehrt INIT und BACKWARD_INIT aus; `manipulieren` darf INIT veraendern
    fn bis_backward_init(
        rng: &mut StdRng,
        manipulieren: impl FnOnce(&mut HandshakePayload),
    ) -> (KeyAgreementSession, KeyAgreementSession, HandshakePayload) {
        let mut alice = KeyAgreementSession::neu("bob");
        let mut bob = KeyAgreementSession::neu("alice");

        let mut init = alice.initiieren(&konfig(), rng).unwrap();
        manipulieren(&mut init);

        let aktionen = bob.verarbeiten(Eingang::Init(init), rng).unwrap();
        let (stufe, backward) = gesendet(&aktionen);
        assert_eq!(stufe, Header::BackwardInit);
        (alice, bob, backward)
    }

    fn vollstaendiger_handshake(rng: &mut StdRng) -> (KeyAgreementSession, KeyAgreementSession) {
        let (mut alice, mut bob, backward) = bis_backward_init(rng, |_| {});
        let aktionen = alice.verarbeiten(Eingang::BackwardInit(backward), rng).unwrap();
        let (stufe, ending) = gesendet(&aktionen);
        assert_eq!(stufe, Header::SignatureEnding);
        bob.verarbeiten(Eingang::SignatureEnding(ending), rng).unwrap();
        (alice, bob)
    }

    #[test]
    fn handshake_ende_zu_ende() {
        let mut rng = StdRng::seed_from_u64(1);
        let (alice, bob) = vollstaendiger_handshake(&mut rng);

        assert!(alice.ist_etabliert());
        assert!(bob.ist_etabliert());
        assert_eq!(alice.schluessel(), bob.schluessel());
        assert_eq!(alice.schluessel().unwrap().len(), 16);
        assert_eq!(alice.autorisiert(), Some(true));
        assert_eq!(bob.autorisiert(), Some(true));
    }

    #[test]
    fn initiator_meldet_etabliert() {
        let mut rng = StdRng::seed_from_u64(2);
        let (mut alice, _bob, backward) = bis_backward_init(&mut rng, |_| {});
        let aktionen = alice
            .verarbeiten(Eingang::BackwardInit(backward), &mut rng)
            .unwrap();
        assert!(aktionen.contains(&Aktion::Etabliert { autorisiert: true }));
    }

    #[test]
    fn nachrichten_in_beide_richtungen() {
        let mut rng = StdRng::seed_from_u64(3);
        let (alice, bob) = vollstaendiger_handshake(&mut rng);

        let chiffrat = alice.verschluesseln(b"Hallo Bob").unwrap();
        assert_eq!(chiffrat.len() % 16, 0);
        let nachricht = bob.entschluesseln(&chiffrat).unwrap();
        assert_eq!(nachricht.klartext, b"Hallo Bob");
        assert!(nachricht.autorisiert);

        let antwort = bob.verschluesseln(b"Hallo Alice").unwrap();
        assert_eq!(alice.entschluesseln(&antwort).unwrap().klartext, b"Hallo Alice");
    }

    #[test]
    fn responder_hat_schluessel_vor_bestaetigung() {
        let mut rng = StdRng::seed_from_u64(4);
        let (_alice, bob, _) = bis_backward_init(&mut rng, |_| {});

        assert!(matches!(
            bob.zustand(),
            SessionState::WartetAufBestaetigung { .. }
        ));
        assert!(bob.schluessel().is_some());
        assert!(bob.verschluesseln(b"frueh").is_ok());
    }

    #[test]
    fn manipulierter_oeffentlicher_wert() {
        let mut rng = StdRng::seed_from_u64(5);
        let (mut alice, mut bob, backward) = bis_backward_init(&mut rng, |init| {
            let b: BigUint = init.wert(PayloadTag::B).unwrap().parse().unwrap();
            init.setzen(PayloadTag::B, (b + 1u32).to_string());
        });

        let aktionen = alice
            .verarbeiten(Eingang::BackwardInit(backward), &mut rng)
            .unwrap();
        let (_, ending) = gesendet(&aktionen);
        bob.verarbeiten(Eingang::SignatureEnding(ending), &mut rng)
            .unwrap();

        // Der Handshake laeuft durch, aber Bob misstraut der Sitzung
        assert!(alice.ist_etabliert());
        assert!(bob.ist_etabliert());
        assert_eq!(bob.autorisiert(), Some(false));
        assert_ne!(alice.schluessel(), bob.schluessel());
    }

    #[test]
    fn manipulierte_bestaetigung() {
        let mut rng = StdRng::seed_from_u64(6);
        let (mut alice, mut bob, backward) = bis_backward_init(&mut rng, |_| {});
        let aktionen = alice
            .verarbeiten(Eingang::BackwardInit(backward), &mut rng)
            .unwrap();
        let (_, mut ending) = gesendet(&aktionen);
        let y2: BigUint = ending.wert(PayloadTag::Y2).unwrap().parse().unwrap();
        ending.setzen(PayloadTag::Y2, (y2 ^ BigUint::from(1u32)).to_string());

        let aktionen = bob
            .verarbeiten(Eingang::SignatureEnding(ending), &mut rng)
            .unwrap();
        assert_eq!(aktionen, vec![Aktion::Etabliert { autorisiert: false }]);

        let chiffrat = alice.verschluesseln(b"x").unwrap();
        assert!(!bob.entschluesseln(&chiffrat).unwrap().autorisiert);
    }

    #[test]
    fn manipulierte_antwort_trifft_initiator() {
        let mut rng = StdRng::seed_from_u64(7);
        let (mut alice, _bob, mut backward) = bis_backward_init(&mut rng, |_| {});
        let y1: BigUint = backward.wert(PayloadTag::Y1).unwrap().parse().unwrap();
        backward.setzen(PayloadTag::Y1, (y1 + 2u32).to_string());

        let aktionen = alice
            .verarbeiten(Eingang::BackwardInit(backward), &mut rng)
            .unwrap();
        assert!(aktionen.contains(&Aktion::Etabliert { autorisiert: false }));
        assert_eq!(alice.autorisiert(), Some(false));
    }

    #[test]
    fn fehlender_tag_zerstoert_sitzung() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut alice = KeyAgreementSession::neu("bob");
        let init = alice.initiieren(&konfig(), &mut rng).unwrap();

        let mut unvollstaendig = HandshakePayload::neu();
        for tag in [PayloadTag::P, PayloadTag::G, PayloadTag::B, PayloadTag::Y1, PayloadTag::Y2] {
            unvollstaendig.setzen(tag, init.wert(tag).unwrap());
        }

        let mut bob = KeyAgreementSession::neu("alice");
        let fehler = bob
            .verarbeiten(Eingang::Init(unvollstaendig), &mut rng)
            .unwrap_err();
        assert!(matches!(fehler, CryptoError::Payload(_)));
        assert!(matches!(bob.zustand(), SessionState::Zerstoert));
        assert!(bob.schluessel().is_none());
    }

    #[test]
    fn keine_zahl_im_payload() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut alice = KeyAgreementSession::neu("bob");
        let mut init = alice.initiieren(&konfig(), &mut rng).unwrap();
        init.setzen(PayloadTag::G, "zwei");

        let mut bob = KeyAgreementSession::neu("alice");
        let fehler = bob.verarbeiten(Eingang::Init(init), &mut rng).unwrap_err();
        assert!(matches!(fehler, CryptoError::UngueltigeZahl { tag: "g", .. }));
    }

    #[test]
    fn ungueltiger_uebergang() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut sitzung = KeyAgreementSession::neu("bob");

        let fehler = sitzung
            .verarbeiten(Eingang::SignatureEnding(HandshakePayload::neu()), &mut rng)
            .unwrap_err();
        assert!(matches!(
            fehler,
            CryptoError::UngueltigerUebergang {
                zustand: "Leerlauf",
                stufe: Header::SignatureEnding
            }
        ));
        assert!(matches!(sitzung.zustand(), SessionState::Zerstoert));
    }

    #[test]
    fn doppeltes_initiieren() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sitzung = KeyAgreementSession::neu("bob");
        sitzung.initiieren(&konfig(), &mut rng).unwrap();
        assert!(sitzung.ist_aktiv());
        assert!(matches!(
            sitzung.initiieren(&konfig(), &mut rng),
            Err(CryptoError::UngueltigerUebergang { zustand: "Initiiert", .. })
        ));
    }

    #[test]
    fn destroy_aus_jedem_zustand() {
        let mut rng = StdRng::seed_from_u64(12);
        let (mut alice, mut bob) = vollstaendiger_handshake(&mut rng);

        assert_eq!(
            alice.verarbeiten(Eingang::Destroy, &mut rng).unwrap(),
            vec![Aktion::Zerstoert]
        );
        assert!(!alice.ist_aktiv());
        assert!(alice.schluessel().is_none());
        assert!(matches!(
            alice.verschluesseln(b"zu spaet"),
            Err(CryptoError::KeinSchluessel { .. })
        ));

        bob.verarbeiten(Eingang::Destroy, &mut rng).unwrap();
        let mut leer = KeyAgreementSession::neu("carol");
        leer.verarbeiten(Eingang::Destroy, &mut rng).unwrap();
        assert!(matches!(leer.zustand(), SessionState::Zerstoert));
    }

    #[test]
    fn nachricht_vor_schluessel() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut alice = KeyAgreementSession::neu("bob");
        alice.initiieren(&konfig(), &mut rng).unwrap();

        assert!(matches!(
            alice.entschluesseln(&[0u8; 16]),
            Err(CryptoError::KeinSchluessel { peer }) if peer == "bob"
        ));
    }

    #[test]
    fn init_im_zustand_initiiert_wiederholt_eigenes_init() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut alice = KeyAgreementSession::neu("bob");
        let erstes = alice.initiieren(&konfig(), &mut rng).unwrap();

        let mut bob = KeyAgreementSession::neu("alice");
        let fremdes = bob.initiieren(&konfig(), &mut rng).unwrap();

        let aktionen = alice.verarbeiten(Eingang::Init(fremdes), &mut rng).unwrap();
        let (stufe, wiederholung) = gesendet(&aktionen);
        assert_eq!(stufe, Header::Init);
        for tag in [PayloadTag::P, PayloadTag::G, PayloadTag::B, PayloadTag::VerifWert] {
            assert_eq!(wiederholung.wert(tag).unwrap(), erstes.wert(tag).unwrap());
        }
        assert!(matches!(alice.zustand(), SessionState::Initiiert { .. }));
    }

    #[test]
    fn wiederholtes_init_wird_nicht_erneut_beantwortet() {
        let mut rng = StdRng::seed_from_u64(15);
        let (mut alice, mut bob, backward) = bis_backward_init(&mut rng, |_| {});
        let schluessel_vorher = bob.schluessel().cloned();

        // Wiederholung mit demselben Verifikationswert
        let mut carol = KeyAgreementSession::neu("alice");
        let fremdes = carol.initiieren(&konfig(), &mut rng).unwrap();
        let (_, wiederholung) =
            gesendet(&alice.verarbeiten(Eingang::Init(fremdes), &mut rng).unwrap());

        assert!(bob
            .verarbeiten(Eingang::Init(wiederholung), &mut rng)
            .unwrap()
            .is_empty());
        assert!(matches!(
            bob.zustand(),
            SessionState::WartetAufBestaetigung { .. }
        ));
        assert_eq!(bob.schluessel().cloned(), schluessel_vorher);

        let (_, ending) =
            gesendet(&alice.verarbeiten(Eingang::BackwardInit(backward), &mut rng).unwrap());
        bob.verarbeiten(Eingang::SignatureEnding(ending), &mut rng).unwrap();
        assert!(bob.ist_etabliert());
        assert_eq!(alice.schluessel(), bob.schluessel());
    }

    #[test]
    fn neues_init_ersetzt_etablierte_sitzung() {
        let mut rng = StdRng::seed_from_u64(16);
        let (_alice, mut bob) = vollstaendiger_handshake(&mut rng);

        let mut neu_gestartet = KeyAgreementSession::neu("bob");
        let init = neu_gestartet.initiieren(&konfig(), &mut rng).unwrap();
        let (stufe, _) = gesendet(&bob.verarbeiten(Eingang::Init(init), &mut rng).unwrap());

        assert_eq!(stufe, Header::BackwardInit);
        assert!(matches!(
            bob.zustand(),
            SessionState::WartetAufBestaetigung { .. }
        ));
    }
}
