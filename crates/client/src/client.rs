//! Verbindung zum Relay und Empfangsschleife
//!
//! `ChatClient::verbinden` meldet sich an und startet einen Task, der
//! Pakete vom Relay und Befehle vom `ClientHandle` abwechselnd verarbeitet.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use kryptochat_crypto::{CryptoResult, DhKonfig, SessionEreignis, SessionManager};
use kryptochat_protocol::{mitgliederliste_parsen, name_gueltig, DataPackage, FrameCodec, Header};

use crate::error::{ClientError, ClientResult};

/// Groesse der Befehls- und Ereignis-Queues
const QUEUE_GROESSE: usize = 64;

/// Verbindungsparameter
#[derive(Debug, Clone)]
pub struct ClientKonfig {
    /// `host:port` des Relays
    pub server_adresse: String,
    /// Eigener Teilnehmername
    pub name: String,
    /// Parameter fuer selbst initiierte Handshakes
    pub dh: DhKonfig,
}

/// Ereignisse fuer die Anwendung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEreignis {
    /// Andere angemeldete Teilnehmer (ohne den eigenen Namen)
    Mitglieder(Vec<String>),
    Etabliert { peer: String, autorisiert: bool },
    Nachricht {
        peer: String,
        text: String,
        /// `false` heisst: Handshake-Signatur ungueltig, Manipulation moeglich
        autorisiert: bool,
    },
    Beendet { peer: String },
    Fehler { peer: String, grund: String },
    /// Verbindung zum Relay beendet
    Getrennt,
}

#[derive(Debug)]
enum Befehl {
    Starten(String),
    Senden { peer: String, text: String },
    Beenden(String),
    Trennen,
}

/// Steuert einen verbundenen Client
#[derive(Debug, Clone)]
pub struct ClientHandle {
    name: String,
    befehle: mpsc::Sender<Befehl>,
}

impl ClientHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Startet einen Handshake mit `peer`
    pub async fn gespraech_starten(&self, peer: &str) -> ClientResult<()> {
        self.befehl(Befehl::Starten(peer.to_string())).await
    }

    pub async fn nachricht_senden(&self, peer: &str, text: &str) -> ClientResult<()> {
        self.befehl(Befehl::Senden {
            peer: peer.to_string(),
            text: text.to_string(),
        })
        .await
    }

    pub async fn gespraech_beenden(&self, peer: &str) -> ClientResult<()> {
        self.befehl(Befehl::Beenden(peer.to_string())).await
    }

    /// Beendet alle Gespraeche und trennt die Verbindung
    pub async fn trennen(&self) -> ClientResult<()> {
        self.befehl(Befehl::Trennen).await
    }

    async fn befehl(&self, befehl: Befehl) -> ClientResult<()> {
        self.befehle
            .send(befehl)
            .await
            .map_err(|_| ClientError::Getrennt)
    }
}

pub struct ChatClient;

impl ChatClient {
    /// Verbindet sich mit dem Relay und meldet `konfig.name` an
    pub async fn verbinden(
        konfig: ClientKonfig,
    ) -> ClientResult<(ClientHandle, mpsc::Receiver<ClientEreignis>)> {
        if !name_gueltig(&konfig.name) {
            return Err(ClientError::UngueltigerName(konfig.name));
        }
        konfig.dh.validieren()?;

        let stream = TcpStream::connect(&konfig.server_adresse).await?;
        let mut framed = Framed::new(stream, FrameCodec::new());
        framed.send(DataPackage::id_senden(&konfig.name)).await?;
        tracing::info!(name = %konfig.name, server = %konfig.server_adresse, "Mit Relay verbunden");

        let (befehl_tx, befehl_rx) = mpsc::channel(QUEUE_GROESSE);
        let (ereignis_tx, ereignis_rx) = mpsc::channel(QUEUE_GROESSE);

        let schleife = Empfangsschleife {
            framed,
            sitzungen: SessionManager::neu(konfig.name.clone(), konfig.dh),
            ereignisse: ereignis_tx,
        };
        tokio::spawn(schleife.laufen(befehl_rx));

        Ok((
            ClientHandle {
                name: konfig.name,
                befehle: befehl_tx,
            },
            ereignis_rx,
        ))
    }
}

/// Besitzt Verbindung und Sitzungen; laeuft in einem eigenen Task
struct Empfangsschleife {
    framed: Framed<TcpStream, FrameCodec>,
    sitzungen: SessionManager,
    ereignisse: mpsc::Sender<ClientEreignis>,
}

impl Empfangsschleife {
    async fn laufen(mut self, mut befehle: mpsc::Receiver<Befehl>) {
        loop {
            tokio::select! {
                frame = self.framed.next() => {
                    match frame {
                        Some(Ok(paket)) => {
                            if self.paket_verarbeiten(paket).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!("Relay hat die Verbindung geschlossen");
                            break;
                        }
                    }
                }

                befehl = befehle.recv() => {
                    let ergebnis = match befehl {
                        Some(Befehl::Starten(peer)) => {
                            let paket = self.sitzungen.gespraech_starten(&peer);
                            self.ergebnis_senden(peer, paket).await
                        }
                        Some(Befehl::Senden { peer, text }) => {
                            let paket = self.sitzungen.nachricht_senden(&peer, &text);
                            self.ergebnis_senden(peer, paket).await
                        }
                        Some(Befehl::Beenden(peer)) => self.beenden(peer).await,
                        Some(Befehl::Trennen) | None => {
                            self.alle_beenden().await;
                            break;
                        }
                    };
                    if ergebnis.is_err() {
                        break;
                    }
                }
            }
        }

        // Handle-Aufrufe schlagen ab jetzt mit `Getrennt` fehl
        drop(befehle);
        self.melden(ClientEreignis::Getrennt).await;
        tracing::info!(name = %self.sitzungen.eigener_name(), "Client getrennt");
    }

    /// Fehler bedeutet: Verbindung zum Relay ist unbrauchbar
    async fn paket_verarbeiten(&mut self, paket: DataPackage) -> std::io::Result<()> {
        if paket.header == Header::ClientsList {
            let text = paket.administration_msg.as_deref().unwrap_or_default();
            match mitgliederliste_parsen(text) {
                Ok(mut namen) => {
                    namen.retain(|n| n != self.sitzungen.eigener_name());
                    self.melden(ClientEreignis::Mitglieder(namen)).await;
                }
                Err(e) => tracing::warn!(fehler = %e, "Mitgliederliste nicht lesbar"),
            }
            return Ok(());
        }

        let peer = paket.from.clone();
        match self.sitzungen.paket_verarbeiten(paket) {
            Ok(ereignisse) => self.ereignisse_umsetzen(ereignisse).await,
            Err(e) => {
                tracing::warn!(peer = %peer, fehler = %e, "Paket nicht verarbeitet");
                self.melden(ClientEreignis::Fehler {
                    peer,
                    grund: e.to_string(),
                })
                .await;
                Ok(())
            }
        }
    }

    async fn beenden(&mut self, peer: String) -> std::io::Result<()> {
        let Some(paket) = self.sitzungen.gespraech_beenden(&peer) else {
            return Ok(());
        };
        self.framed.send(paket).await?;
        self.melden(ClientEreignis::Beendet { peer }).await;
        Ok(())
    }

    /// Sendet das Paket eines Befehls oder meldet dessen Fehler
    async fn ergebnis_senden(
        &mut self,
        peer: String,
        ergebnis: CryptoResult<DataPackage>,
    ) -> std::io::Result<()> {
        match ergebnis {
            Ok(paket) => self.framed.send(paket).await,
            Err(e) => {
                self.melden(ClientEreignis::Fehler {
                    peer,
                    grund: e.to_string(),
                })
                .await;
                Ok(())
            }
        }
    }

    async fn ereignisse_umsetzen(&mut self, ereignisse: Vec<SessionEreignis>) -> std::io::Result<()> {
        for ereignis in ereignisse {
            match ereignis {
                SessionEreignis::Senden(paket) => self.framed.send(paket).await?,
                SessionEreignis::Etabliert { peer, autorisiert } => {
                    self.melden(ClientEreignis::Etabliert { peer, autorisiert })
                        .await
                }
                SessionEreignis::Nachricht {
                    peer,
                    klartext,
                    autorisiert,
                } => {
                    let text = String::from_utf8_lossy(&klartext).into_owned();
                    self.melden(ClientEreignis::Nachricht {
                        peer,
                        text,
                        autorisiert,
                    })
                    .await
                }
                SessionEreignis::Beendet { peer } => {
                    self.melden(ClientEreignis::Beendet { peer }).await
                }
            }
        }
        Ok(())
    }

    /// Sendet DESTROY an alle Peers mit Sitzung
    async fn alle_beenden(&mut self) {
        for peer in self.sitzungen.peers() {
            if let Some(paket) = self.sitzungen.gespraech_beenden(&peer) {
                if let Err(e) = self.framed.send(paket).await {
                    tracing::debug!(peer = %peer, fehler = %e, "DESTROY nicht gesendet");
                    return;
                }
            }
        }
    }

    async fn melden(&self, ereignis: ClientEreignis) {
        // Anwendung hoert nicht mehr zu: Ereignis verwerfen
        let _ = self.ereignisse.send(ereignis).await;
    }
}
