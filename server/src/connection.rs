//! Relay-Verbindung – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede Verbindung laeuft in einem eigenen tokio-Task:
//!
//! ```text
//! Verbunden --ID_SENDING--> Angemeldet --EOF/Fehler/Shutdown--> Getrennt
//! ```
//!
//! Nach der Anmeldung werden eingehende Pakete an ihren Empfaenger
//! weitergereicht und in festen Abstaenden die Mitgliederliste gesendet.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::codec::Framed;

use kryptochat_protocol::{DataPackage, FrameCodec, Header};

use crate::config::RelayEinstellungen;
use crate::relay::RelayZustand;

type Verbindung = Framed<TcpStream, FrameCodec>;

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct RelayVerbindung {
    zustand: Arc<RelayZustand>,
    einstellungen: RelayEinstellungen,
    peer_addr: SocketAddr,
}

impl RelayVerbindung {
    pub fn neu(
        zustand: Arc<RelayZustand>,
        einstellungen: RelayEinstellungen,
        peer_addr: SocketAddr,
    ) -> Self {
        Self {
            zustand,
            einstellungen,
            peer_addr,
        }
    }

    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal eingeht
    pub async fn verarbeiten(self, stream: TcpStream, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(
            stream,
            FrameCodec::with_max_size(self.einstellungen.max_frame_groesse),
        );

        let Some((name, mut sende_rx)) = self.anmelden(&mut framed, &mut shutdown_rx).await else {
            tracing::info!(peer = %peer_addr, "Verbindung ohne Anmeldung beendet");
            return;
        };

        let mut intervall = tokio::time::interval(self.einstellungen.mitgliederliste_intervall());
        intervall.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Eingehendes Paket vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(mut paket)) => {
                            if paket.header.ist_relay_intern() {
                                tracing::debug!(
                                    name = %name,
                                    header = %paket.header,
                                    "Relay-internes Paket vom Client ignoriert"
                                );
                                continue;
                            }
                            // Absender kommt immer aus der Anmeldung
                            paket.from = name.clone();
                            tracing::trace!(
                                from = %name,
                                to = ?paket.to,
                                header = %paket.header,
                                "Paket empfangen"
                            );
                            self.zustand.weiterleiten(paket);
                        }
                        Some(Err(e)) => {
                            tracing::warn!(name = %name, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(name = %name, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Weitergeleitetes Paket eines anderen Clients
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(name = %name, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Mitgliederliste
                _ = intervall.tick() => {
                    let liste = DataPackage::mitgliederliste(&self.zustand.mitglieder());
                    if let Err(e) = framed.send(liste).await {
                        tracing::warn!(name = %name, fehler = %e, "Mitgliederliste nicht gesendet");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(name = %name, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        self.zustand.entfernen(&name);
        tracing::info!(name = %name, peer = %peer_addr, "Verbindungs-Task beendet");
    }

    /// Wartet auf `ID_SENDING` und registriert den Namen
    async fn anmelden(
        &self,
        framed: &mut Verbindung,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Option<(String, mpsc::Receiver<DataPackage>)> {
        let erstes = tokio::select! {
            frame = framed.next() => frame,
            Ok(()) = shutdown_rx.changed() => return None,
        };

        let paket = match erstes {
            Some(Ok(paket)) => paket,
            Some(Err(e)) => {
                tracing::warn!(peer = %self.peer_addr, fehler = %e, "Frame-Lesefehler vor Anmeldung");
                return None;
            }
            None => return None,
        };

        if paket.header != Header::IdSending {
            tracing::warn!(
                peer = %self.peer_addr,
                header = %paket.header,
                "Erstes Paket ist keine Anmeldung"
            );
            return None;
        }

        match self.zustand.registrieren(&paket.from) {
            Ok(rx) => {
                tracing::info!(peer = %self.peer_addr, name = %paket.from, "Client angemeldet");
                Some((paket.from, rx))
            }
            Err(e) => {
                tracing::warn!(peer = %self.peer_addr, fehler = %e, "Anmeldung abgelehnt");
                None
            }
        }
    }
}
