//! Relay-Register – Send-Queues aller angemeldeten Clients
//!
//! Das Relay kennt nur Namen und Queues. Handshake-Werte und Chiffrate
//! werden unveraendert an den Empfaenger im `to`-Feld weitergereicht.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;

use kryptochat_protocol::{name_gueltig, DataPackage};

/// Gruende, aus denen eine Anmeldung abgelehnt wird
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnmeldeFehler {
    #[error("Ungueltiger Name: '{0}'")]
    UngueltigerName(String),

    #[error("Name bereits vergeben: '{0}'")]
    NameVergeben(String),

    #[error("Relay voll ({max} Clients)")]
    Voll { max: usize },
}

/// Gemeinsamer Zustand aller Verbindungen
///
/// Thread-safe via DashMap; wird als `Arc<RelayZustand>` geteilt.
pub struct RelayZustand {
    clients: DashMap<String, mpsc::Sender<DataPackage>>,
    max_clients: usize,
    queue_groesse: usize,
}

impl RelayZustand {
    pub fn neu(max_clients: usize, queue_groesse: usize) -> Self {
        Self {
            clients: DashMap::new(),
            max_clients,
            queue_groesse,
        }
    }

    /// Meldet `name` an und gibt die Empfangs-Queue der Verbindung zurueck
    pub fn registrieren(&self, name: &str) -> Result<mpsc::Receiver<DataPackage>, AnmeldeFehler> {
        if !name_gueltig(name) {
            return Err(AnmeldeFehler::UngueltigerName(name.to_string()));
        }
        if self.clients.len() >= self.max_clients {
            return Err(AnmeldeFehler::Voll {
                max: self.max_clients,
            });
        }

        match self.clients.entry(name.to_string()) {
            Entry::Occupied(_) => Err(AnmeldeFehler::NameVergeben(name.to_string())),
            Entry::Vacant(platz) => {
                let (tx, rx) = mpsc::channel(self.queue_groesse);
                platz.insert(tx);
                tracing::debug!(name, "Client im Relay registriert");
                Ok(rx)
            }
        }
    }

    pub fn entfernen(&self, name: &str) {
        if self.clients.remove(name).is_some() {
            tracing::debug!(name, "Client aus Relay entfernt");
        }
    }

    pub fn ist_registriert(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    pub fn anzahl(&self) -> usize {
        self.clients.len()
    }

    /// Angemeldete Namen, alphabetisch sortiert
    pub fn mitglieder(&self) -> Vec<String> {
        let mut namen: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        namen.sort();
        namen
    }

    /// Reiht `paket` nicht-blockierend beim Empfaenger ein
    ///
    /// Gibt `false` zurueck wenn der Empfaenger fehlt, unbekannt ist oder
    /// seine Queue voll ist; das Paket ist dann verworfen.
    pub fn weiterleiten(&self, paket: DataPackage) -> bool {
        let Some(ziel) = paket.to.clone() else {
            tracing::warn!(from = %paket.from, header = %paket.header, "Paket ohne Empfaenger verworfen");
            return false;
        };

        let Some(sender) = self.clients.get(&ziel).map(|e| e.value().clone()) else {
            tracing::warn!(from = %paket.from, to = %ziel, "Unbekannter Empfaenger, Paket verworfen");
            return false;
        };

        match sender.try_send(paket) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(p)) => {
                tracing::warn!(from = %p.from, to = %ziel, "Send-Queue voll – Paket verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(to = %ziel, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use kryptochat_protocol::Header;

    fn zustand() -> RelayZustand {
        RelayZustand::neu(8, 4)
    }

    #[tokio::test]
    async fn registrieren_und_weiterleiten() {
        let relay = zustand();
        let _rx_alice = relay.registrieren("alice").unwrap();
        let mut rx_bob = relay.registrieren("bob").unwrap();
        assert!(relay.ist_registriert("bob"));

        let paket = DataPackage::nachricht("alice", "bob", vec![1, 2, 3]);
        assert!(relay.weiterleiten(paket.clone()));

        let empfangen = rx_bob.try_recv().expect("Paket muss vorhanden sein");
        assert_eq!(empfangen, paket);
    }

    #[test]
    fn doppelter_name_wird_abgelehnt() {
        let relay = zustand();
        let _rx = relay.registrieren("alice").unwrap();
        assert_eq!(
            relay.registrieren("alice").unwrap_err(),
            AnmeldeFehler::NameVergeben("alice".into())
        );
        assert_eq!(relay.anzahl(), 1);
    }

    #[test]
    fn ungueltige_namen() {
        let relay = zustand();
        for name in ["", "SERVER", "a b", "<x>"] {
            assert!(
                matches!(relay.registrieren(name), Err(AnmeldeFehler::UngueltigerName(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn relay_voll() {
        let relay = RelayZustand::neu(2, 4);
        let _a = relay.registrieren("a").unwrap();
        let _b = relay.registrieren("b").unwrap();
        assert_eq!(
            relay.registrieren("c").unwrap_err(),
            AnmeldeFehler::Voll { max: 2 }
        );

        relay.entfernen("a");
        assert!(relay.registrieren("c").is_ok());
    }

    #[test]
    fn unbekannter_oder_fehlender_empfaenger() {
        let relay = zustand();
        let _rx = relay.registrieren("alice").unwrap();

        assert!(!relay.weiterleiten(DataPackage::zerstoeren("alice", "niemand")));
        assert!(!relay.weiterleiten(DataPackage::id_senden("alice")));
    }

    #[test]
    fn volle_queue_verwirft() {
        let relay = RelayZustand::neu(8, 1);
        let mut rx = relay.registrieren("bob").unwrap();

        assert!(relay.weiterleiten(DataPackage::zerstoeren("alice", "bob")));
        assert!(!relay.weiterleiten(DataPackage::zerstoeren("alice", "bob")));

        assert_eq!(rx.try_recv().unwrap().header, Header::Destroy);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn geschlossene_queue() {
        let relay = zustand();
        let rx = relay.registrieren("bob").unwrap();
        drop(rx);
        assert!(!relay.weiterleiten(DataPackage::zerstoeren("alice", "bob")));
    }

    #[test]
    fn mitglieder_sortiert() {
        let relay = zustand();
        let _c = relay.registrieren("carol").unwrap();
        let _a = relay.registrieren("alice").unwrap();
        let _b = relay.registrieren("bob").unwrap();
        assert_eq!(relay.mitglieder(), vec!["alice", "bob", "carol"]);

        relay.entfernen("bob");
        relay.entfernen("bob");
        assert_eq!(relay.mitglieder(), vec!["alice", "carol"]);
    }
}
