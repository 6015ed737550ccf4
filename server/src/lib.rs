//! kryptochat-server – Bibliotheks-Root
//!
//! Das Relay nimmt TCP-Verbindungen an, meldet Teilnehmer unter ihrem Namen
//! an und reicht Pakete an den Empfaenger weiter. Inhalte bleiben fuer das
//! Relay undurchsichtig.

pub mod config;
pub mod connection;
pub mod relay;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;

use config::ServerConfig;
use connection::RelayVerbindung;
use relay::RelayZustand;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    zustand: Arc<RelayZustand>,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        let zustand = Arc::new(RelayZustand::neu(
            config.server.max_clients,
            config.relay.sende_warteschlange,
        ));
        Self { config, zustand }
    }

    /// Gemeinsamer Relay-Zustand (z.B. fuer Tests)
    pub fn zustand(&self) -> Arc<RelayZustand> {
        Arc::clone(&self.zustand)
    }

    /// Bindet die konfigurierte Adresse und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.bind_adresse();
        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Bind auf {adresse} fehlgeschlagen"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        });

        self.starten_mit_listener(listener, shutdown_rx).await?;
        Ok(())
    }

    /// Accept-Loop auf einem bereits gebundenen Listener
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten_mit_listener(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %listener.local_addr()?,
            max_clients = self.config.server.max_clients,
            "Relay gestartet"
        );

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            if self.zustand.anzahl() >= self.config.server.max_clients {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.config.server.max_clients,
                                    "Relay voll – Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }

                            let verbindung = RelayVerbindung::neu(
                                Arc::clone(&self.zustand),
                                self.config.relay.clone(),
                                peer_addr,
                            );
                            let shutdown_rx_clone = shutdown_rx.clone();
                            tokio::spawn(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Relay gestoppt");
        Ok(())
    }
}
