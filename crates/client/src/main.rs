//! Kryptochat Client – Einstiegspunkt
//!
//! Liest Befehle von stdin und gibt Ereignisse auf stdout aus:
//!
//! ```text
//! /start <peer>        Handshake starten
//! /msg <peer> <text>   Nachricht senden
//! /ende <peer>         Gespraech beenden
//! /quit                Alle Gespraeche beenden und trennen
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use kryptochat_client::{ChatClient, ClientEreignis, ClientHandle, ClientKonfig};
use kryptochat_crypto::DhKonfig;
use kryptochat_observability::logging_initialisieren;

#[derive(Parser, Debug)]
#[command(name = "kryptochat-client", version, about = "Ende-zu-Ende-verschluesselter Chat ueber ein Relay")]
struct Args {
    /// Adresse des Relays (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6664", env = "KRYPTOCHAT_SERVER")]
    server: String,

    /// Eigener Teilnehmername
    #[arg(short, long, env = "KRYPTOCHAT_NAME")]
    name: String,

    /// Bitbreite der DH-Primzahl (128, 192 oder 256)
    #[arg(long, default_value_t = 256, env = "KRYPTOCHAT_PRIME_BITS")]
    prime_bits: usize,

    /// Log-Level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "KRYPTOCHAT_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging_initialisieren(&args.log_level, "text");

    let konfig = ClientKonfig {
        server_adresse: args.server,
        name: args.name,
        dh: DhKonfig::neu(args.prime_bits)?,
    };
    let (handle, mut ereignisse) = ChatClient::verbinden(konfig)
        .await
        .context("Verbindung fehlgeschlagen")?;
    println!("Angemeldet als '{}'", handle.name());

    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    let mut eingabe_aktiv = true;
    loop {
        tokio::select! {
            zeile = zeilen.next_line(), if eingabe_aktiv => {
                let weiter = match zeile? {
                    Some(zeile) => befehl_ausfuehren(&handle, zeile.trim()).await?,
                    None => false,
                };
                if !weiter {
                    // Danach nur noch auf `Getrennt` warten
                    eingabe_aktiv = false;
                    handle.trennen().await?;
                }
            }
            ereignis = ereignisse.recv() => {
                match ereignis {
                    Some(ClientEreignis::Getrennt) | None => break,
                    Some(ereignis) => ereignis_ausgeben(&ereignis),
                }
            }
        }
    }

    println!("Getrennt");
    Ok(())
}

/// Gibt `false` zurueck, wenn der Benutzer beenden will
async fn befehl_ausfuehren(handle: &ClientHandle, zeile: &str) -> Result<bool> {
    let mut teile = zeile.splitn(3, ' ');
    match (teile.next(), teile.next(), teile.next()) {
        (Some("/start"), Some(peer), None) => handle.gespraech_starten(peer).await?,
        (Some("/msg"), Some(peer), Some(text)) => handle.nachricht_senden(peer, text).await?,
        (Some("/ende"), Some(peer), None) => handle.gespraech_beenden(peer).await?,
        (Some("/quit"), None, None) => return Ok(false),
        (None, ..) | (Some(""), ..) => {}
        _ => println!("Befehle: /start <peer>, /msg <peer> <text>, /ende <peer>, /quit"),
    }
    Ok(true)
}

fn ereignis_ausgeben(ereignis: &ClientEreignis) {
    match ereignis {
        ClientEreignis::Mitglieder(namen) => println!("Online: {}", namen.join(", ")),
        ClientEreignis::Etabliert { peer, autorisiert } => {
            println!("Sitzung mit {peer} etabliert");
            if !autorisiert {
                println!("WARNUNG: Signatur von {peer} ungueltig, Gespraech moeglicherweise manipuliert");
            }
        }
        ClientEreignis::Nachricht {
            peer,
            text,
            autorisiert,
        } => {
            if *autorisiert {
                println!("<{peer}> {text}");
            } else {
                println!("<{peer}> (nicht autorisiert, moeglicherweise manipuliert) {text}");
            }
        }
        ClientEreignis::Beendet { peer } => println!("Gespraech mit {peer} beendet"),
        ClientEreignis::Fehler { peer, grund } => println!("Fehler ({peer}): {grund}"),
        ClientEreignis::Getrennt => println!("Getrennt"),
    }
}
