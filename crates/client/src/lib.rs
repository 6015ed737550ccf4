//! # kryptochat-client
//!
//! Verbindet sich mit dem Relay, meldet sich unter einem Namen an und fuehrt
//! pro Gespraechspartner eine verschluesselte Sitzung.
//!
//! Die Empfangsschleife besitzt den `SessionManager` exklusiv und
//! verarbeitet ein Paket nach dem anderen. Anwendungen steuern den Client
//! ueber `ClientHandle` und lesen `ClientEreignis`-Werte aus einer Queue.

pub mod client;
pub mod error;

pub use client::{ChatClient, ClientEreignis, ClientHandle, ClientKonfig};
pub use error::{ClientError, ClientResult};
