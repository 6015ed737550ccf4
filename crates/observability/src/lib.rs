//! # kryptochat-observability
//!
//! Gemeinsames Logging-Setup fuer Relay und Client:
//! - Structured Logging via tracing-subscriber (Text oder JSON)
//! - Filter aus `RUST_LOG` oder der Konfiguration

pub mod logging;

pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren, LogFormat};
