//! Fehlertypen des Clients

use kryptochat_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Verbindung zum Relay fehlgeschlagen: {0}")]
    Verbindung(#[from] std::io::Error),

    #[error("Ungueltiger Teilnehmername: '{0}'")]
    UngueltigerName(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Client ist nicht mehr verbunden")]
    Getrennt,
}

pub type ClientResult<T> = Result<T, ClientError>;
