//! # kryptochat-crypto
//!
//! Ende-zu-Ende-Verschluesselung fuer Kryptochat.
//!
//! ## Module
//! - `aes` - AES-Blockchiffre (128/192/256 Bit) im ECB-Modus mit Auffuellung
//! - `dh` - Diffie-Hellman-Schluesselaustausch
//! - `elgamal` - ElGamal-Signaturen ueber den DH-Parametern
//! - `session` - Handshake-Zustandsmaschine und Sitzungsverwaltung
//! - `types` - Gemeinsame Typen (SecretBytes, CipherKey)
//! - `error` - Fehlertypen

pub mod aes;
pub mod dh;
pub mod elgamal;
pub mod error;
pub mod session;
pub mod types;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};
pub use types::{CipherKey, SecretBytes};

pub use dh::{DhKonfig, DhParameter, DhSchluesselpaar, GemeinsamesGeheimnis};
pub use elgamal::{verifizieren, EinmalExponent, Signatur, SignaturSchluessel};
pub use session::{
    Aktion, Eingang, EntschluesselteNachricht, KeyAgreementSession, SessionEreignis,
    SessionManager, SessionState,
};
