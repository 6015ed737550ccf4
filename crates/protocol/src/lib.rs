//! kryptochat-protocol – Nachrichtenformat zwischen Client und Relay
//!
//! Der Relay-Server transportiert ausschliesslich `DataPackage`s. Die
//! Handshake-Nutzdaten (`<p><..><g><..>...`) und die Mitgliederliste
//! (`<clients><a><b>...`) sind flache Textformate, die hier gebaut und
//! geparst werden. Die Zahlenwerte selbst interpretiert erst das
//! Krypto-Crate.

pub mod error;
pub mod header;
pub mod package;
pub mod payload;
pub mod wire;

pub use error::{ProtocolError, ProtocolResult};
pub use header::Header;
pub use package::{DataPackage, SERVER_ABSENDER};
pub use payload::{
    mitgliederliste_bauen, mitgliederliste_parsen, name_gueltig, HandshakePayload, PayloadTag,
};
pub use wire::FrameCodec;
