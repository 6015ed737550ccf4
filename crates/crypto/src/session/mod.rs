//! Schluesselvereinbarung zwischen zwei Teilnehmern
//!
//! - `sitzung` - Zustandsmaschine fuer genau einen Peer
//! - `manager` - Sitzungen eines Teilnehmers, eine pro Peer

mod manager;
mod sitzung;

pub use manager::{SessionEreignis, SessionManager};
pub use sitzung::{Aktion, Eingang, EntschluesselteNachricht, KeyAgreementSession, SessionState};
