//! AES-128/192/256 im ECB-Modus
//!
//! Jeder 16-Byte-Block wird unabhaengig verschluesselt. Gleiche
//! Klartextbloecke ergeben unter demselben Schluessel gleiche Chiffratbloecke.
//!
//! ## Auffuellen
//!
//! Ein unvollstaendiger letzter Block wird mit `n` Bytes des Werts `n`
//! aufgefuellt (`n = 16 - laenge`). Ein exakt 16 Byte langer letzter Block
//! bleibt unveraendert. Ein leerer Klartext wird zu einem vollen Block aus
//! `0x10`.
//!
//! Beim Entschluesseln gilt das letzte Byte `n` als Kandidat: liegt es in
//! `1..=16` und sind die letzten `n` Bytes alle gleich `n`, werden sie
//! entfernt, sonst bleibt die Ausgabe unveraendert. Das ist eine Heuristik
//! ohne Laengenfeld: ein Klartext mit voller Blocklaenge, der zufaellig auf
//! ein gueltiges Fuellmuster endet (z.B. `..., 0x01`), wird beim
//! Entschluesseln gekuerzt.

mod block;
mod schluesselplan;
mod tabellen;

pub use block::{AesBlockCipher, Block};
pub use schluesselplan::Schluesselplan;

use crate::error::{CryptoError, CryptoResult};

/// Blockgroesse in Bytes
pub const BLOCK_GROESSE: usize = 16;

/// Verschluesselt `klartext` blockweise mit `schluessel` (16, 24 oder 32 Bytes)
pub fn verschluesseln(klartext: &[u8], schluessel: &[u8]) -> CryptoResult<Vec<u8>> {
    let chiffre = AesBlockCipher::neu(schluessel)?;

    let (volle, rest) = if !klartext.is_empty() && klartext.len() % BLOCK_GROESSE == 0 {
        klartext.split_at(klartext.len() - BLOCK_GROESSE)
    } else {
        klartext.split_at(klartext.len() - klartext.len() % BLOCK_GROESSE)
    };

    let mut ausgabe = Vec::with_capacity(volle.len() + BLOCK_GROESSE);
    for stueck in volle.chunks_exact(BLOCK_GROESSE) {
        let mut block: Block = [0u8; BLOCK_GROESSE];
        block.copy_from_slice(stueck);
        chiffre.block_verschluesseln(&mut block);
        ausgabe.extend_from_slice(&block);
    }

    let mut letzter = auffuellen(rest)?;
    chiffre.block_verschluesseln(&mut letzter);
    ausgabe.extend_from_slice(&letzter);

    Ok(ausgabe)
}

/// Entschluesselt `chiffrat` und entfernt ein erkanntes Fuellmuster
///
/// Ein unvollstaendiger Restblock am Ende wird ignoriert.
pub fn entschluesseln(chiffrat: &[u8], schluessel: &[u8]) -> CryptoResult<Vec<u8>> {
    let chiffre = AesBlockCipher::neu(schluessel)?;

    let rest = chiffrat.len() % BLOCK_GROESSE;
    if rest != 0 {
        tracing::warn!(
            laenge = chiffrat.len(),
            ignoriert = rest,
            "Chiffrat ist kein Vielfaches der Blockgroesse"
        );
    }

    let mut ausgabe = Vec::with_capacity(chiffrat.len() - rest);
    for stueck in chiffrat.chunks_exact(BLOCK_GROESSE) {
        let mut block: Block = [0u8; BLOCK_GROESSE];
        block.copy_from_slice(stueck);
        chiffre.block_entschluesseln(&mut block);
        ausgabe.extend_from_slice(&block);
    }

    let laenge = ausgabe.len() - fuellung_erkennen(&ausgabe);
    ausgabe.truncate(laenge);
    Ok(ausgabe)
}

/// Fuellt den letzten Rohblock auf volle Blockgroesse auf
fn auffuellen(letzter: &[u8]) -> CryptoResult<Block> {
    if letzter.len() > BLOCK_GROESSE {
        return Err(CryptoError::UeberlangerBlock {
            laenge: letzter.len(),
        });
    }

    let fuell_laenge = BLOCK_GROESSE - letzter.len();
    let mut block = [fuell_laenge as u8; BLOCK_GROESSE];
    block[..letzter.len()].copy_from_slice(letzter);
    Ok(block)
}

/// Anzahl der als Fuellung erkannten Bytes am Ende (0 wenn keine)
fn fuellung_erkennen(daten: &[u8]) -> usize {
    let Some(&letztes) = daten.last() else {
        return 0;
    };
    let n = letztes as usize;
    if n == 0 || n > BLOCK_GROESSE || n > daten.len() {
        return 0;
    }
    if daten[daten.len() - n..].iter().all(|&b| b == letztes) {
        n
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
