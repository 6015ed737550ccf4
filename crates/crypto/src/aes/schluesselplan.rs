//! Schluesselexpansion
//!
//! Erzeugt aus einem 16-, 24- oder 32-Byte-Schluessel (Nk = 4, 6, 8 Woerter)
//! `runden + 1` Rundenschluessel zu je 16 Bytes. Die Blockgroesse ist fest
//! auf vier Woerter gesetzt.

use super::tabellen::{RCON, SBOX};
use super::BLOCK_GROESSE;
use crate::error::CryptoResult;
use crate::types::{pruefe_schluessel_laenge, runden_fuer};

/// Woerter pro Block
const NB: usize = BLOCK_GROESSE / 4;

type Wort = [u8; 4];

/// Rundenschluessel einer Chiffrier-Operation
#[derive(Clone)]
pub struct Schluesselplan {
    rundenschluessel: Vec<[u8; BLOCK_GROESSE]>,
}

impl Schluesselplan {
    /// Expandiert den Schluessel; andere Laengen als 16/24/32 werden abgelehnt
    pub fn ableiten(schluessel: &[u8]) -> CryptoResult<Self> {
        pruefe_schluessel_laenge(schluessel.len())?;

        let nk = schluessel.len() / 4;
        let runden = runden_fuer(schluessel.len());
        let anzahl_woerter = NB * (runden + 1);

        let mut woerter: Vec<Wort> = schluessel
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();

        for i in nk..anzahl_woerter {
            let mut temp = woerter[i - 1];
            if i % nk == 0 {
                temp = sub_word(rot_word(temp));
                temp[0] ^= RCON[i / nk];
            } else if nk > 6 && i % nk == 4 {
                temp = sub_word(temp);
            }
            let vorher = woerter[i - nk];
            woerter.push(std::array::from_fn(|j| vorher[j] ^ temp[j]));
        }

        let rundenschluessel = woerter
            .chunks_exact(NB)
            .map(|gruppe| {
                let mut block = [0u8; BLOCK_GROESSE];
                for (spalte, wort) in gruppe.iter().enumerate() {
                    block[spalte * 4..spalte * 4 + 4].copy_from_slice(wort);
                }
                block
            })
            .collect();

        Ok(Self { rundenschluessel })
    }

    /// Anzahl der Runden (ohne die initiale Schluesseladdition)
    pub fn runden(&self) -> usize {
        self.rundenschluessel.len() - 1
    }

    /// Rundenschluessel `runde` (0 bis einschliesslich `runden()`)
    pub fn rundenschluessel(&self, runde: usize) -> &[u8; BLOCK_GROESSE] {
        &self.rundenschluessel[runde]
    }
}

impl std::fmt::Debug for Schluesselplan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schluesselplan([REDACTED] {} Runden)", self.runden())
    }
}

impl Drop for Schluesselplan {
    fn drop(&mut self) {
        self.rundenschluessel
            .iter_mut()
            .for_each(|block| block.iter_mut().for_each(|b| *b = 0));
    }
}

fn rot_word(w: Wort) -> Wort {
    [w[1], w[2], w[3], w[0]]
}

fn sub_word(w: Wort) -> Wort {
    w.map(|b| SBOX[b as usize])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
