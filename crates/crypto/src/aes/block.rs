//! Einzelblock-Transformationen
//!
//! Der Zustand ist ein 16-Byte-Block in Spaltenreihenfolge:
//! `zustand[4 * spalte + zeile]`.

use super::schluesselplan::Schluesselplan;
use super::tabellen::{INV_SBOX, SBOX};
use super::BLOCK_GROESSE;
use crate::error::CryptoResult;

pub type Block = [u8; BLOCK_GROESSE];

/// AES-Blockchiffre fuer einen festen Schluessel
#[derive(Debug, Clone)]
pub struct AesBlockCipher {
    plan: Schluesselplan,
}

impl AesBlockCipher {
    pub fn neu(schluessel: &[u8]) -> CryptoResult<Self> {
        Ok(Self {
            plan: Schluesselplan::ableiten(schluessel)?,
        })
    }

    pub fn runden(&self) -> usize {
        self.plan.runden()
    }

    pub fn block_verschluesseln(&self, block: &mut Block) {
        let runden = self.plan.runden();

        add_round_key(block, self.plan.rundenschluessel(0));
        for runde in 1..runden {
            sub_bytes(block);
            shift_rows(block);
            mix_columns(block);
            add_round_key(block, self.plan.rundenschluessel(runde));
        }
        sub_bytes(block);
        shift_rows(block);
        add_round_key(block, self.plan.rundenschluessel(runden));
    }

    pub fn block_entschluesseln(&self, block: &mut Block) {
        let runden = self.plan.runden();

        add_round_key(block, self.plan.rundenschluessel(runden));
        for runde in (1..runden).rev() {
            inv_shift_rows(block);
            inv_sub_bytes(block);
            add_round_key(block, self.plan.rundenschluessel(runde));
            inv_mix_columns(block);
        }
        inv_shift_rows(block);
        inv_sub_bytes(block);
        add_round_key(block, self.plan.rundenschluessel(0));
    }
}

/// Multiplikation in GF(2^8) modulo x^8 + x^4 + x^3 + x + 1
pub(crate) fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut produkt = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            produkt ^= a;
        }
        let hoechstes_bit = a & 0x80;
        a <<= 1;
        if hoechstes_bit != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    produkt
}

fn add_round_key(zustand: &mut Block, schluessel: &Block) {
    zustand
        .iter_mut()
        .zip(schluessel)
        .for_each(|(z, k)| *z ^= k);
}

fn sub_bytes(zustand: &mut Block) {
    zustand.iter_mut().for_each(|b| *b = SBOX[*b as usize]);
}

fn inv_sub_bytes(zustand: &mut Block) {
    zustand.iter_mut().for_each(|b| *b = INV_SBOX[*b as usize]);
}

/// Zeile `r` rotiert um `r` Positionen nach links
fn shift_rows(zustand: &mut Block) {
    let alt = *zustand;
    for spalte in 0..4 {
        for zeile in 1..4 {
            zustand[4 * spalte + zeile] = alt[4 * ((spalte + zeile) % 4) + zeile];
        }
    }
}

fn inv_shift_rows(zustand: &mut Block) {
    let alt = *zustand;
    for spalte in 0..4 {
        for zeile in 1..4 {
            zustand[4 * ((spalte + zeile) % 4) + zeile] = alt[4 * spalte + zeile];
        }
    }
}

fn spalten_mischen(zustand: &mut Block, koeffizienten: [u8; 4]) {
    for spalte in zustand.chunks_exact_mut(4) {
        let alt = [spalte[0], spalte[1], spalte[2], spalte[3]];
        for (zeile, ziel) in spalte.iter_mut().enumerate() {
            *ziel = (0..4).fold(0, |acc, k| {
                acc ^ gf_mul(koeffizienten[(4 + k - zeile) % 4], alt[k])
            });
        }
    }
}

fn mix_columns(zustand: &mut Block) {
    spalten_mischen(zustand, [0x02, 0x03, 0x01, 0x01]);
}

fn inv_mix_columns(zustand: &mut Block) {
    spalten_mischen(zustand, [0x0e, 0x0b, 0x0d, 0x09]);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> Block {
        hex::decode(text).unwrap().try_into().unwrap()
    }

    #[test]
    fn gf_mul_beispiele() {
        // FIPS-197, Abschnitt 4.2
        assert_eq!(gf_mul(0x57, 0x83), 0xc1);
        assert_eq!(gf_mul(0x57, 0x13), 0xfe);
        assert_eq!(gf_mul(0x57, 0x02), 0xae);
        assert_eq!(gf_mul(0x01, 0xff), 0xff);
        assert_eq!(gf_mul(0x00, 0x1b), 0x00);
    }

    #[test]
    fn mix_columns_bekannte_spalte() {
        let mut zustand = block("db135345f20a225c01010101c6c6c6c6");
        mix_columns(&mut zustand);
        assert_eq!(hex::encode(zustand), "8e4da1bc9fdc589d01010101c6c6c6c6");
        inv_mix_columns(&mut zustand);
        assert_eq!(hex::encode(zustand), "db135345f20a225c01010101c6c6c6c6");
    }

    #[test]
    fn shift_rows_verschiebt_zeilen() {
        let mut zustand: Block = std::array::from_fn(|i| i as u8);
        shift_rows(&mut zustand);
        assert_eq!(
            zustand,
            [0, 5, 10, 15, 4, 9, 14, 3, 8, 13, 2, 7, 12, 1, 6, 11]
        );
        inv_shift_rows(&mut zustand);
        assert_eq!(zustand, std::array::from_fn(|i| i as u8));
    }

    #[test]
    fn fips_197_anhang_c() {
        let klartext = block("00112233445566778899aabbccddeeff");
        let faelle = [
            (
                "000102030405060708090a0b0c0d0e0f",
                "69c4e0d86a7b0430d8cdb78070b4c55a",
            ),
            (
                "000102030405060708090a0b0c0d0e0f1011121314151617",
                "dda97ca4864cdfe06eaf70a0ec0d7191",
            ),
            (
                "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
                "8ea2b7ca516745bfeafc49904b496089",
            ),
        ];

        for (schluessel, erwartet) in faelle {
            let chiffre = AesBlockCipher::neu(&hex::decode(schluessel).unwrap()).unwrap();
            let mut zustand = klartext;
            chiffre.block_verschluesseln(&mut zustand);
            assert_eq!(hex::encode(zustand), erwartet);
            chiffre.block_entschluesseln(&mut zustand);
            assert_eq!(zustand, klartext);
        }
    }
}
