//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use crate::error::{CryptoError, CryptoResult};

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Unterstuetzte AES-Schluessellaengen in Bytes
pub const SCHLUESSEL_LAENGEN: [usize; 3] = [16, 24, 32];

/// Symmetrischer Sitzungsschluessel mit gepruefter Laenge (16, 24 oder 32 Bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherKey(SecretBytes);

impl CipherKey {
    /// Uebernimmt Schluesselbytes, wenn die Laenge einer AES-Variante entspricht
    pub fn neu(bytes: Vec<u8>) -> CryptoResult<Self> {
        pruefe_schluessel_laenge(bytes.len())?;
        Ok(Self(SecretBytes::new(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Anzahl der Verschluesselungsrunden (10, 12 oder 14)
    pub fn runden(&self) -> usize {
        runden_fuer(self.len())
    }
}

/// Rundenanzahl zu einer bereits geprueften Schluessellaenge
pub(crate) fn runden_fuer(schluessel_laenge: usize) -> usize {
    schluessel_laenge / 4 + 6
}

pub(crate) fn pruefe_schluessel_laenge(laenge: usize) -> CryptoResult<()> {
    if SCHLUESSEL_LAENGEN.contains(&laenge) {
        Ok(())
    } else {
        Err(CryptoError::UngueltigeSchluesselLaenge { erhalten: laenge })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_key_runden_je_laenge() {
        assert_eq!(CipherKey::neu(vec![0; 16]).unwrap().runden(), 10);
        assert_eq!(CipherKey::neu(vec![0; 24]).unwrap().runden(), 12);
        assert_eq!(CipherKey::neu(vec![0; 32]).unwrap().runden(), 14);
    }

    #[test]
    fn cipher_key_lehnt_andere_laengen_ab() {
        for laenge in [0, 15, 17, 20, 31, 33, 64] {
            assert!(matches!(
                CipherKey::neu(vec![1; laenge]),
                Err(CryptoError::UngueltigeSchluesselLaenge { erhalten }) if erhalten == laenge
            ));
        }
    }

    #[test]
    fn secret_bytes_debug_zeigt_keinen_inhalt() {
        let geheim = SecretBytes::new(vec![0xAB; 4]);
        let text = format!("{:?}", geheim);
        assert!(text.contains("REDACTED"));
        assert!(!text.contains("171"));
    }
}
