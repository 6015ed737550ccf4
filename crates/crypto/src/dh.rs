//! Diffie-Hellman ueber Restklassen modulo einer Primzahl
//!
//! Beide Seiten potenzieren den oeffentlichen Wert der Gegenseite mit ihrem
//! privaten Exponenten und erhalten denselben Wert `g^(ab) mod p`. Dessen
//! Big-Endian-Darstellung in der Bytebreite von `p` wird zum AES-Schluessel,
//! deshalb muss `p` 128, 192 oder 256 Bit breit sein.

use num_bigint::{BigUint, RandBigInt, RandPrime};
use num_traits::One;
use rand::Rng;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{pruefe_schluessel_laenge, CipherKey};

/// Erlaubte Primzahlbreiten (ergeben AES-128/192/256)
pub const PRIMZAHL_BITS: [usize; 3] = [128, 192, 256];

/// Parameter fuer die Erzeugung neuer DH-Parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhKonfig {
    /// Bitbreite der Primzahl `p`
    pub primzahl_bits: usize,
}

impl Default for DhKonfig {
    fn default() -> Self {
        Self { primzahl_bits: 256 }
    }
}

impl DhKonfig {
    pub fn neu(primzahl_bits: usize) -> CryptoResult<Self> {
        let konfig = Self { primzahl_bits };
        konfig.validieren()?;
        Ok(konfig)
    }

    pub fn validieren(&self) -> CryptoResult<()> {
        if PRIMZAHL_BITS.contains(&self.primzahl_bits) {
            Ok(())
        } else {
            Err(CryptoError::UngueltigeParameter(format!(
                "Primzahlbreite {} Bit nicht unterstuetzt (128, 192 oder 256)",
                self.primzahl_bits
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// DhParameter
// ---------------------------------------------------------------------------

/// Oeffentliche Parameter: Primzahl-Modulus `p` und Generator `g`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhParameter {
    p: BigUint,
    g: BigUint,
}

impl DhParameter {
    /// Erzeugt eine frische Primzahl und einen zufaelligen Generator in `[2, p-2]`
    pub fn generieren<R: Rng + ?Sized>(konfig: &DhKonfig, rng: &mut R) -> CryptoResult<Self> {
        konfig.validieren()?;
        let p = rng.gen_prime(konfig.primzahl_bits);
        let g = rng.gen_biguint_range(&BigUint::from(2u32), &(&p - 1u32));
        tracing::debug!(bits = konfig.primzahl_bits, "DH-Parameter erzeugt");
        Ok(Self { p, g })
    }

    /// Uebernimmt vorgegebene Parameter (z.B. die des Initiators)
    ///
    /// Geprueft wird nur `p > 3` und `g mod p` nicht 0 oder 1; die
    /// Primalitaet von `p` prueft niemand.
    pub fn neu(p: BigUint, g: BigUint) -> CryptoResult<Self> {
        if p <= BigUint::from(3u32) {
            return Err(CryptoError::UngueltigeParameter(format!(
                "Modulus {p} zu klein"
            )));
        }
        if &g % &p <= BigUint::one() {
            return Err(CryptoError::UngueltigeParameter(format!(
                "Generator {g} ist modulo {p} trivial"
            )));
        }
        Ok(Self { p, g })
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// `p - 1`, die Ordnung der multiplikativen Gruppe
    pub fn p_minus_eins(&self) -> BigUint {
        &self.p - 1u32
    }

    /// Bytebreite von `p` und damit Laenge des abgeleiteten Schluessels
    pub fn schluessel_laenge(&self) -> usize {
        (self.p.bits() as usize).div_ceil(8)
    }

    /// `g^exponent mod p`
    pub fn potenz(&self, exponent: &BigUint) -> BigUint {
        self.g.modpow(exponent, &self.p)
    }

    /// Zufallszahl in `[2, p-2]`
    pub(crate) fn zufallsexponent<R: Rng + ?Sized>(&self, rng: &mut R) -> BigUint {
        rng.gen_biguint_range(&BigUint::from(2u32), &self.p_minus_eins())
    }
}

// ---------------------------------------------------------------------------
// DhSchluesselpaar
// ---------------------------------------------------------------------------

/// Lokales Schluesselmaterial einer Seite
pub struct DhSchluesselpaar {
    parameter: DhParameter,
    privat: BigUint,
    oeffentlich: BigUint,
    peer_wert: Option<BigUint>,
}

impl std::fmt::Debug for DhSchluesselpaar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhSchluesselpaar")
            .field("parameter", &self.parameter)
            .field("privat", &"[REDACTED]")
            .field("oeffentlich", &self.oeffentlich)
            .field("peer_wert", &self.peer_wert)
            .finish()
    }
}

impl DhSchluesselpaar {
    /// Waehlt einen privaten Exponenten gleichverteilt in `[2, p-2]`
    pub fn zufaellig<R: Rng + ?Sized>(parameter: DhParameter, rng: &mut R) -> Self {
        let privat = parameter.zufallsexponent(rng);
        Self::aus_privatwert(parameter, privat)
    }

    /// Baut das Schluesselpaar aus einem vorgegebenen privaten Exponenten
    pub fn aus_privatwert(parameter: DhParameter, privat: BigUint) -> Self {
        let oeffentlich = parameter.potenz(&privat);
        Self {
            parameter,
            privat,
            oeffentlich,
            peer_wert: None,
        }
    }

    pub fn parameter(&self) -> &DhParameter {
        &self.parameter
    }

    /// Eigener oeffentlicher Wert `g^a mod p`
    pub fn oeffentlich(&self) -> &BigUint {
        &self.oeffentlich
    }

    pub fn peer_wert(&self) -> Option<&BigUint> {
        self.peer_wert.as_ref()
    }

    /// Speichert den oeffentlichen Wert der Gegenseite (muss in `[1, p-1]` liegen)
    pub fn peer_wert_annehmen(&mut self, wert: BigUint) -> CryptoResult<()> {
        if wert == BigUint::default() || wert >= self.parameter.p {
            return Err(CryptoError::UngueltigeParameter(format!(
                "Oeffentlicher Wert {wert} liegt nicht in [1, p-1]"
            )));
        }
        self.peer_wert = Some(wert);
        Ok(())
    }

    /// `peer_wert^a mod p`
    pub fn gemeinsamer_wert(&self) -> CryptoResult<BigUint> {
        let peer = self.peer_wert.as_ref().ok_or_else(|| {
            CryptoError::UngueltigeParameter("Oeffentlicher Wert der Gegenseite fehlt".into())
        })?;
        Ok(peer.modpow(&self.privat, &self.parameter.p))
    }

    /// Leitet das gemeinsame Geheimnis und den AES-Schluessel ab
    pub fn gemeinsames_geheimnis_ableiten(&self) -> CryptoResult<GemeinsamesGeheimnis> {
        let breite = self.parameter.schluessel_laenge();
        pruefe_schluessel_laenge(breite)?;

        let wert = self.gemeinsamer_wert()?;
        let bytes = wert.to_bytes_be();
        let mut schluessel = vec![0u8; breite - bytes.len()];
        schluessel.extend_from_slice(&bytes);

        Ok(GemeinsamesGeheimnis {
            wert,
            schluessel: CipherKey::neu(schluessel)?,
        })
    }
}

/// Ergebnis des Austauschs
#[derive(Debug, Clone)]
pub struct GemeinsamesGeheimnis {
    pub wert: BigUint,
    pub schluessel: CipherKey,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zahl(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn bekannte_austauschwerte() {
        // (p, g, a, b) => (A, B, gemeinsamer Wert)
        let faelle: [(u64, u64, u64, u64, u64, u64, u64); 5] = [
            (23, 5, 6, 15, 8, 19, 2),
            (353, 3, 97, 233, 40, 248, 160),
            (265339, 9242968, 53516, 46844, 35113, 123415, 13749),
            (53, 17, 5, 7, 40, 6, 38),
            (123, 999, 74, 28, 33, 105, 57),
        ];

        for (p, g, a, b, erwartet_a, erwartet_b, erwartet_s) in faelle {
            let parameter = DhParameter::neu(zahl(p), zahl(g)).unwrap();
            let mut alice = DhSchluesselpaar::aus_privatwert(parameter.clone(), zahl(a));
            let mut bob = DhSchluesselpaar::aus_privatwert(parameter, zahl(b));

            assert_eq!(alice.oeffentlich(), &zahl(erwartet_a), "p = {p}");
            assert_eq!(bob.oeffentlich(), &zahl(erwartet_b), "p = {p}");

            alice.peer_wert_annehmen(bob.oeffentlich().clone()).unwrap();
            bob.peer_wert_annehmen(alice.oeffentlich().clone()).unwrap();

            assert_eq!(alice.gemeinsamer_wert().unwrap(), zahl(erwartet_s));
            assert_eq!(bob.gemeinsamer_wert().unwrap(), zahl(erwartet_s));
        }
    }

    #[test]
    fn generierte_parameter_ergeben_gleichen_schluessel() {
        let mut rng = StdRng::seed_from_u64(7);
        for bits in PRIMZAHL_BITS {
            let parameter = DhParameter::generieren(&DhKonfig::neu(bits).unwrap(), &mut rng).unwrap();
            assert_eq!(parameter.p().bits() as usize, bits);
            assert_eq!(parameter.schluessel_laenge(), bits / 8);

            let mut alice = DhSchluesselpaar::zufaellig(parameter.clone(), &mut rng);
            let mut bob = DhSchluesselpaar::zufaellig(parameter, &mut rng);
            alice.peer_wert_annehmen(bob.oeffentlich().clone()).unwrap();
            bob.peer_wert_annehmen(alice.oeffentlich().clone()).unwrap();

            let s_alice = alice.gemeinsames_geheimnis_ableiten().unwrap();
            let s_bob = bob.gemeinsames_geheimnis_ableiten().unwrap();
            assert_eq!(s_alice.wert, s_bob.wert);
            assert_eq!(s_alice.schluessel, s_bob.schluessel);
            assert_eq!(s_alice.schluessel.len(), bits / 8);
        }
    }

    #[test]
    fn kleiner_modulus_ergibt_konfigurationsfehler() {
        let parameter = DhParameter::neu(zahl(23), zahl(5)).unwrap();
        let mut alice = DhSchluesselpaar::aus_privatwert(parameter, zahl(6));
        alice.peer_wert_annehmen(zahl(19)).unwrap();
        assert!(matches!(
            alice.gemeinsames_geheimnis_ableiten(),
            Err(CryptoError::UngueltigeSchluesselLaenge { erhalten: 1 })
        ));
    }

    #[test]
    fn schluessel_wird_links_mit_nullen_aufgefuellt() {
        // Modulus mit 128 Bit, Geheimnis 1 => 15 fuehrende Nullbytes
        let p = (zahl(1) << 127usize) + zahl(45);
        let parameter = DhParameter::neu(p, zahl(3)).unwrap();
        let mut paar = DhSchluesselpaar::aus_privatwert(parameter, zahl(5));
        paar.peer_wert_annehmen(zahl(1)).unwrap();

        let geheimnis = paar.gemeinsames_geheimnis_ableiten().unwrap();
        let mut erwartet = vec![0u8; 16];
        erwartet[15] = 1;
        assert_eq!(geheimnis.schluessel.as_bytes(), &erwartet[..]);
    }

    #[test]
    fn peer_wert_ausserhalb_des_bereichs() {
        let parameter = DhParameter::neu(zahl(23), zahl(5)).unwrap();
        let mut paar = DhSchluesselpaar::aus_privatwert(parameter, zahl(6));
        assert!(paar.peer_wert_annehmen(zahl(0)).is_err());
        assert!(paar.peer_wert_annehmen(zahl(23)).is_err());
        assert!(paar.gemeinsamer_wert().is_err());
    }

    #[test]
    fn triviale_parameter_werden_abgelehnt() {
        assert!(DhParameter::neu(zahl(3), zahl(2)).is_err());
        assert!(DhParameter::neu(zahl(23), zahl(1)).is_err());
        assert!(DhParameter::neu(zahl(23), zahl(24)).is_err());
        assert!(DhParameter::neu(zahl(23), zahl(46)).is_err());
        assert!(DhKonfig::neu(100).is_err());
    }

    #[test]
    fn debug_verbirgt_privaten_exponenten() {
        let parameter = DhParameter::neu(zahl(23), zahl(5)).unwrap();
        let paar = DhSchluesselpaar::aus_privatwert(parameter, zahl(17));
        let text = format!("{:?}", paar);
        assert!(text.contains("REDACTED"));
        assert!(!text.contains("17"));
    }
}
