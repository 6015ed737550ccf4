//! ElGamal-Signaturen ueber denselben Parametern wie der Diffie-Hellman-Austausch
//!
//! Signieren von `M` mit privatem Exponenten `t` und Einmal-Exponent `k`
//! (teilerfremd zu `p-1`, Inverses `k'`):
//!
//! ```text
//! y1 = g^k mod p
//! y2 = (M - t*y1) * k' mod (p-1)
//! ```
//!
//! Verifikation mit dem oeffentlichen Wert `b = g^t mod p`:
//! `g^M mod p == b^y1 * y1^y2 mod p`.
//!
//! Ein Einmal-Exponent darf nur fuer genau eine Signatur verwendet werden,
//! sonst laesst sich `t` aus zwei Signaturen berechnen. `EinmalExponent`
//! ist deshalb nicht `Clone` und wird beim Signieren verbraucht.

use num_bigint::{BigUint, ModInverse, ToBigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

use crate::dh::DhParameter;
use crate::error::{CryptoError, CryptoResult};

/// Signatur `(y1, y2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatur {
    pub y1: BigUint,
    pub y2: BigUint,
}

// ---------------------------------------------------------------------------
// EinmalExponent
// ---------------------------------------------------------------------------

/// Einmal-Exponent `k` mit seinem Inversen modulo `p-1`
pub struct EinmalExponent {
    k: BigUint,
    k_invers: BigUint,
}

impl std::fmt::Debug for EinmalExponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EinmalExponent([REDACTED])")
    }
}

impl EinmalExponent {
    /// Zieht `k` aus `[2, p-2]`, bis `gcd(k, p-1) = 1`
    pub fn erzeugen<R: Rng + ?Sized>(parameter: &DhParameter, rng: &mut R) -> CryptoResult<Self> {
        let n = parameter.p_minus_eins();
        loop {
            let k = parameter.zufallsexponent(rng);
            if k.gcd(&n).is_one() {
                return Self::mit_modul(k, &n);
            }
        }
    }

    /// Uebernimmt ein vorgegebenes `k`
    pub fn aus_wert(parameter: &DhParameter, k: BigUint) -> CryptoResult<Self> {
        Self::mit_modul(k, &parameter.p_minus_eins())
    }

    fn mit_modul(k: BigUint, n: &BigUint) -> CryptoResult<Self> {
        if k.is_zero() || !k.gcd(n).is_one() {
            return Err(CryptoError::KeinInverses);
        }
        let k_invers = k
            .clone()
            .mod_inverse(n)
            .and_then(|inv| inv.to_biguint())
            .ok_or(CryptoError::KeinInverses)?;
        Ok(Self { k, k_invers })
    }

    /// `k'` mit `k * k' = 1 mod (p-1)`
    pub fn invers(&self) -> &BigUint {
        &self.k_invers
    }
}

// ---------------------------------------------------------------------------
// SignaturSchluessel
// ---------------------------------------------------------------------------

/// ElGamal-Signaturidentitaet, gueltig fuer genau ein `DhParameter`
pub struct SignaturSchluessel {
    parameter: DhParameter,
    privat: BigUint,
    verifikationswert: BigUint,
}

impl std::fmt::Debug for SignaturSchluessel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignaturSchluessel")
            .field("parameter", &self.parameter)
            .field("privat", &"[REDACTED]")
            .field("verifikationswert", &self.verifikationswert)
            .finish()
    }
}

impl SignaturSchluessel {
    /// Erzeugt einen zufaelligen privaten Exponenten in `[2, p-2]`
    pub fn erzeugen<R: Rng + ?Sized>(parameter: DhParameter, rng: &mut R) -> Self {
        let privat = parameter.zufallsexponent(rng);
        Self::aus_privatwert(parameter, privat)
    }

    pub fn aus_privatwert(parameter: DhParameter, privat: BigUint) -> Self {
        let verifikationswert = parameter.potenz(&privat);
        Self {
            parameter,
            privat,
            verifikationswert,
        }
    }

    pub fn parameter(&self) -> &DhParameter {
        &self.parameter
    }

    /// Oeffentlicher Verifikationswert `b = g^t mod p`
    pub fn verifikationswert(&self) -> &BigUint {
        &self.verifikationswert
    }

    /// Signiert `nachricht` mit einem frisch gezogenen Einmal-Exponenten
    pub fn signieren<R: Rng + ?Sized>(
        &self,
        nachricht: &BigUint,
        rng: &mut R,
    ) -> CryptoResult<Signatur> {
        let einmal = EinmalExponent::erzeugen(&self.parameter, rng)?;
        Ok(self.signieren_mit(nachricht, einmal))
    }

    /// Signiert `nachricht` mit einem vorgegebenen Einmal-Exponenten
    pub fn signieren_mit(&self, nachricht: &BigUint, einmal: EinmalExponent) -> Signatur {
        let n = self.parameter.p_minus_eins();
        let y1 = self.parameter.potenz(&einmal.k);

        // (M - t*y1) mod n ohne negative Zwischenwerte
        let m = nachricht % &n;
        let ty1 = (&self.privat * &y1) % &n;
        let differenz = (m + &n - ty1) % &n;
        let y2 = (differenz * &einmal.k_invers) % &n;

        Signatur { y1, y2 }
    }
}

/// Prueft `signatur` ueber `nachricht` gegen den Verifikationswert `b`
pub fn verifizieren(
    parameter: &DhParameter,
    nachricht: &BigUint,
    signatur: &Signatur,
    verifikationswert: &BigUint,
) -> bool {
    let p = parameter.p();
    let links = parameter.potenz(nachricht);
    let rechts = (verifikationswert.modpow(&signatur.y1, p) * signatur.y1.modpow(&signatur.y2, p))
        % p;
    links == rechts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
