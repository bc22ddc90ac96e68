//! HKDF-SHA256 derivation of secret-box keys from per-user key seeds.
//!
//! A [`KeySeed`] is the raw per-user, per-generation secret handed out by
//! the key source. It is never used as a cipher key directly: every use
//! runs through HKDF with a domain-separation label, so the same seed
//! yields unrelated keys for unrelated features.
//!
//! All key material is zeroized on drop.

use std::fmt;

use acctbox_types::{AcctboxError, Result};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum HKDF output length in bytes.
const MAX_OUTPUT_LEN: usize = 64;

/// Extract salt shared by every acctbox derivation.
const HKDF_SALT: &[u8] = b"acctbox-key-derivation-v1";

/// Domain-separation label for account bundle secret boxes.
pub const ACCOUNT_BUNDLE_LABEL: &[u8] = b"Derived-User-NaCl-SecretBox-AccountBundle-1";

// ---------------------------------------------------------------------------
// KeySeed / SymmetricKey
// ---------------------------------------------------------------------------

/// 32-byte per-user key seed for one key generation.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeySeed([u8; 32]);

impl KeySeed {
    /// Wraps raw seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Draws a fresh seed from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::CryptoError`] if the entropy source fails.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AcctboxError::CryptoError {
                reason: format!("failed to generate key seed: {e}"),
            })?;
        let seed = Self(bytes);
        bytes.zeroize();
        Ok(seed)
    }

    /// Returns the raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for KeySeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeySeed(<redacted>)")
    }
}

/// 256-bit XChaCha20-Poly1305 key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; 32]);

impl SymmetricKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// No Clone or Debug on SymmetricKey.

// ---------------------------------------------------------------------------
// HkdfOutput
// ---------------------------------------------------------------------------

/// Variable-length key material derived by HKDF-SHA256.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HkdfOutput {
    bytes: Vec<u8>,
}

impl HkdfOutput {
    /// Returns the derived key material.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the length of the derived key material.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the output is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derives `output_len` bytes from `ikm` using HKDF-SHA256 (RFC 5869).
///
/// An empty `salt` selects the RFC default (a zero-filled salt).
///
/// # Errors
///
/// Returns [`AcctboxError::CryptoError`] if `output_len` is 0 or greater
/// than 64, or if expansion fails.
pub fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8], output_len: usize) -> Result<HkdfOutput> {
    if output_len == 0 || output_len > MAX_OUTPUT_LEN {
        return Err(AcctboxError::CryptoError {
            reason: format!("HKDF output length must be 1..={MAX_OUTPUT_LEN}, got {output_len}"),
        });
    }

    let salt_opt: Option<&[u8]> = if salt.is_empty() { None } else { Some(salt) };
    let hk = Hkdf::<Sha256>::new(salt_opt, ikm);

    let mut okm = vec![0u8; output_len];
    hk.expand(info, &mut okm).map_err(|e| AcctboxError::CryptoError {
        reason: format!("HKDF-SHA256 expansion failed: {e}"),
    })?;

    Ok(HkdfOutput { bytes: okm })
}

/// Derives a secret-box key from `seed` under the domain label `label`.
///
/// # Errors
///
/// Returns [`AcctboxError::CryptoError`] if `label` is empty or HKDF
/// expansion fails.
pub fn derive_symmetric_key(seed: &KeySeed, label: &[u8]) -> Result<SymmetricKey> {
    if label.is_empty() {
        return Err(AcctboxError::CryptoError {
            reason: "key derivation label must not be empty".into(),
        });
    }

    let okm = hkdf_sha256(seed.as_bytes(), HKDF_SALT, label, 32)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(okm.as_bytes());
    Ok(SymmetricKey(key))
}

/// Derives the key that seals account bundle envelopes.
pub fn derive_bundle_key(seed: &KeySeed) -> Result<SymmetricKey> {
    derive_symmetric_key(seed, ACCOUNT_BUNDLE_LABEL)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() -> std::result::Result<(), AcctboxError> {
        let seed = KeySeed::from_bytes([0x42; 32]);
        let k1 = derive_bundle_key(&seed)?;
        let k2 = derive_bundle_key(&seed)?;
        assert_eq!(k1.as_bytes(), k2.as_bytes());
        Ok(())
    }

    #[test]
    fn derived_key_differs_from_seed() -> std::result::Result<(), AcctboxError> {
        let seed = KeySeed::from_bytes([0x42; 32]);
        let key = derive_bundle_key(&seed)?;
        assert_ne!(key.as_bytes(), seed.as_bytes());
        Ok(())
    }

    #[test]
    fn labels_separate_domains() -> std::result::Result<(), AcctboxError> {
        let seed = KeySeed::from_bytes([0x42; 32]);
        let bundle = derive_bundle_key(&seed)?;
        let other = derive_symmetric_key(&seed, b"Derived-User-NaCl-SecretBox-Chat-1")?;
        assert_ne!(bundle.as_bytes(), other.as_bytes());
        Ok(())
    }

    #[test]
    fn seeds_separate_generations() -> std::result::Result<(), AcctboxError> {
        let g1 = derive_bundle_key(&KeySeed::from_bytes([0x01; 32]))?;
        let g2 = derive_bundle_key(&KeySeed::from_bytes([0x02; 32]))?;
        assert_ne!(g1.as_bytes(), g2.as_bytes());
        Ok(())
    }

    #[test]
    fn generated_seeds_differ() -> std::result::Result<(), AcctboxError> {
        let a = KeySeed::generate()?;
        let b = KeySeed::generate()?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn empty_label_rejected() {
        let seed = KeySeed::from_bytes([0x42; 32]);
        let result = derive_symmetric_key(&seed, b"");
        assert!(matches!(result, Err(AcctboxError::CryptoError { .. })));
    }

    #[test]
    fn output_len_bounds() {
        assert!(hkdf_sha256(&[0x01; 32], b"salt", b"info", 0).is_err());
        assert!(hkdf_sha256(&[0x01; 32], b"salt", b"info", 65).is_err());
        assert!(hkdf_sha256(&[0x01; 32], b"", b"info", 64).is_ok());
    }

    #[test]
    fn seed_debug_is_redacted() {
        let seed = KeySeed::from_bytes([0xAB; 32]);
        assert_eq!(format!("{seed:?}"), "KeySeed(<redacted>)");
    }
}
