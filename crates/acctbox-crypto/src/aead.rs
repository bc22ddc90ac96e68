//! XChaCha20-Poly1305 secret-box sealing.
//!
//! Every envelope is sealed under a 192-bit (24-byte) nonce drawn from OS
//! entropy. The large nonce space makes random nonces safe for the many
//! envelopes sealed under one per-user key generation.

use acctbox_types::{AcctboxError, Result};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::kdf::SymmetricKey;

// ---------------------------------------------------------------------------
// AeadNonce
// ---------------------------------------------------------------------------

/// 192-bit nonce for XChaCha20-Poly1305.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AeadNonce([u8; 24]);

impl AeadNonce {
    /// Fixed byte length of an XChaCha20-Poly1305 nonce.
    pub const LEN: usize = 24;

    /// Creates an [`AeadNonce`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 24-byte array.
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }
}

/// Generates a fresh nonce from OS entropy.
///
/// # Errors
///
/// Returns [`AcctboxError::CryptoError`] if the entropy source fails.
/// The failure is fatal and must not be retried silently.
pub fn generate_aead_nonce() -> Result<AeadNonce> {
    let mut bytes = [0u8; 24];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AcctboxError::CryptoError {
            reason: format!("failed to generate random nonce: {e}"),
        })?;
    Ok(AeadNonce(bytes))
}

// ---------------------------------------------------------------------------
// Seal / Open
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` under `key` and `nonce`.
///
/// The returned ciphertext carries the 16-byte Poly1305 tag appended.
/// `aad` is authenticated but not encrypted.
///
/// # Errors
///
/// Returns [`AcctboxError::CryptoError`] if the cipher rejects the input.
pub fn seal_xchacha20(
    key: &SymmetricKey,
    nonce: &AeadNonce,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let xnonce = XNonce::from_slice(&nonce.0);
    let payload = Payload { msg: plaintext, aad };

    cipher
        .encrypt(xnonce, payload)
        .map_err(|e| AcctboxError::CryptoError {
            reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
        })
}

/// Decrypts and authenticates `ciphertext`.
///
/// # Errors
///
/// Returns [`AcctboxError::IntegrityError`] on any authentication failure:
/// wrong key, wrong nonce, wrong AAD, or modified ciphertext. No partial
/// plaintext is ever returned.
pub fn open_xchacha20(
    key: &SymmetricKey,
    nonce: &AeadNonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let xnonce = XNonce::from_slice(&nonce.0);
    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(xnonce, payload)
        .map_err(|_| AcctboxError::IntegrityError {
            reason: "secret box open failed".into(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
