//! Canonical binary encoding and base64 wire framing.
//!
//! Every structure that is hashed or sealed is serialized with one fixed
//! bincode configuration (little-endian, fixed-width integers, trailing
//! bytes rejected), so re-serializing a decoded value reproduces the
//! exact bytes that were hashed.
//!
//! # Envelope layout
//!
//! ```text
//! Field           Encoding
//! --------------  -------------------------------
//! version         u32 LE
//! ciphertext      u64 LE length + bytes (tag included)
//! nonce           24 raw bytes
//! key_generation  u32 LE
//! ```
//!
//! The envelope bytes are base64 (standard alphabet, padded) on the wire.
//! The SHA-256 of the envelope bytes is the record's `own_hash`.

use acctbox_crypto::hash::sha256;
use acctbox_types::{AcctboxError, Hash, KeyGeneration, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Opaque encrypted record as stored by the server.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope format version (see [`crate::version::EnvelopeKind`]).
    pub version: u32,
    /// XChaCha20-Poly1305 ciphertext with the tag appended.
    pub ciphertext: Vec<u8>,
    /// Nonce used for this sealing. Fresh per encryption.
    pub nonce: [u8; 24],
    /// Generation of the per-user key that sealed the payload.
    pub key_generation: KeyGeneration,
}

impl Envelope {
    /// Serializes the envelope and returns the bytes with their base64
    /// form.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::EncodingError`] if serialization fails.
    pub fn encode(&self) -> Result<(Vec<u8>, String)> {
        let bytes = to_canonical(self, "envelope")?;
        let b64 = STANDARD.encode(&bytes);
        Ok((bytes, b64))
    }

    /// Parses a base64 envelope and returns it with the SHA-256 of its
    /// bytes.
    ///
    /// `max_len` bounds the base64 input before anything is decoded.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::EncodingError`] for oversized input,
    /// invalid base64, or malformed envelope bytes.
    pub fn decode(encoded: &str, max_len: usize) -> Result<(Self, Hash)> {
        let bytes = decode_b64(encoded, max_len, "envelope")?;
        let own_hash = sha256(&bytes);
        let envelope = from_canonical(&bytes, "envelope")?;
        Ok((envelope, own_hash))
    }
}

// ---------------------------------------------------------------------------
// Canonical serialization
// ---------------------------------------------------------------------------

fn canonical() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

/// Serializes `value` with the canonical configuration.
///
/// # Errors
///
/// Returns [`AcctboxError::EncodingError`] if serialization fails.
pub fn to_canonical<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<Vec<u8>> {
    canonical()
        .serialize(value)
        .map_err(|e| AcctboxError::EncodingError {
            reason: format!("failed to serialize {what}: {e}"),
        })
}

/// Deserializes canonical bytes, rejecting trailing data.
///
/// # Errors
///
/// Returns [`AcctboxError::EncodingError`] if the bytes are malformed.
pub fn from_canonical<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    canonical()
        .deserialize(bytes)
        .map_err(|e| AcctboxError::EncodingError {
            reason: format!("failed to deserialize {what}: {e}"),
        })
}

/// Reads the leading `u32` version tag of a versioned payload without
/// decoding the body.
///
/// # Errors
///
/// Returns [`AcctboxError::EncodingError`] if fewer than four bytes are
/// present.
pub fn peek_version(bytes: &[u8]) -> Result<u32> {
    canonical()
        .allow_trailing_bytes()
        .deserialize::<u32>(bytes)
        .map_err(|e| AcctboxError::EncodingError {
            reason: format!("failed to read version tag: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Base64 framing
// ---------------------------------------------------------------------------

/// Encodes bytes as standard padded base64.
pub fn encode_b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard padded base64 after checking its length.
///
/// # Errors
///
/// Returns [`AcctboxError::EncodingError`] if `encoded` is longer than
/// `max_len` or is not valid base64.
pub fn decode_b64(encoded: &str, max_len: usize, what: &str) -> Result<Vec<u8>> {
    if encoded.len() > max_len {
        return Err(AcctboxError::EncodingError {
            reason: format!("{what}: base64 length {} exceeds limit {max_len}", encoded.len()),
        });
    }

    STANDARD
        .decode(encoded)
        .map_err(|e| AcctboxError::EncodingError {
            reason: format!("{what}: invalid base64: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
