//! Sealing and opening of envelopes under the per-user key.
//!
//! The secret-box key is derived from the key source's seed for the
//! envelope's generation with the account-bundle domain label. The
//! envelope's version and key generation are authenticated as AAD, so a
//! server cannot relabel a sealed payload without detection.

use acctbox_crypto::aead::{generate_aead_nonce, open_xchacha20, seal_xchacha20, AeadNonce};
use acctbox_crypto::kdf::derive_bundle_key;
use acctbox_types::{KeyGeneration, Result};
use zeroize::Zeroizing;

use crate::codec::Envelope;
use crate::key_source::KeySource;
use crate::version::EnvelopeKind;

/// Builds the AAD for an envelope: version ∥ generation, both u32 LE.
fn envelope_aad(version: u32, generation: KeyGeneration) -> [u8; 8] {
    let mut aad = [0u8; 8];
    aad[..4].copy_from_slice(&version.to_le_bytes());
    aad[4..].copy_from_slice(&generation.value().to_le_bytes());
    aad
}

/// Seals `plaintext` into a new envelope of the given kind.
///
/// # Errors
///
/// - [`AcctboxError::KeyNotFound`](acctbox_types::AcctboxError::KeyNotFound)
///   if the key source lacks `generation`.
/// - [`AcctboxError::CryptoError`](acctbox_types::AcctboxError::CryptoError)
///   if nonce generation or encryption fails.
pub fn seal<K: KeySource + ?Sized>(
    plaintext: &[u8],
    key_source: &K,
    generation: KeyGeneration,
    kind: EnvelopeKind,
) -> Result<Envelope> {
    let seed = key_source.seed_for(generation)?;
    let key = derive_bundle_key(&seed)?;
    let nonce = generate_aead_nonce()?;
    let version = kind.version();

    let ciphertext = seal_xchacha20(&key, &nonce, plaintext, &envelope_aad(version, generation))?;

    tracing::debug!(
        entity = kind.entity(),
        version,
        key_generation = generation.value(),
        ciphertext_len = ciphertext.len(),
        "sealed envelope"
    );

    Ok(Envelope {
        version,
        ciphertext,
        nonce: *nonce.as_bytes(),
        key_generation: generation,
    })
}

/// Opens an envelope of the given kind and returns its plaintext.
///
/// The envelope version is checked before any key is fetched.
///
/// # Errors
///
/// - [`AcctboxError::VersionError`](acctbox_types::AcctboxError::VersionError)
///   for a version other than `kind`'s.
/// - [`AcctboxError::KeyNotFound`](acctbox_types::AcctboxError::KeyNotFound)
///   if the key source lacks the envelope's generation.
/// - [`AcctboxError::IntegrityError`](acctbox_types::AcctboxError::IntegrityError)
///   on any authentication failure.
pub fn open<K: KeySource + ?Sized>(
    envelope: &Envelope,
    kind: EnvelopeKind,
    key_source: &K,
) -> Result<Zeroizing<Vec<u8>>> {
    kind.check(envelope.version)?;

    let seed = key_source.seed_for(envelope.key_generation)?;
    let key = derive_bundle_key(&seed)?;
    let nonce = AeadNonce::from_bytes(envelope.nonce);
    let aad = envelope_aad(envelope.version, envelope.key_generation);

    let plaintext = open_xchacha20(&key, &nonce, &envelope.ciphertext, &aad)?;

    tracing::debug!(
        entity = kind.entity(),
        key_generation = envelope.key_generation.value(),
        "opened envelope"
    );

    Ok(Zeroizing::new(plaintext))
}
