//! Ed25519 account keys and their textual encoding.
//!
//! Account ids and signing secrets are exchanged as Bech32 strings with
//! distinct human-readable prefixes, so a secret can never be mistaken
//! for an id (or the reverse) when pasted:
//!
//! - account id: `acct1...` wrapping the 32-byte Ed25519 public key
//! - secret key: `asec1...` wrapping the 32-byte Ed25519 seed
//!
//! The signing key is zeroized on drop via `ed25519-dalek`'s
//! `ZeroizeOnDrop`; decoded seed buffers are wrapped in [`Zeroizing`].

use std::fmt;

use acctbox_types::{AccountId, AcctboxError, Result, SecretKey};
use bech32::{self, FromBase32, ToBase32, Variant};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

/// Human-readable prefix of an encoded account id.
pub const ACCOUNT_ID_HRP: &str = "acct";

/// Human-readable prefix of an encoded secret key.
pub const SECRET_KEY_HRP: &str = "asec";

const KEY_LEN: usize = 32;

// ---------------------------------------------------------------------------
// AccountKeypair
// ---------------------------------------------------------------------------

/// Ed25519 keypair controlling one account.
///
/// Not `Clone`.
pub struct AccountKeypair {
    signing_key: SigningKey,
}

impl AccountKeypair {
    /// Generates a new random keypair from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::CryptoError`] if the entropy source fails.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| AcctboxError::CryptoError {
                reason: format!("failed to generate account key: {e}"),
            })?;
        let keypair = Self::from_seed(&seed);
        seed.zeroize();
        Ok(keypair)
    }

    /// Creates a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; KEY_LEN]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses an encoded secret key.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::ParseError`] if the string is not valid
    /// Bech32, carries the wrong prefix, or does not hold 32 bytes.
    pub fn from_secret(secret: &SecretKey) -> Result<Self> {
        let bytes = decode_bech32(secret.expose(), SECRET_KEY_HRP, "secret key")?;
        let mut seed = [0u8; KEY_LEN];
        seed.copy_from_slice(&bytes);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();
        Ok(keypair)
    }

    /// Returns the raw 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; KEY_LEN] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Returns the encoded account id derived from the public key.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::CryptoError`] if Bech32 encoding fails.
    pub fn account_id(&self) -> Result<AccountId> {
        account_id_from_public(&self.public_key_bytes())
    }

    /// Returns the encoded secret key.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::CryptoError`] if Bech32 encoding fails.
    pub fn secret_key(&self) -> Result<SecretKey> {
        let seed = Zeroizing::new(self.signing_key.to_bytes());
        let encoded = bech32::encode(SECRET_KEY_HRP, seed.as_slice().to_base32(), Variant::Bech32)
            .map_err(|e| AcctboxError::CryptoError {
                reason: format!("bech32 encoding of secret key failed: {e}"),
            })?;
        Ok(SecretKey::new(encoded))
    }
}

impl fmt::Debug for AccountKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKeypair")
            .field("public_key", &self.public_key_bytes())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Parses a secret key and returns the keypair together with the account
/// id it controls.
///
/// # Errors
///
/// Returns [`AcctboxError::ParseError`] for a malformed secret.
pub fn parse_secret_key(secret: &SecretKey) -> Result<(AccountKeypair, AccountId)> {
    let keypair = AccountKeypair::from_secret(secret)?;
    let account_id = keypair.account_id()?;
    Ok((keypair, account_id))
}

/// Validates an encoded account id and returns it in canonical
/// (lower-case) form.
///
/// # Errors
///
/// Returns [`AcctboxError::ParseError`] if the string is not valid
/// Bech32, carries the wrong prefix, or does not hold 32 bytes.
pub fn parse_account_id(encoded: &str) -> Result<AccountId> {
    let bytes = decode_bech32(encoded, ACCOUNT_ID_HRP, "account id")?;
    let mut public = [0u8; KEY_LEN];
    public.copy_from_slice(&bytes);
    account_id_from_public(&public)
}

/// Encodes a raw Ed25519 public key as an account id.
///
/// # Errors
///
/// Returns [`AcctboxError::CryptoError`] if Bech32 encoding fails.
pub fn account_id_from_public(public: &[u8; KEY_LEN]) -> Result<AccountId> {
    bech32::encode(ACCOUNT_ID_HRP, public.to_base32(), Variant::Bech32)
        .map(AccountId::new)
        .map_err(|e| AcctboxError::CryptoError {
            reason: format!("bech32 encoding of account id failed: {e}"),
        })
}

fn decode_bech32(encoded: &str, expected_hrp: &str, what: &str) -> Result<Zeroizing<Vec<u8>>> {
    let (hrp, data, variant) = bech32::decode(encoded).map_err(|e| AcctboxError::ParseError {
        reason: format!("{what}: bech32 decoding failed: {e}"),
    })?;

    if hrp != expected_hrp {
        return Err(AcctboxError::ParseError {
            reason: format!("{what}: expected prefix '{expected_hrp}', got '{hrp}'"),
        });
    }

    if variant != Variant::Bech32 {
        return Err(AcctboxError::ParseError {
            reason: format!("{what}: expected bech32 variant, got bech32m"),
        });
    }

    let bytes = Zeroizing::new(Vec::<u8>::from_base32(&data).map_err(|e| {
        AcctboxError::ParseError {
            reason: format!("{what}: base32 conversion failed: {e}"),
        }
    })?);

    if bytes.len() != KEY_LEN {
        return Err(AcctboxError::ParseError {
            reason: format!("{what}: expected {KEY_LEN} bytes, got {}", bytes.len()),
        });
    }

    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_distinct_keys() -> std::result::Result<(), AcctboxError> {
        let a = AccountKeypair::generate()?;
        let b = AccountKeypair::generate()?;
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
        Ok(())
    }

    #[test]
    fn secret_roundtrip_preserves_account() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::generate()?;
        let secret = kp.secret_key()?;
        assert!(secret.expose().starts_with("asec1"));

        let (parsed, account_id) = parse_secret_key(&secret)?;
        assert_eq!(parsed.public_key_bytes(), kp.public_key_bytes());
        assert_eq!(account_id, kp.account_id()?);
        assert!(account_id.as_str().starts_with("acct1"));
        Ok(())
    }

    #[test]
    fn account_id_is_not_a_secret() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::from_seed(&[0x11; 32]);
        let id = kp.account_id()?;
        let result = AccountKeypair::from_secret(&SecretKey::new(id.as_str()));
        assert!(matches!(result, Err(AcctboxError::ParseError { .. })));
        Ok(())
    }

    #[test]
    fn secret_is_not_an_account_id() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::from_seed(&[0x11; 32]);
        let secret = kp.secret_key()?;
        let result = parse_account_id(secret.expose());
        assert!(matches!(result, Err(AcctboxError::ParseError { .. })));
        Ok(())
    }

    #[test]
    fn parse_account_id_canonicalizes_case() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::from_seed(&[0x22; 32]);
        let id = kp.account_id()?;
        let upper = id.as_str().to_uppercase();
        assert_eq!(parse_account_id(&upper)?, id);
        Ok(())
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            parse_account_id("not-an-account"),
            Err(AcctboxError::ParseError { .. })
        ));
        assert!(matches!(
            AccountKeypair::from_secret(&SecretKey::new("")),
            Err(AcctboxError::ParseError { .. })
        ));
    }

    #[test]
    fn wrong_length_payload_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let short = bech32::encode(ACCOUNT_ID_HRP, [0u8; 16].to_base32(), Variant::Bech32)?;
        assert!(matches!(
            parse_account_id(&short),
            Err(AcctboxError::ParseError { .. })
        ));
        Ok(())
    }

    #[test]
    fn corrupted_checksum_rejected() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::from_seed(&[0x33; 32]);
        let mut id = kp.account_id()?.as_str().to_string();
        let last = if id.ends_with('q') { 'p' } else { 'q' };
        id.pop();
        id.push(last);
        assert!(matches!(
            parse_account_id(&id),
            Err(AcctboxError::ParseError { .. })
        ));
        Ok(())
    }

    #[test]
    fn debug_omits_secret() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::from_seed(&[0x44; 32]);
        let secret = kp.secret_key()?;
        let printed = format!("{kp:?}");
        assert!(!printed.contains(secret.expose()));
        Ok(())
    }
}
