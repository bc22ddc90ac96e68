//! Core shared types for the acctbox account bundle protocol.
//!
//! This crate defines the identifiers, counters, and the central error
//! type used across the workspace. It performs no cryptography; key
//! parsing and validation live in `acctbox-crypto`.

pub mod config;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Public identifier of a blockchain account (textual public key).
///
/// Immutable once an account is created. Used as the key of the
/// per-account secret map and of the `account_bundles` wire map, so it
/// orders and hashes by its string form.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wraps an already-encoded account id without validation.
    ///
    /// Use `acctbox_crypto::keys::parse_account_id` for untrusted input.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SecretKey
// ---------------------------------------------------------------------------

/// Textual signing secret of an account.
///
/// Zeroized on drop. `Debug` never prints the contents.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wraps an encoded secret key without validation.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the encoded secret. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// SHA-256 digest used for `prev` / `own_hash` chaining and for the
/// visible-hash binding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// The fixed byte length of a hash.
    pub const LEN: usize = 32;

    /// Creates a `Hash` from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = AcctboxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| AcctboxError::EncodingError {
            reason: "invalid hex encoding for hash".into(),
        })?;
        if bytes.len() != Self::LEN {
            return Err(AcctboxError::EncodingError {
                reason: format!("expected {} bytes for hash, got {}", Self::LEN, bytes.len()),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// Optimistic-concurrency counter of a bundle or account bundle.
///
/// Starts at 1. The storage server accepts a write only when the new
/// revision is exactly one greater than the stored one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Revision of a freshly created entity.
    pub const INITIAL: Revision = Revision(1);

    /// Creates a revision from a raw counter.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the successor revision.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::InvalidBundle`] if the counter is at
    /// `u64::MAX`.
    pub fn next(&self) -> Result<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| AcctboxError::InvalidBundle {
                reason: "revision counter exhausted".into(),
            })
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// KeyGeneration
// ---------------------------------------------------------------------------

/// Generation number of the per-user symmetric key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyGeneration(u32);

impl KeyGeneration {
    /// Creates a key generation from its number.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the generation number.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for KeyGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountMode
// ---------------------------------------------------------------------------

/// Which class of device may fetch an account's secret.
///
/// `User` is the initial state of every account. The server enforces the
/// restriction; this crate only records and transitions it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AccountMode {
    /// Default mode: secret available to every device of the user.
    User,
    /// Secret only released to (sufficiently old) mobile devices.
    MobileOnly,
    /// Explicitly re-opened to all devices after a mobile-only period.
    AllDevices,
}

impl AccountMode {
    /// Returns `true` if devices other than mobile may read the secret.
    pub fn allows_all_devices(&self) -> bool {
        !matches!(self, Self::MobileOnly)
    }
}

impl fmt::Display for AccountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::MobileOnly => write!(f, "mobile_only"),
            Self::AllDevices => write!(f, "all_devices"),
        }
    }
}

// ---------------------------------------------------------------------------
// AcctboxError
// ---------------------------------------------------------------------------

/// Central error type for the acctbox workspace.
///
/// Integrity and version failures indicate a security-relevant condition
/// (tampering or an unknown format) and are never retried. `KeyNotFound`
/// is a synchronization condition the caller may retry after refreshing
/// its key state.
#[derive(Debug, Error)]
pub enum AcctboxError {
    /// A secret key or account id string is malformed.
    #[error("parse error: {reason}")]
    ParseError {
        /// Human-readable description of the parse failure.
        reason: String,
    },

    /// Canonical (de)serialization or base64 framing failed.
    #[error("encoding error: {reason}")]
    EncodingError {
        /// Human-readable description of the encoding failure.
        reason: String,
    },

    /// A format version outside the supported set was encountered.
    #[error("unsupported {entity} version: {version}")]
    VersionError {
        /// Which record carried the version ("parent envelope", ...).
        entity: &'static str,
        /// The rejected version tag.
        version: u32,
    },

    /// Authenticated decryption failed or a visible/secret binding did not match.
    #[error("integrity error: {reason}")]
    IntegrityError {
        /// Human-readable description of the integrity failure.
        reason: String,
    },

    /// The key source cannot supply the requested key generation.
    #[error("key generation {generation} not found")]
    KeyNotFound {
        /// The generation that was requested.
        generation: u32,
    },

    /// An account was not present in the bundle.
    #[error("not found: {reason}")]
    NotFound {
        /// Human-readable description of what was missing.
        reason: String,
    },

    /// A bundle violates a builder or encoder precondition.
    #[error("invalid bundle: {reason}")]
    InvalidBundle {
        /// Human-readable description of the violated precondition.
        reason: String,
    },

    /// A cryptographic primitive failed (entropy source, cipher setup).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A configuration value is invalid.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

impl AcctboxError {
    /// Returns `true` for failures that signal tampering or an unknown
    /// format and must be surfaced distinctly from "not found".
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::IntegrityError { .. } | Self::VersionError { .. })
    }

    /// Returns `true` if the operation may succeed after the caller
    /// refreshes its key state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`AcctboxError`].
pub type Result<T> = std::result::Result<T, AcctboxError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
