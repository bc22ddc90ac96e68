//! Decoding and unboxing of wire records.
//!
//! Order of checks for the parent:
//!
//! 1. wire `version_parent` must be a known bundle version
//! 2. envelope bytes are decoded and hashed (`own_hash`)
//! 3. the envelope version is checked, then the payload is opened
//! 4. the sealed payload's version tag is dispatched exhaustively
//! 5. the visible bytes' hash is compared to the sealed `visible_hash`
//!    before the visible bytes are parsed
//!
//! Each listed account is then looked up in `account_bundles`. An absent
//! record is skipped and surfaces as [`AccountSecret::Unavailable`]. A
//! present record that fails any check aborts the whole decode.
//!
//! [`AccountSecret::Unavailable`]: crate::model::AccountSecret::Unavailable

use acctbox_crypto::hash::sha256;
use acctbox_types::config::BundleConfig;
use acctbox_types::{AcctboxError, Hash, Result};

use crate::binder::{entry_visible_hash, merge_account, merge_parent, verify_binding};
use crate::codec::{decode_b64, from_canonical, peek_version, Envelope};
use crate::engine::open;
use crate::key_source::KeySource;
use crate::model::{AccountBundle, AccountEntry, Bundle};
use crate::split::{AccountBundleSecretV1, BundleSecretV2, VisibleBundleV2, VisibleEntryV2};
use crate::version::{AccountBundleVersion, BundleVersion, EnvelopeKind};
use crate::wire::WireRecord;

/// Decodes a wire record with default limits.
///
/// See [`decode_and_unbox`] for the errors.
pub fn decode<K: KeySource + ?Sized>(wire: &WireRecord, key_source: &K) -> Result<Bundle> {
    decode_with_config(wire, key_source, &BundleConfig::default())
}

/// Decodes a wire record with explicit limits.
///
/// See [`decode_and_unbox`] for the errors.
pub fn decode_with_config<K: KeySource + ?Sized>(
    wire: &WireRecord,
    key_source: &K,
    config: &BundleConfig,
) -> Result<Bundle> {
    decode_and_unbox(wire, key_source, config).map(|(bundle, _)| bundle)
}

/// Decodes a wire record and returns the bundle with its parent format
/// version.
///
/// # Errors
///
/// - [`AcctboxError::VersionError`] for an unknown parent, envelope or
///   payload version, raised before decryption where the tag is visible.
/// - [`AcctboxError::KeyNotFound`] if the key source lacks a generation.
/// - [`AcctboxError::IntegrityError`] on authentication failure, a
///   visible-hash mismatch, or an account record filed under another id.
/// - [`AcctboxError::EncodingError`] for malformed or oversized fields.
/// - [`AcctboxError::InvalidBundle`] if a limit in `config` is exceeded.
/// - [`AcctboxError::ConfigError`] if `config` is invalid.
pub fn decode_and_unbox<K: KeySource + ?Sized>(
    wire: &WireRecord,
    key_source: &K,
    config: &BundleConfig,
) -> Result<(Bundle, BundleVersion)> {
    config.validate()?;

    let version = BundleVersion::from_u32(wire.version_parent)?;
    if wire.account_bundles.len() > config.max_accounts {
        return Err(AcctboxError::InvalidBundle {
            reason: format!(
                "{} account records exceed limit {}",
                wire.account_bundles.len(),
                config.max_accounts
            ),
        });
    }

    let (envelope, own_hash) = Envelope::decode(&wire.encrypted_parent, config.max_encoded_len)?;
    let plaintext = open(&envelope, EnvelopeKind::Parent, key_source)?;

    let sealed_version = BundleVersion::from_u32(peek_version(&plaintext)?)?;
    if sealed_version != version {
        return Err(AcctboxError::IntegrityError {
            reason: format!(
                "wire parent version {} does not match sealed version {}",
                version.as_u32(),
                sealed_version.as_u32()
            ),
        });
    }

    let mut bundle = match sealed_version {
        BundleVersion::V2 => unbox_parent_v2(&plaintext, &wire.visible_parent, own_hash, config)?,
    };

    for entry in &bundle.accounts {
        let Some(encoded) = wire.account_bundles.get(&entry.account_id) else {
            tracing::debug!(account_id = %entry.account_id, "account secret unavailable");
            continue;
        };
        let account = decode_account(encoded, entry, key_source, config).map_err(|e| {
            tracing::warn!(account_id = %entry.account_id, error = %e, "account record rejected");
            e
        })?;
        bundle.account_bundles.insert(entry.account_id.clone(), account);
    }

    let unlisted = wire
        .account_bundles
        .keys()
        .filter(|id| bundle.entry(id).is_none())
        .count();
    if unlisted > 0 {
        tracing::warn!(unlisted, "ignoring account records with no parent entry");
    }

    tracing::debug!(
        revision = bundle.revision.value(),
        accounts = bundle.accounts.len(),
        secrets = bundle.account_bundles.len(),
        version = version.as_u32(),
        key_generation = envelope.key_generation.value(),
        "unboxed bundle"
    );

    Ok((bundle, version))
}

fn unbox_parent_v2(
    plaintext: &[u8],
    visible_b64: &str,
    own_hash: Hash,
    config: &BundleConfig,
) -> Result<Bundle> {
    let (_, secret): (u32, BundleSecretV2) = from_canonical(plaintext, "parent secret")?;

    let visible_bytes = decode_b64(visible_b64, config.max_encoded_len, "visible parent")?;
    verify_binding(&sha256(&visible_bytes), &secret.visible_hash, "parent")?;

    let visible: VisibleBundleV2 = from_canonical(&visible_bytes, "visible parent")?;
    if visible.accounts.len() > config.max_accounts {
        return Err(AcctboxError::InvalidBundle {
            reason: format!(
                "{} accounts exceed limit {}",
                visible.accounts.len(),
                config.max_accounts
            ),
        });
    }

    merge_parent(visible, secret, own_hash)
}

fn decode_account<K: KeySource + ?Sized>(
    encoded: &str,
    entry: &AccountEntry,
    key_source: &K,
    config: &BundleConfig,
) -> Result<AccountBundle> {
    let (envelope, own_hash) = Envelope::decode(encoded, config.max_encoded_len)?;
    let plaintext = open(&envelope, EnvelopeKind::Account, key_source)?;

    match AccountBundleVersion::from_u32(peek_version(&plaintext)?)? {
        AccountBundleVersion::V1 => {
            let (_, payload): (u32, AccountBundleSecretV1) =
                from_canonical(&plaintext, "account secret")?;

            let visible = VisibleEntryV2 {
                account_id: entry.account_id.clone(),
                mode: entry.mode,
                is_primary: entry.is_primary,
            };
            verify_binding(&entry_visible_hash(&visible)?, &payload.visible_hash, "account")?;

            if payload.signers.is_empty() || payload.signers.len() > config.max_signers {
                return Err(AcctboxError::InvalidBundle {
                    reason: format!(
                        "account {} has {} signers, expected 1..={}",
                        entry.account_id,
                        payload.signers.len(),
                        config.max_signers
                    ),
                });
            }

            merge_account(payload, &entry.account_id, own_hash)
        }
    }
}
