//! Boxing a bundle into sealed envelopes.

use std::collections::BTreeMap;

use acctbox_crypto::hash::sha256;
use acctbox_types::config::BundleConfig;
use acctbox_types::{AcctboxError, KeyGeneration, Result};
use zeroize::Zeroizing;

use crate::binder::entry_visible_hash;
use crate::codec::{encode_b64, to_canonical};
use crate::engine::seal;
use crate::key_source::KeySource;
use crate::model::Bundle;
use crate::split::{split, AccountBundleSecretV1, BundleSecretV2, SplitBundle};
use crate::version::{AccountBundleVersion, BundleVersion, EnvelopeKind};
use crate::wire::{AcctBoxedEncoded, BoxedEncoded, WireRecord};

/// Encodes `bundle` under `generation` with default limits.
///
/// See [`box_and_encode`] for the errors.
pub fn encode<K: KeySource + ?Sized>(
    bundle: &Bundle,
    key_source: &K,
    generation: KeyGeneration,
) -> Result<WireRecord> {
    encode_with_config(bundle, key_source, generation, &BundleConfig::default())
}

/// Encodes `bundle` under `generation` with explicit limits.
///
/// See [`box_and_encode`] for the errors.
pub fn encode_with_config<K: KeySource + ?Sized>(
    bundle: &Bundle,
    key_source: &K,
    generation: KeyGeneration,
    config: &BundleConfig,
) -> Result<WireRecord> {
    Ok(box_and_encode(bundle, key_source, generation, config)?.to_wire())
}

/// Splits, hash-binds and seals `bundle`, always in the latest formats.
///
/// Every entry with an in-memory secret yields exactly one account
/// envelope. `own_hash` fields are never encoded.
///
/// # Errors
///
/// - [`AcctboxError::ConfigError`] if `config` is invalid.
/// - [`AcctboxError::InvalidBundle`] if the bundle exceeds the account or
///   signer limits, marks more than one primary, or is inconsistent.
/// - [`AcctboxError::KeyNotFound`] if the key source lacks `generation`.
/// - [`AcctboxError::EncodingError`] if serialization fails or an encoded
///   field would exceed `config.max_encoded_len`.
/// - [`AcctboxError::CryptoError`] if sealing fails.
pub fn box_and_encode<K: KeySource + ?Sized>(
    bundle: &Bundle,
    key_source: &K,
    generation: KeyGeneration,
    config: &BundleConfig,
) -> Result<BoxedEncoded> {
    config.validate()?;
    check_limits(bundle, config)?;

    let SplitBundle {
        visible,
        secret_entries,
        accounts,
    } = split(bundle)?;

    // Parent: visible bytes are hashed exactly as they go on the wire.
    let visible_bytes = to_canonical(&visible, "visible parent")?;
    let vis_parent_b64 = encode_b64(&visible_bytes);
    let secret = BundleSecretV2 {
        visible_hash: sha256(&visible_bytes),
        accounts: secret_entries,
    };
    let plaintext = Zeroizing::new(to_canonical(
        &(BundleVersion::LATEST.as_u32(), &secret),
        "parent secret",
    )?);
    let enc_parent = seal(&plaintext, key_source, generation, EnvelopeKind::Parent)?;
    let (_, enc_parent_b64) = enc_parent.encode()?;
    check_len(&enc_parent_b64, config, "encrypted parent")?;
    check_len(&vis_parent_b64, config, "visible parent")?;

    // Accounts.
    let mut acct_bundles = BTreeMap::new();
    for part in accounts {
        let entry = visible
            .accounts
            .get(part.index)
            .ok_or_else(|| AcctboxError::InvalidBundle {
                reason: format!("no visible entry for account {}", part.account_id),
            })?;

        let payload = AccountBundleSecretV1 {
            visible_hash: entry_visible_hash(entry)?,
            account_id: part.account_id.clone(),
            revision: part.revision,
            prev: part.prev,
            signers: part.signers,
        };
        let plaintext = Zeroizing::new(to_canonical(
            &(AccountBundleVersion::LATEST.as_u32(), &payload),
            "account secret",
        )?);
        let envelope = seal(&plaintext, key_source, generation, EnvelopeKind::Account)?;
        let (_, enc_b64) = envelope.encode()?;
        check_len(&enc_b64, config, "account envelope")?;

        acct_bundles.insert(
            part.account_id,
            AcctBoxedEncoded {
                enc_b64,
                format_version: AccountBundleVersion::LATEST,
            },
        );
    }

    tracing::debug!(
        revision = bundle.revision.value(),
        accounts = bundle.accounts.len(),
        secrets = acct_bundles.len(),
        key_generation = generation.value(),
        "boxed bundle"
    );

    Ok(BoxedEncoded {
        enc_parent,
        enc_parent_b64,
        vis_parent_b64,
        format_version_parent: BundleVersion::LATEST,
        acct_bundles,
    })
}

fn check_limits(bundle: &Bundle, config: &BundleConfig) -> Result<()> {
    if bundle.accounts.len() > config.max_accounts {
        return Err(AcctboxError::InvalidBundle {
            reason: format!(
                "{} accounts exceed limit {}",
                bundle.accounts.len(),
                config.max_accounts
            ),
        });
    }

    let primaries = bundle.accounts.iter().filter(|e| e.is_primary).count();
    if primaries > 1 {
        return Err(AcctboxError::InvalidBundle {
            reason: format!("{primaries} accounts marked primary"),
        });
    }

    if let Some(ab) = bundle
        .account_bundles
        .values()
        .find(|ab| ab.signers.len() > config.max_signers)
    {
        return Err(AcctboxError::InvalidBundle {
            reason: format!(
                "account {} has {} signers, limit {}",
                ab.account_id,
                ab.signers.len(),
                config.max_signers
            ),
        });
    }

    Ok(())
}

fn check_len(encoded: &str, config: &BundleConfig, what: &str) -> Result<()> {
    if encoded.len() > config.max_encoded_len {
        return Err(AcctboxError::EncodingError {
            reason: format!(
                "{what}: encoded length {} exceeds limit {}",
                encoded.len(),
                config.max_encoded_len
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{add_account, new_initial};
    use crate::key_source::MemoryKeySource;
    use acctbox_crypto::kdf::KeySeed;
    use acctbox_crypto::keys::AccountKeypair;

    fn keys() -> MemoryKeySource {
        MemoryKeySource::new().with_seed(KeyGeneration::new(1), KeySeed::from_bytes([0x31; 32]))
    }

    #[test]
    fn one_envelope_per_secret() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let second = AccountKeypair::generate()?.secret_key()?;
        add_account(&mut bundle, &second, "second", false)?;

        let boxed = box_and_encode(&bundle, &keys(), KeyGeneration::new(1), &BundleConfig::default())?;
        assert_eq!(boxed.acct_bundles.len(), 2);
        assert_eq!(boxed.format_version_parent, BundleVersion::V2);
        assert_eq!(boxed.enc_parent.version, 2);
        assert_eq!(boxed.enc_parent.key_generation, KeyGeneration::new(1));
        Ok(())
    }

    #[test]
    fn visible_parent_hides_names() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let bundle = new_initial("very-private-name")?;
        let wire = encode(&bundle, &keys(), KeyGeneration::new(1))?;
        let visible = crate::codec::decode_b64(&wire.visible_parent, 1 << 20, "visible")?;
        let needle = b"very-private-name";
        assert!(!visible.windows(needle.len()).any(|w| w == needle));
        Ok(())
    }

    #[test]
    fn two_primaries_rejected() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let second = AccountKeypair::generate()?.secret_key()?;
        add_account(&mut bundle, &second, "second", false)?;
        for entry in &mut bundle.accounts {
            entry.is_primary = true;
        }
        let result = encode(&bundle, &keys(), KeyGeneration::new(1));
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        Ok(())
    }

    #[test]
    fn account_limit_enforced() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let second = AccountKeypair::generate()?.secret_key()?;
        add_account(&mut bundle, &second, "second", false)?;
        let config = BundleConfig {
            max_accounts: 1,
            ..BundleConfig::default()
        };
        let result = encode_with_config(&bundle, &keys(), KeyGeneration::new(1), &config);
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        Ok(())
    }

    #[test]
    fn signer_limit_enforced() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let extra = AccountKeypair::generate()?.secret_key()?;
        for ab in bundle.account_bundles.values_mut() {
            ab.signers.push(extra.clone());
        }
        let result = encode(&bundle, &keys(), KeyGeneration::new(1));
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        Ok(())
    }

    #[test]
    fn encoded_length_limit_enforced() -> std::result::Result<(), AcctboxError> {
        let bundle = new_initial("main")?;
        let config = BundleConfig {
            max_encoded_len: 16,
            ..BundleConfig::default()
        };
        let result = encode_with_config(&bundle, &keys(), KeyGeneration::new(1), &config);
        assert!(matches!(result, Err(AcctboxError::EncodingError { .. })));
        Ok(())
    }

    #[test]
    fn unknown_generation_fails() -> std::result::Result<(), AcctboxError> {
        let bundle = new_initial("main")?;
        let result = encode(&bundle, &keys(), KeyGeneration::new(4));
        assert!(matches!(result, Err(AcctboxError::KeyNotFound { generation: 4 })));
        Ok(())
    }
}
