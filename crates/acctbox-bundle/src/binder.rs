//! Visible/secret hash binding and merging.
//!
//! The sealed half of every record embeds the SHA-256 of its visible
//! half's canonical bytes. On decode the hash is recomputed from the bytes
//! actually received and compared in constant time before the visible
//! half is trusted for anything.

use std::collections::BTreeMap;

use acctbox_crypto::hash::{hashes_equal, sha256};
use acctbox_types::{AccountId, AcctboxError, Hash, Result};

use crate::codec::to_canonical;
use crate::model::{AccountBundle, AccountEntry, Bundle};
use crate::split::{AccountBundleSecretV1, BundleSecretV2, VisibleBundleV2, VisibleEntryV2};

/// Hash of one account's visible entry, embedded in its secret record.
///
/// # Errors
///
/// Returns [`AcctboxError::EncodingError`] if serialization fails.
pub fn entry_visible_hash(entry: &VisibleEntryV2) -> Result<Hash> {
    Ok(sha256(&to_canonical(entry, "visible account entry")?))
}

/// Requires `computed` to equal `embedded`.
///
/// # Errors
///
/// Returns [`AcctboxError::IntegrityError`] naming `scope` on mismatch.
pub fn verify_binding(computed: &Hash, embedded: &Hash, scope: &str) -> Result<()> {
    if hashes_equal(computed, embedded) {
        Ok(())
    } else {
        Err(AcctboxError::IntegrityError {
            reason: format!("{scope}: visible hash mismatch"),
        })
    }
}

/// Merges a verified visible parent with its secret half.
///
/// The resulting bundle has no account secrets yet; `own_hash` is set to
/// the parent envelope's hash.
///
/// # Errors
///
/// - [`AcctboxError::IntegrityError`] if the halves differ in length.
/// - [`AcctboxError::InvalidBundle`] if an account id repeats.
pub fn merge_parent(visible: VisibleBundleV2, secret: BundleSecretV2, own_hash: Hash) -> Result<Bundle> {
    if visible.accounts.len() != secret.accounts.len() {
        return Err(AcctboxError::IntegrityError {
            reason: format!(
                "parent: {} visible entries but {} secret entries",
                visible.accounts.len(),
                secret.accounts.len()
            ),
        });
    }

    let mut accounts: Vec<AccountEntry> = Vec::with_capacity(visible.accounts.len());
    for (vis, sec) in visible.accounts.into_iter().zip(secret.accounts) {
        if accounts.iter().any(|e| e.account_id == vis.account_id) {
            return Err(AcctboxError::InvalidBundle {
                reason: format!("account {} listed more than once", vis.account_id),
            });
        }
        accounts.push(AccountEntry {
            account_id: vis.account_id,
            name: sec.name,
            mode: vis.mode,
            is_primary: vis.is_primary,
        });
    }

    Ok(Bundle {
        revision: visible.revision,
        prev: visible.prev,
        own_hash: Some(own_hash),
        accounts,
        account_bundles: BTreeMap::new(),
    })
}

/// Builds an account record from its opened payload.
///
/// # Errors
///
/// Returns [`AcctboxError::IntegrityError`] if the payload names a
/// different account than the entry it was filed under.
pub fn merge_account(
    secret: AccountBundleSecretV1,
    expected: &AccountId,
    own_hash: Hash,
) -> Result<AccountBundle> {
    if &secret.account_id != expected {
        return Err(AcctboxError::IntegrityError {
            reason: format!(
                "account record filed under {expected} belongs to {}",
                secret.account_id
            ),
        });
    }

    Ok(AccountBundle {
        revision: secret.revision,
        prev: secret.prev,
        own_hash: Some(own_hash),
        account_id: secret.account_id,
        signers: secret.signers,
    })
}
