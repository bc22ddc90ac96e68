//! Visibility split of a bundle into server-visible and secret halves.
//!
//! The visible half carries what the storage server needs to enforce
//! revisions and device policy: revision, prev pointer, and per account
//! the id, mode and primary flag. Everything else (display names and
//! signing secrets) goes into sealed payloads.

use acctbox_types::{AccountId, AccountMode, AcctboxError, Hash, Result, Revision, SecretKey};
use serde::{Deserialize, Serialize};

use crate::model::Bundle;

// ---------------------------------------------------------------------------
// Payload structures (format V2 parent, V1 account)
// ---------------------------------------------------------------------------

/// Server-visible part of one account entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VisibleEntryV2 {
    /// Public account identifier.
    pub account_id: AccountId,
    /// Device-access mode the server enforces.
    pub mode: AccountMode,
    /// Whether this is the user's primary account.
    pub is_primary: bool,
}

/// Server-visible part of the parent record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VisibleBundleV2 {
    /// Parent revision the server orders writes by.
    pub revision: Revision,
    /// Hash of the preceding parent envelope.
    pub prev: Option<Hash>,
    /// Visible entries in display order.
    pub accounts: Vec<VisibleEntryV2>,
}

/// Secret part of one account entry, positionally aligned with
/// [`VisibleBundleV2::accounts`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SecretEntryV2 {
    /// Display name of the account.
    pub name: String,
}

/// Sealed payload of the parent record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BundleSecretV2 {
    /// SHA-256 of the canonical [`VisibleBundleV2`] bytes.
    pub visible_hash: Hash,
    /// Secret entries, aligned with the visible entries.
    pub accounts: Vec<SecretEntryV2>,
}

/// Sealed payload of a per-account record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccountBundleSecretV1 {
    /// SHA-256 of the canonical [`VisibleEntryV2`] bytes of this account.
    pub visible_hash: Hash,
    /// Account the record belongs to.
    pub account_id: AccountId,
    /// Revision of this account record.
    pub revision: Revision,
    /// Hash of the preceding account envelope.
    pub prev: Option<Hash>,
    /// Signing secrets.
    pub signers: Vec<SecretKey>,
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Secret fields of one account record before hash binding.
#[derive(Clone, Debug)]
pub struct AccountSecretPart {
    /// Index of the account's entry in [`SplitBundle::visible`].
    pub index: usize,
    /// Account the record belongs to.
    pub account_id: AccountId,
    /// Revision of the account record.
    pub revision: Revision,
    /// Hash of the preceding account envelope.
    pub prev: Option<Hash>,
    /// Signing secrets to seal.
    pub signers: Vec<SecretKey>,
}

/// Result of splitting a bundle.
#[derive(Clone, Debug)]
pub struct SplitBundle {
    /// Visible parent, including every entry's visible fields.
    pub visible: VisibleBundleV2,
    /// Secret entries, aligned with `visible.accounts`.
    pub secret_entries: Vec<SecretEntryV2>,
    /// One part per entry that has an in-memory secret, in display order.
    pub accounts: Vec<AccountSecretPart>,
}

/// Splits `bundle` into its visible and secret halves.
///
/// # Errors
///
/// Returns [`AcctboxError::InvalidBundle`] if an account id is listed
/// twice, a secret record is keyed under a different id than it carries,
/// a secret record has no listed entry, or a record has no signer.
pub fn split(bundle: &Bundle) -> Result<SplitBundle> {
    let mut visible_entries = Vec::with_capacity(bundle.accounts.len());
    let mut secret_entries = Vec::with_capacity(bundle.accounts.len());
    let mut accounts = Vec::with_capacity(bundle.account_bundles.len());

    for (index, entry) in bundle.accounts.iter().enumerate() {
        if bundle.accounts[..index]
            .iter()
            .any(|e| e.account_id == entry.account_id)
        {
            return Err(AcctboxError::InvalidBundle {
                reason: format!("account {} listed more than once", entry.account_id),
            });
        }

        visible_entries.push(VisibleEntryV2 {
            account_id: entry.account_id.clone(),
            mode: entry.mode,
            is_primary: entry.is_primary,
        });
        secret_entries.push(SecretEntryV2 {
            name: entry.name.clone(),
        });

        if let Some(ab) = bundle.account_bundles.get(&entry.account_id) {
            if ab.account_id != entry.account_id {
                return Err(AcctboxError::InvalidBundle {
                    reason: format!(
                        "secret keyed under {} carries account id {}",
                        entry.account_id, ab.account_id
                    ),
                });
            }
            if ab.signers.is_empty() {
                return Err(AcctboxError::InvalidBundle {
                    reason: format!("account {} has no signer", entry.account_id),
                });
            }
            accounts.push(AccountSecretPart {
                index,
                account_id: ab.account_id.clone(),
                revision: ab.revision,
                prev: ab.prev,
                signers: ab.signers.clone(),
            });
        }
    }

    if accounts.len() != bundle.account_bundles.len() {
        return Err(AcctboxError::InvalidBundle {
            reason: "secret record present for an account that is not listed".into(),
        });
    }

    Ok(SplitBundle {
        visible: VisibleBundleV2 {
            revision: bundle.revision,
            prev: bundle.prev,
            accounts: visible_entries,
        },
        secret_entries,
        accounts,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
