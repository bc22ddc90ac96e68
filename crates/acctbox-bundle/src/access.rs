//! Read access to account secrets.

use acctbox_types::{AccountId, AccountMode, AcctboxError, Result, Revision, SecretKey};

use crate::model::{AccountBundle, Bundle};

/// Flat view of one account with its secret.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountWithSecret {
    /// Public account identifier.
    pub account_id: AccountId,
    /// Display name.
    pub name: String,
    /// Device-access mode.
    pub mode: AccountMode,
    /// Whether this is the user's primary account.
    pub is_primary: bool,
    /// Revision of the account's secret record.
    pub revision: Revision,
    /// Signing secrets of the account.
    pub signers: Vec<SecretKey>,
}

/// Returns the secret record of `account_id`.
///
/// # Errors
///
/// Returns [`AcctboxError::NotFound`] if the bundle holds no secret for
/// the account (unknown id, or secret unavailable after decode).
pub fn secret_for<'a>(bundle: &'a Bundle, account_id: &AccountId) -> Result<&'a AccountBundle> {
    bundle
        .account_bundles
        .get(account_id)
        .ok_or_else(|| AcctboxError::NotFound {
            reason: format!("no secret for account {account_id}"),
        })
}

/// Returns the merged entry and secret of `account_id`.
///
/// # Errors
///
/// Returns [`AcctboxError::NotFound`] if either the entry or the secret
/// is missing.
pub fn account_with_secret(bundle: &Bundle, account_id: &AccountId) -> Result<AccountWithSecret> {
    let entry = bundle
        .entry(account_id)
        .ok_or_else(|| AcctboxError::NotFound {
            reason: format!("account {account_id} not in bundle"),
        })?;
    let secret = secret_for(bundle, account_id)?;

    Ok(AccountWithSecret {
        account_id: entry.account_id.clone(),
        name: entry.name.clone(),
        mode: entry.mode,
        is_primary: entry.is_primary,
        revision: secret.revision,
        signers: secret.signers.clone(),
    })
}
