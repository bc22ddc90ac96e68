//! Construction of bundles and import of account secrets.
//!
//! Every constructor yields USER-mode entries and revision-1 account
//! records holding exactly one signer. Signers are stored in canonical
//! (lower-case) form whatever case the caller supplied.

use acctbox_crypto::keys::{parse_account_id, parse_secret_key, AccountKeypair};
use acctbox_types::{AccountId, AcctboxError, Hash, Result, Revision, SecretKey};

use crate::model::{AccountBundle, AccountEntry, Bundle};

// ---------------------------------------------------------------------------
// Fresh bundles
// ---------------------------------------------------------------------------

/// Builds a revision-1 bundle holding one imported account.
///
/// The entry is not marked primary.
///
/// # Errors
///
/// Returns [`AcctboxError::ParseError`] if `secret` is malformed.
pub fn new_from_secret(secret: &SecretKey, name: &str) -> Result<Bundle> {
    let (keypair, account_id) = parse_secret_key(secret)?;
    let canonical = keypair.secret_key()?;

    let mut bundle = Bundle::empty();
    bundle
        .accounts
        .push(AccountEntry::new(account_id.clone(), name, false));
    bundle
        .account_bundles
        .insert(account_id.clone(), AccountBundle::new(account_id, canonical));

    tracing::debug!(accounts = 1, "built bundle from secret");
    Ok(bundle)
}

/// Builds a revision-1 bundle around a newly generated primary account.
///
/// # Errors
///
/// Returns [`AcctboxError::CryptoError`] if the entropy source fails.
pub fn new_initial(name: &str) -> Result<Bundle> {
    let secret = AccountKeypair::generate()?.secret_key()?;
    let mut bundle = new_from_secret(&secret, name)?;
    if let Some(entry) = bundle.accounts.first_mut() {
        entry.is_primary = true;
    }
    Ok(bundle)
}

// ---------------------------------------------------------------------------
// Legacy shape
// ---------------------------------------------------------------------------

/// One account in the older unified representation, where names and
/// every signer lived together in a single record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LegacyAccount {
    /// Encoded account id as listed in the legacy record.
    pub account_id: AccountId,
    /// Display name.
    pub name: String,
    /// Whether this was the primary account.
    pub is_primary: bool,
    /// Signing secrets. Only the first survives conversion.
    pub signers: Vec<SecretKey>,
}

/// The older unified bundle representation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LegacyBundle {
    /// Revision of the legacy record. Carried over unchanged.
    pub revision: Revision,
    /// Hash of the record preceding the legacy one.
    pub prev: Option<Hash>,
    /// Accounts in display order.
    pub accounts: Vec<LegacyAccount>,
}

/// Converts a legacy bundle into the split shape.
///
/// Revision and `prev` carry over. Each account keeps only its first
/// signer and starts in USER mode at account revision 1.
///
/// # Errors
///
/// - [`AcctboxError::InvalidBundle`] if an account has no signer or is
///   listed twice.
/// - [`AcctboxError::ParseError`] if an id or first signer is malformed.
/// - [`AcctboxError::IntegrityError`] if the first signer does not
///   control the listed account.
pub fn new_from_legacy(old: &LegacyBundle) -> Result<Bundle> {
    let mut bundle = Bundle::empty();
    bundle.revision = old.revision;
    bundle.prev = old.prev;

    for acct in &old.accounts {
        let signer = acct.signers.first().ok_or_else(|| AcctboxError::InvalidBundle {
            reason: format!("legacy account {} has no signer", acct.account_id),
        })?;

        let listed = parse_account_id(acct.account_id.as_str())?;
        let (keypair, derived) = parse_secret_key(signer)?;
        if derived != listed {
            return Err(AcctboxError::IntegrityError {
                reason: format!("legacy signer does not control account {listed}"),
            });
        }

        if bundle.entry(&listed).is_some() {
            return Err(AcctboxError::InvalidBundle {
                reason: format!("legacy account {listed} listed more than once"),
            });
        }

        if acct.signers.len() > 1 {
            tracing::warn!(
                account_id = %listed,
                dropped = acct.signers.len() - 1,
                "legacy account has extra signers; keeping the first"
            );
        }

        bundle
            .accounts
            .push(AccountEntry::new(listed.clone(), acct.name.clone(), acct.is_primary));
        bundle
            .account_bundles
            .insert(listed.clone(), AccountBundle::new(listed, keypair.secret_key()?));
    }

    tracing::debug!(
        revision = bundle.revision.value(),
        accounts = bundle.accounts.len(),
        "converted legacy bundle"
    );
    Ok(bundle)
}

// ---------------------------------------------------------------------------
// Import into an existing bundle
// ---------------------------------------------------------------------------

/// Imports `secret` as a new account of `bundle`.
///
/// Appends a USER-mode entry and a revision-1 account record, then bumps
/// the parent revision and chains `prev` to the last decoded hash. With
/// `make_primary` the new entry becomes the only primary.
///
/// `prev` comes from `own_hash`, which only decoding sets. Called on a
/// bundle that was never decoded (for example straight after
/// [`new_initial`]), the result is revision 2 with `prev: None`. Decode
/// the stored bundle first when the write must chain to it.
///
/// # Errors
///
/// - [`AcctboxError::ParseError`] if `secret` is malformed.
/// - [`AcctboxError::InvalidBundle`] if the account is already present,
///   if the parent revision is exhausted, or if `make_primary` would
///   clear the primary flag of an account whose secret is unavailable
///   (its sealed record is bound to the flag and cannot be re-sealed).
///
/// The bundle is unchanged on error.
pub fn add_account(
    bundle: &mut Bundle,
    secret: &SecretKey,
    name: &str,
    make_primary: bool,
) -> Result<AccountId> {
    let (keypair, account_id) = parse_secret_key(secret)?;
    let canonical = keypair.secret_key()?;

    if bundle.entry(&account_id).is_some() || bundle.account_bundles.contains_key(&account_id) {
        return Err(AcctboxError::InvalidBundle {
            reason: format!("account {account_id} already in bundle"),
        });
    }

    if make_primary {
        if let Some(held) = bundle
            .accounts
            .iter()
            .find(|e| e.is_primary && !bundle.account_bundles.contains_key(&e.account_id))
        {
            return Err(AcctboxError::InvalidBundle {
                reason: format!(
                    "cannot clear primary flag of {}: secret not available",
                    held.account_id
                ),
            });
        }
    }

    bundle.revision.next()?;

    if make_primary {
        for entry in &mut bundle.accounts {
            entry.is_primary = false;
        }
    }

    bundle
        .accounts
        .push(AccountEntry::new(account_id.clone(), name, make_primary));
    bundle.account_bundles.insert(
        account_id.clone(),
        AccountBundle::new(account_id.clone(), canonical),
    );
    bundle.advance()?;

    tracing::debug!(
        revision = bundle.revision.value(),
        account_id = %account_id,
        primary = make_primary,
        "imported account"
    );
    Ok(account_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use acctbox_types::AccountMode;

    fn secret() -> std::result::Result<SecretKey, AcctboxError> {
        AccountKeypair::generate()?.secret_key()
    }

    #[test]
    fn from_secret_is_single_user_entry() -> std::result::Result<(), AcctboxError> {
        let secret = secret()?;
        let bundle = new_from_secret(&secret, "imported")?;

        assert_eq!(bundle.revision, Revision::INITIAL);
        assert_eq!(bundle.prev, None);
        assert_eq!(bundle.accounts.len(), 1);
        let entry = &bundle.accounts[0];
        assert_eq!(entry.mode, AccountMode::User);
        assert!(!entry.is_primary);

        let ab = bundle
            .account_bundles
            .get(&entry.account_id)
            .ok_or(AcctboxError::NotFound { reason: "secret".into() })?;
        assert_eq!(ab.revision, Revision::INITIAL);
        assert_eq!(ab.signers, vec![secret]);
        Ok(())
    }

    #[test]
    fn initial_is_primary() -> std::result::Result<(), AcctboxError> {
        let bundle = new_initial("main")?;
        assert!(bundle.accounts[0].is_primary);
        assert_eq!(bundle.account_bundles.len(), 1);
        Ok(())
    }

    #[test]
    fn upper_case_secret_stored_canonical() -> std::result::Result<(), AcctboxError> {
        let secret = secret()?;
        let shouted = SecretKey::new(secret.expose().to_uppercase());

        let bundle = new_from_secret(&shouted, "imported")?;
        let id = &bundle.accounts[0].account_id;
        let stored = bundle.account_bundles.get(id).and_then(AccountBundle::signer);
        assert_eq!(stored, Some(&secret));

        let mut other = new_initial("main")?;
        let id = add_account(&mut other, &shouted, "imported", false)?;
        let stored = other.account_bundles.get(&id).and_then(AccountBundle::signer);
        assert_eq!(stored, Some(&secret));
        Ok(())
    }

    #[test]
    fn add_account_on_exhausted_revision_rejected() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        bundle.revision = Revision::new(u64::MAX);
        let snapshot = bundle.clone();

        let result = add_account(&mut bundle, &secret()?, "second", true);
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        assert_eq!(bundle, snapshot);
        Ok(())
    }

    #[test]
    fn add_account_on_undecoded_bundle_has_no_prev() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        add_account(&mut bundle, &secret()?, "second", false)?;
        assert_eq!(bundle.revision, Revision::new(2));
        assert_eq!(bundle.prev, None);
        Ok(())
    }

    #[test]
    fn primary_without_secret_cannot_be_cleared() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        bundle.account_bundles.clear();
        let snapshot = bundle.clone();

        let result = add_account(&mut bundle, &secret()?, "new-main", true);
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        assert_eq!(bundle, snapshot);

        // Without the primary flag nothing bound to the old entry changes.
        add_account(&mut bundle, &secret()?, "second", false)?;
        assert!(bundle.accounts[0].is_primary);
        Ok(())
    }

    #[test]
    fn malformed_secret_is_parse_error() {
        let result = new_from_secret(&SecretKey::new("SBADSECRET"), "x");
        assert!(matches!(result, Err(AcctboxError::ParseError { .. })));
    }

    #[test]
    fn add_account_bumps_parent_and_chains_prev() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let own = Hash::new([5; 32]);
        bundle.own_hash = Some(own);

        let id = add_account(&mut bundle, &secret()?, "second", false)?;
        assert_eq!(bundle.revision, Revision::new(2));
        assert_eq!(bundle.prev, Some(own));
        assert_eq!(bundle.own_hash, None);
        assert_eq!(bundle.accounts.len(), 2);
        assert!(!bundle.accounts[1].is_primary);
        assert_eq!(
            bundle.account_bundles.get(&id).map(|ab| ab.revision),
            Some(Revision::INITIAL)
        );
        Ok(())
    }

    #[test]
    fn add_primary_clears_other_primary() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = add_account(&mut bundle, &secret()?, "new-main", true)?;
        let primaries: Vec<_> = bundle.accounts.iter().filter(|e| e.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].account_id, id);
        Ok(())
    }

    #[test]
    fn duplicate_import_rejected() -> std::result::Result<(), AcctboxError> {
        let secret = secret()?;
        let mut bundle = new_from_secret(&secret, "one")?;
        let result = add_account(&mut bundle, &secret, "again", false);
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        assert_eq!(bundle.revision, Revision::INITIAL);
        Ok(())
    }

    #[test]
    fn legacy_keeps_first_signer() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::generate()?;
        let first = kp.secret_key()?;
        let extra = secret()?;
        let old = LegacyBundle {
            revision: Revision::new(7),
            prev: Some(Hash::new([3; 32])),
            accounts: vec![LegacyAccount {
                account_id: kp.account_id()?,
                name: "legacy".into(),
                is_primary: true,
                signers: vec![first.clone(), extra],
            }],
        };

        let bundle = new_from_legacy(&old)?;
        assert_eq!(bundle.revision, Revision::new(7));
        assert_eq!(bundle.prev, old.prev);
        assert!(bundle.accounts[0].is_primary);
        assert_eq!(bundle.accounts[0].mode, AccountMode::User);
        let ab = bundle
            .account_bundles
            .get(&kp.account_id()?)
            .ok_or(AcctboxError::NotFound { reason: "secret".into() })?;
        assert_eq!(ab.signers, vec![first]);
        Ok(())
    }

    #[test]
    fn legacy_without_signer_rejected() -> std::result::Result<(), AcctboxError> {
        let kp = AccountKeypair::generate()?;
        let old = LegacyBundle {
            revision: Revision::INITIAL,
            prev: None,
            accounts: vec![LegacyAccount {
                account_id: kp.account_id()?,
                name: "empty".into(),
                is_primary: false,
                signers: Vec::new(),
            }],
        };
        assert!(matches!(new_from_legacy(&old), Err(AcctboxError::InvalidBundle { .. })));
        Ok(())
    }

    #[test]
    fn legacy_foreign_signer_rejected() -> std::result::Result<(), AcctboxError> {
        let listed = AccountKeypair::generate()?;
        let old = LegacyBundle {
            revision: Revision::INITIAL,
            prev: None,
            accounts: vec![LegacyAccount {
                account_id: listed.account_id()?,
                name: "mismatch".into(),
                is_primary: false,
                signers: vec![secret()?],
            }],
        };
        assert!(matches!(new_from_legacy(&old), Err(AcctboxError::IntegrityError { .. })));
        Ok(())
    }
}
