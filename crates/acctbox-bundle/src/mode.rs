//! Per-account device-mode transitions.
//!
//! ```text
//!            restrict_to_mobile
//!   USER ----------------------> MOBILE_ONLY
//!                                  |     ^
//!            allow_all_devices     |     | restrict_to_mobile
//!                                  v     |
//!                               ALL_DEVICES
//! ```
//!
//! A transition that changes the mode bumps both the account record and
//! the parent (the mode is part of the parent's visible half), each with
//! `prev` chained to its last decoded hash.
//!
//! Re-opening a MOBILE_ONLY account lands in ALL_DEVICES, not back in
//! USER. Both allow every device; ALL_DEVICES records that the account
//! was once restricted. Callers that compare against USER to decide
//! whether an account is open should use
//! [`AccountMode::allows_all_devices`] instead.

use acctbox_types::{AccountId, AccountMode, AcctboxError, Result};

use crate::model::Bundle;

/// Outcome of a mode transition request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModeTransition {
    /// The mode changed and revisions were bumped.
    Changed {
        /// Mode before the transition.
        from: AccountMode,
        /// Mode after the transition.
        to: AccountMode,
    },
    /// The account already satisfied the request. Nothing was modified.
    NoChangeNecessary,
}

impl ModeTransition {
    /// Returns `true` if the bundle was modified.
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Restricts an account's secret to mobile devices.
///
/// # Errors
///
/// - [`AcctboxError::NotFound`] if the account or its secret record is
///   not in the bundle.
/// - [`AcctboxError::InvalidBundle`] if either revision is exhausted.
///   The bundle is left unchanged.
pub fn restrict_to_mobile(bundle: &mut Bundle, account_id: &AccountId) -> Result<ModeTransition> {
    transition(bundle, account_id, AccountMode::MobileOnly, |mode| {
        mode == AccountMode::MobileOnly
    })
}

/// Re-opens an account's secret to every device.
///
/// USER already allows every device, so only MOBILE_ONLY moves (to
/// ALL_DEVICES).
///
/// # Errors
///
/// - [`AcctboxError::NotFound`] if the account or its secret record is
///   not in the bundle.
/// - [`AcctboxError::InvalidBundle`] if either revision is exhausted.
///   The bundle is left unchanged.
pub fn allow_all_devices(bundle: &mut Bundle, account_id: &AccountId) -> Result<ModeTransition> {
    transition(bundle, account_id, AccountMode::AllDevices, |mode| {
        mode.allows_all_devices()
    })
}

fn transition(
    bundle: &mut Bundle,
    account_id: &AccountId,
    target: AccountMode,
    satisfied: impl Fn(AccountMode) -> bool,
) -> Result<ModeTransition> {
    let from = bundle
        .entry(account_id)
        .map(|e| e.mode)
        .ok_or_else(|| AcctboxError::NotFound {
            reason: format!("account {account_id} not in bundle"),
        })?;

    let Some(account_revision) = bundle.account_bundles.get(account_id).map(|ab| ab.revision) else {
        return Err(AcctboxError::NotFound {
            reason: format!("secret for account {account_id} not available"),
        });
    };

    if satisfied(from) {
        return Ok(ModeTransition::NoChangeNecessary);
    }

    // Both bumps must succeed before anything is written.
    account_revision.next()?;
    bundle.revision.next()?;

    if let Some(ab) = bundle.account_bundles.get_mut(account_id) {
        ab.advance()?;
    }
    bundle.advance()?;
    if let Some(entry) = bundle.entry_mut(account_id) {
        entry.mode = target;
    }

    tracing::debug!(
        account_id = %account_id,
        from = %from,
        to = %target,
        revision = bundle.revision.value(),
        "account mode changed"
    );

    Ok(ModeTransition::Changed { from, to: target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::new_initial;
    use acctbox_types::{Hash, Revision};

    fn primary_id(bundle: &Bundle) -> AccountId {
        bundle.accounts[0].account_id.clone()
    }

    #[test]
    fn restrict_bumps_both_revisions() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = primary_id(&bundle);
        let parent_hash = Hash::new([1; 32]);
        let account_hash = Hash::new([2; 32]);
        bundle.own_hash = Some(parent_hash);
        if let Some(ab) = bundle.account_bundles.get_mut(&id) {
            ab.own_hash = Some(account_hash);
        }

        let outcome = restrict_to_mobile(&mut bundle, &id)?;
        assert_eq!(
            outcome,
            ModeTransition::Changed {
                from: AccountMode::User,
                to: AccountMode::MobileOnly
            }
        );
        assert_eq!(bundle.revision, Revision::new(2));
        assert_eq!(bundle.prev, Some(parent_hash));
        assert_eq!(bundle.own_hash, None);

        let ab = crate::access::secret_for(&bundle, &id)?;
        assert_eq!(ab.revision, Revision::new(2));
        assert_eq!(ab.prev, Some(account_hash));
        assert_eq!(ab.own_hash, None);
        Ok(())
    }

    #[test]
    fn repeated_restrict_is_no_change() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = primary_id(&bundle);
        restrict_to_mobile(&mut bundle, &id)?;
        let snapshot = bundle.clone();

        assert_eq!(restrict_to_mobile(&mut bundle, &id)?, ModeTransition::NoChangeNecessary);
        assert_eq!(bundle, snapshot);
        Ok(())
    }

    #[test]
    fn user_mode_already_allows_all_devices() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = primary_id(&bundle);
        let outcome = allow_all_devices(&mut bundle, &id)?;
        assert!(!outcome.is_changed());
        assert_eq!(bundle.revision, Revision::INITIAL);
        Ok(())
    }

    #[test]
    fn mobile_only_reopens_to_all_devices() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = primary_id(&bundle);
        restrict_to_mobile(&mut bundle, &id)?;
        let outcome = allow_all_devices(&mut bundle, &id)?;
        assert!(outcome.is_changed());
        assert_eq!(bundle.accounts[0].mode, AccountMode::AllDevices);
        assert_eq!(bundle.revision, Revision::new(3));
        assert_eq!(
            allow_all_devices(&mut bundle, &id)?,
            ModeTransition::NoChangeNecessary
        );
        Ok(())
    }

    #[test]
    fn exhausted_parent_revision_rejected_without_change() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = primary_id(&bundle);
        bundle.revision = Revision::new(u64::MAX);
        let snapshot = bundle.clone();

        let result = restrict_to_mobile(&mut bundle, &id);
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        assert_eq!(bundle, snapshot);
        Ok(())
    }

    #[test]
    fn exhausted_account_revision_rejected_without_change() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = primary_id(&bundle);
        restrict_to_mobile(&mut bundle, &id)?;
        if let Some(ab) = bundle.account_bundles.get_mut(&id) {
            ab.revision = Revision::new(u64::MAX);
        }
        let snapshot = bundle.clone();

        let result = allow_all_devices(&mut bundle, &id);
        assert!(matches!(result, Err(AcctboxError::InvalidBundle { .. })));
        assert_eq!(bundle, snapshot);
        Ok(())
    }

    #[test]
    fn unknown_account_is_not_found() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let result = restrict_to_mobile(&mut bundle, &AccountId::new("acct1missing"));
        assert!(matches!(result, Err(AcctboxError::NotFound { .. })));
        Ok(())
    }

    #[test]
    fn unavailable_secret_is_not_found() -> std::result::Result<(), AcctboxError> {
        let mut bundle = new_initial("main")?;
        let id = primary_id(&bundle);
        bundle.account_bundles.clear();
        let result = restrict_to_mobile(&mut bundle, &id);
        assert!(matches!(result, Err(AcctboxError::NotFound { .. })));
        assert_eq!(bundle.accounts[0].mode, AccountMode::User);
        Ok(())
    }
}
