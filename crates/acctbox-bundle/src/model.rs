//! In-memory bundle model.
//!
//! A [`Bundle`] is the decoded, merged form of one user's parent record
//! plus whichever per-account secret records were available. It is never
//! serialized directly; [`crate::split`] produces the wire-level halves.

use std::collections::BTreeMap;

use acctbox_types::{AccountId, AccountMode, Hash, Result, Revision, SecretKey};

// ---------------------------------------------------------------------------
// AccountEntry
// ---------------------------------------------------------------------------

/// One account listed in the parent record, in display order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountEntry {
    /// Public identifier. Immutable once created.
    pub account_id: AccountId,
    /// Display name. Travels only in the secret channel.
    pub name: String,
    /// Device-access mode.
    pub mode: AccountMode,
    /// Whether this is the user's primary account.
    pub is_primary: bool,
}

impl AccountEntry {
    /// Creates a USER-mode entry.
    pub fn new(account_id: AccountId, name: impl Into<String>, is_primary: bool) -> Self {
        Self {
            account_id,
            name: name.into(),
            mode: AccountMode::User,
            is_primary,
        }
    }
}

// ---------------------------------------------------------------------------
// AccountBundle
// ---------------------------------------------------------------------------

/// Secret record of a single account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountBundle {
    /// Revision counter of this record, independent of the parent's.
    pub revision: Revision,
    /// Hash of the preceding encoded record. `None` at revision 1.
    pub prev: Option<Hash>,
    /// Hash of the envelope this record was decoded from.
    pub own_hash: Option<Hash>,
    /// Account this record belongs to; cross-checked against the parent.
    pub account_id: AccountId,
    /// Signing secrets. Exactly one is populated by this crate.
    pub signers: Vec<SecretKey>,
}

impl AccountBundle {
    /// Creates a revision-1 record holding a single signer.
    pub fn new(account_id: AccountId, secret: SecretKey) -> Self {
        Self {
            revision: Revision::INITIAL,
            prev: None,
            own_hash: None,
            account_id,
            signers: vec![secret],
        }
    }

    /// Returns the first signer, if any.
    pub fn signer(&self) -> Option<&SecretKey> {
        self.signers.first()
    }

    /// Bumps the revision and chains `prev` to the last decoded hash.
    ///
    /// Leaves the record untouched if the revision is exhausted.
    pub(crate) fn advance(&mut self) -> Result<()> {
        self.revision = self.revision.next()?;
        self.prev = self.own_hash.take();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AccountSecret
// ---------------------------------------------------------------------------

/// Availability of an entry's secret record after decoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccountSecret<'a> {
    /// The secret record was present and verified.
    Secret(&'a AccountBundle),
    /// The wire record carried no secret for this entry.
    Unavailable,
}

impl<'a> AccountSecret<'a> {
    /// Returns the record if available.
    pub fn bundle(self) -> Option<&'a AccountBundle> {
        match self {
            Self::Secret(bundle) => Some(bundle),
            Self::Unavailable => None,
        }
    }

    /// Returns `true` if the secret was not present.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// A user's parent record with the account secrets that were available.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bundle {
    /// Revision of the parent record. Starts at 1.
    pub revision: Revision,
    /// Hash of the preceding encoded parent. `None` only at revision 1.
    pub prev: Option<Hash>,
    /// Hash of the parent envelope this bundle was decoded from.
    ///
    /// Set only by decoding, never encoded.
    pub own_hash: Option<Hash>,
    /// Account entries in display order.
    pub accounts: Vec<AccountEntry>,
    /// Secret records keyed by account id.
    ///
    /// Not part of the parent's payload; each is sealed separately.
    pub account_bundles: BTreeMap<AccountId, AccountBundle>,
}

impl Bundle {
    /// Creates an empty revision-1 bundle.
    pub(crate) fn empty() -> Self {
        Self {
            revision: Revision::INITIAL,
            prev: None,
            own_hash: None,
            accounts: Vec::new(),
            account_bundles: BTreeMap::new(),
        }
    }

    /// Looks up an entry by account id.
    pub fn entry(&self, account_id: &AccountId) -> Option<&AccountEntry> {
        self.accounts.iter().find(|e| &e.account_id == account_id)
    }

    pub(crate) fn entry_mut(&mut self, account_id: &AccountId) -> Option<&mut AccountEntry> {
        self.accounts.iter_mut().find(|e| &e.account_id == account_id)
    }

    /// Returns the primary entry, if one is marked.
    pub fn primary(&self) -> Option<&AccountEntry> {
        self.accounts.iter().find(|e| e.is_primary)
    }

    /// Returns the secret availability for one account.
    pub fn account_secret(&self, account_id: &AccountId) -> AccountSecret<'_> {
        match self.account_bundles.get(account_id) {
            Some(bundle) => AccountSecret::Secret(bundle),
            None => AccountSecret::Unavailable,
        }
    }

    /// Iterates entries in display order together with their secret state.
    pub fn account_secrets(&self) -> impl Iterator<Item = (&AccountEntry, AccountSecret<'_>)> {
        self.accounts
            .iter()
            .map(move |entry| (entry, self.account_secret(&entry.account_id)))
    }

    /// Bumps the parent revision and chains `prev` to the last decoded hash.
    ///
    /// A bundle that was never decoded has no `own_hash`, so its bumped
    /// revision carries `prev: None`.
    ///
    /// Leaves the bundle untouched if the revision is exhausted.
    pub(crate) fn advance(&mut self) -> Result<()> {
        self.revision = self.revision.next()?;
        self.prev = self.own_hash.take();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
