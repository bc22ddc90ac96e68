//! Closed sets of format versions.
//!
//! Encoding always writes the latest version of each entity. Decoding
//! maps a raw tag onto these enums and rejects anything else with
//! [`AcctboxError::VersionError`]; there is no fallback or best-effort
//! parse of an unknown layout.

use acctbox_types::{AcctboxError, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BundleVersion
// ---------------------------------------------------------------------------

/// Format version of the parent record's visible/secret payloads.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BundleVersion {
    /// Visible entries with mode and primary flag; secret names only.
    V2,
}

impl BundleVersion {
    /// Version written by the encoder.
    pub const LATEST: Self = Self::V2;

    /// Returns the wire tag.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::V2 => 2,
        }
    }

    /// Maps a wire tag onto a known version.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::VersionError`] for an unknown tag.
    pub fn from_u32(tag: u32) -> Result<Self> {
        match tag {
            2 => Ok(Self::V2),
            other => Err(AcctboxError::VersionError {
                entity: "bundle",
                version: other,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// AccountBundleVersion
// ---------------------------------------------------------------------------

/// Format version of a per-account secret payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AccountBundleVersion {
    /// Visible-hash binding, account id, revision chain and signers.
    V1,
}

impl AccountBundleVersion {
    /// Version written by the encoder.
    pub const LATEST: Self = Self::V1;

    /// Returns the wire tag.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::V1 => 1,
        }
    }

    /// Maps a wire tag onto a known version.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::VersionError`] for an unknown tag.
    pub fn from_u32(tag: u32) -> Result<Self> {
        match tag {
            1 => Ok(Self::V1),
            other => Err(AcctboxError::VersionError {
                entity: "account bundle",
                version: other,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// EnvelopeKind
// ---------------------------------------------------------------------------

/// Which encrypted envelope a blob claims to be.
///
/// Each kind accepts exactly one envelope version. The two differ so a
/// parent envelope can never be opened as an account envelope or the
/// reverse, even under the same key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EnvelopeKind {
    /// The parent record's encrypted half.
    Parent,
    /// A per-account secret record.
    Account,
}

impl EnvelopeKind {
    /// Envelope version written for this kind.
    pub fn version(self) -> u32 {
        match self {
            Self::Parent => 2,
            Self::Account => 1,
        }
    }

    /// Name used in error reports.
    pub fn entity(self) -> &'static str {
        match self {
            Self::Parent => "parent envelope",
            Self::Account => "account envelope",
        }
    }

    /// Rejects any envelope version other than this kind's.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::VersionError`] on mismatch.
    pub fn check(self, version: u32) -> Result<()> {
        if version == self.version() {
            Ok(())
        } else {
            Err(AcctboxError::VersionError {
                entity: self.entity(),
                version,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_roundtrip() -> std::result::Result<(), AcctboxError> {
        assert_eq!(BundleVersion::from_u32(BundleVersion::LATEST.as_u32())?, BundleVersion::V2);
        assert_eq!(
            AccountBundleVersion::from_u32(AccountBundleVersion::LATEST.as_u32())?,
            AccountBundleVersion::V1
        );
        Ok(())
    }

    #[test]
    fn unknown_tags_rejected() {
        for tag in [0, 1, 3, u32::MAX] {
            assert!(matches!(
                BundleVersion::from_u32(tag),
                Err(AcctboxError::VersionError { entity: "bundle", .. })
            ));
        }
        for tag in [0, 2, 999] {
            assert!(matches!(
                AccountBundleVersion::from_u32(tag),
                Err(AcctboxError::VersionError { entity: "account bundle", .. })
            ));
        }
    }

    #[test]
    fn envelope_kinds_do_not_overlap() {
        assert!(EnvelopeKind::Parent.check(2).is_ok());
        assert!(EnvelopeKind::Parent.check(1).is_err());
        assert!(EnvelopeKind::Account.check(1).is_ok());
        assert!(EnvelopeKind::Account.check(2).is_err());
    }
}
