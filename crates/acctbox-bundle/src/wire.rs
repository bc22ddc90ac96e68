//! Wire record exchanged with the storage server.

use std::collections::BTreeMap;

use acctbox_types::{AccountId, AcctboxError, Result};
use serde::{Deserialize, Serialize};

use crate::codec::Envelope;
use crate::version::{AccountBundleVersion, BundleVersion};

// ---------------------------------------------------------------------------
// WireRecord
// ---------------------------------------------------------------------------

/// All-base64 form of a boxed bundle, as posted to and fetched from the
/// server.
///
/// Field names are part of the storage API and must not change.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Base64 of the canonical parent [`Envelope`].
    pub encrypted_parent: String,
    /// Base64 of the canonical visible parent.
    pub visible_parent: String,
    /// Parent format version tag.
    pub version_parent: u32,
    /// Base64 account envelopes keyed by account id.
    #[serde(default)]
    pub account_bundles: BTreeMap<AccountId, String>,
}

impl WireRecord {
    /// Serializes the record as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::EncodingError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AcctboxError::EncodingError {
            reason: format!("failed to serialize wire record: {e}"),
        })
    }

    /// Parses a JSON wire record.
    ///
    /// # Errors
    ///
    /// Returns [`AcctboxError::EncodingError`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AcctboxError::EncodingError {
            reason: format!("failed to parse wire record: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// BoxedEncoded
// ---------------------------------------------------------------------------

/// One sealed and encoded account record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AcctBoxedEncoded {
    /// Base64 of the canonical account [`Envelope`].
    pub enc_b64: String,
    /// Format version of the sealed payload.
    pub format_version: AccountBundleVersion,
}

/// Result of boxing a bundle, before projection to the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BoxedEncoded {
    /// The sealed parent envelope.
    pub enc_parent: Envelope,
    /// Base64 of `enc_parent`.
    pub enc_parent_b64: String,
    /// Base64 of the canonical visible parent.
    pub vis_parent_b64: String,
    /// Format version of the parent payloads.
    pub format_version_parent: BundleVersion,
    /// Sealed account records keyed by account id.
    pub acct_bundles: BTreeMap<AccountId, AcctBoxedEncoded>,
}

impl BoxedEncoded {
    /// Projects the boxed bundle onto the wire record.
    pub fn to_wire(&self) -> WireRecord {
        WireRecord {
            encrypted_parent: self.enc_parent_b64.clone(),
            visible_parent: self.vis_parent_b64.clone(),
            version_parent: self.format_version_parent.as_u32(),
            account_bundles: self
                .acct_bundles
                .iter()
                .map(|(id, acct)| (id.clone(), acct.enc_b64.clone()))
                .collect(),
        }
    }
}
