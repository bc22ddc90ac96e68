//! Encode/decode resource limits.
//!
//! The storage server controls every byte of a wire record, so decoding
//! enforces upper bounds before allocating or decrypting anything.

use serde::{Deserialize, Serialize};

use crate::{AcctboxError, Result};

/// Upper bound for `max_encoded_len`: 16 MiB.
const MAX_ENCODED_LEN_CEILING: usize = 16 * 1024 * 1024;

/// Limits applied when boxing and unboxing bundles.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Maximum number of account entries in one bundle.
    pub max_accounts: usize,

    /// Maximum number of signers per account.
    ///
    /// The current protocol populates exactly one.
    pub max_signers: usize,

    /// Maximum length in bytes of any base64 field of a wire record.
    pub max_encoded_len: usize,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            max_accounts: 64,
            max_signers: 1,
            max_encoded_len: 1024 * 1024,
        }
    }
}

impl BundleConfig {
    /// Validates all configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.max_accounts == 0 {
            return Err(AcctboxError::ConfigError {
                reason: "max_accounts must be greater than 0".into(),
            });
        }

        if self.max_signers == 0 {
            return Err(AcctboxError::ConfigError {
                reason: "max_signers must be greater than 0".into(),
            });
        }

        if self.max_encoded_len == 0 || self.max_encoded_len > MAX_ENCODED_LEN_CEILING {
            return Err(AcctboxError::ConfigError {
                reason: format!("max_encoded_len must be 1..={MAX_ENCODED_LEN_CEILING}"),
            });
        }

        Ok(())
    }
}
