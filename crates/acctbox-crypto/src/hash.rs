//! SHA-256 digests and constant-time digest comparison.
//!
//! Record hashes (`own_hash`, `prev`) and the visible-hash binding all
//! use SHA-256. Comparisons against attacker-influenced digests go
//! through [`hashes_equal`].

use acctbox_types::Hash;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Computes the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    Hash::new(out)
}

/// Compares two digests in constant time.
pub fn hashes_equal(a: &Hash, b: &Hash) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
