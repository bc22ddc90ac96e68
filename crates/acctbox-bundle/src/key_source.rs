//! Per-user key lookup by generation.

use std::collections::BTreeMap;

use acctbox_crypto::kdf::KeySeed;
use acctbox_types::{AcctboxError, KeyGeneration, Result};

/// Supplies the per-user key seed for a given key generation.
///
/// Implementations may block (for example, on a keyring fetch). A
/// generation the source does not know must fail with
/// [`AcctboxError::KeyNotFound`] so callers can refresh and retry.
pub trait KeySource {
    /// Returns the seed for `generation`.
    fn seed_for(&self, generation: KeyGeneration) -> Result<KeySeed>;
}

impl<T: KeySource + ?Sized> KeySource for &T {
    fn seed_for(&self, generation: KeyGeneration) -> Result<KeySeed> {
        (**self).seed_for(generation)
    }
}

/// In-memory key source holding a fixed set of generations.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeySource {
    seeds: BTreeMap<KeyGeneration, KeySeed>,
}

impl MemoryKeySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the seed for `generation`.
    pub fn insert(&mut self, generation: KeyGeneration, seed: KeySeed) {
        self.seeds.insert(generation, seed);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_seed(mut self, generation: KeyGeneration, seed: KeySeed) -> Self {
        self.insert(generation, seed);
        self
    }

    /// Removes a generation, returning whether it was present.
    pub fn remove(&mut self, generation: KeyGeneration) -> bool {
        self.seeds.remove(&generation).is_some()
    }

    /// Returns the highest known generation.
    pub fn latest_generation(&self) -> Option<KeyGeneration> {
        self.seeds.keys().next_back().copied()
    }
}

impl KeySource for MemoryKeySource {
    fn seed_for(&self, generation: KeyGeneration) -> Result<KeySeed> {
        self.seeds
            .get(&generation)
            .cloned()
            .ok_or(AcctboxError::KeyNotFound {
                generation: generation.value(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_generation_resolves() -> std::result::Result<(), AcctboxError> {
        let source = MemoryKeySource::new()
            .with_seed(KeyGeneration::new(1), KeySeed::from_bytes([1; 32]))
            .with_seed(KeyGeneration::new(2), KeySeed::from_bytes([2; 32]));

        assert_eq!(source.seed_for(KeyGeneration::new(2))?.as_bytes(), &[2; 32]);
        assert_eq!(source.latest_generation(), Some(KeyGeneration::new(2)));
        Ok(())
    }

    #[test]
    fn unknown_generation_is_key_not_found() {
        let source = MemoryKeySource::new();
        let err = source.seed_for(KeyGeneration::new(5)).err();
        assert!(matches!(err, Some(AcctboxError::KeyNotFound { generation: 5 })));
        assert!(err.is_some_and(|e| e.is_retryable()));
    }

    #[test]
    fn removed_generation_is_gone() {
        let mut source = MemoryKeySource::new().with_seed(KeyGeneration::new(1), KeySeed::from_bytes([1; 32]));
        assert!(source.remove(KeyGeneration::new(1)));
        assert!(source.seed_for(KeyGeneration::new(1)).is_err());
        assert_eq!(source.latest_generation(), None);
    }
}
