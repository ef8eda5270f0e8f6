//! Content fingerprints for exact-duplicate detection.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// SHA-256 digest of an image payload.
///
/// Depends on the payload bytes only; format tag and dimensions never participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of a byte slice.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Fingerprints already accepted during one pass.
///
/// Only grows; a new set is created for each pass.
#[derive(Debug, Default)]
pub struct SeenSet {
    seen: HashSet<Fingerprint>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fingerprint, returning `false` if it was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }
}

#[cfg(test)]
impl SeenSet {
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_hex() {
        let fingerprint = Fingerprint::of(b"hello world");
        // SHA-256 of "hello world"
        assert_eq!(
            fingerprint.to_string(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let content = vec![0x5au8; 4096];
        assert_eq!(Fingerprint::of(&content), Fingerprint::of(&content));
    }

    #[test]
    fn test_single_byte_mutation_changes_fingerprint() {
        let original = vec![7u8; 25 * 1024];
        let mut mutated = original.clone();
        mutated[12_345] ^= 0x01;

        assert_ne!(Fingerprint::of(&original), Fingerprint::of(&mutated));
    }

    #[test]
    fn test_seen_set_only_grows() {
        let mut seen = SeenSet::new();
        let a = Fingerprint::of(b"a");

        assert!(seen.is_empty());
        assert!(seen.insert(a));
        assert!(!seen.insert(a));
        assert!(seen.contains(&a));
        assert_eq!(seen.len(), 1);
    }
}
