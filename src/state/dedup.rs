use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Hex-encoded SHA-256 digest of icon bytes
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Process-wide index of icon content hashes seen during a run
///
/// Detects byte-identical icons shared by different targets (typically a generic
/// fallback image). It only annotates; it never prevents a save.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    /// hash -> target ids in observation order
    seen: HashMap<String, Vec<String>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `target_id` produced `hash`
    ///
    /// Returns the first target that produced the same hash earlier in the run,
    /// or `None` if this hash is new. Observing the same target twice is a no-op.
    pub fn observe(&mut self, hash: &str, target_id: &str) -> Option<String> {
        let owners = self.seen.entry(hash.to_string()).or_default();
        let first = owners.first().filter(|first| *first != target_id).cloned();
        if !owners.iter().any(|id| id == target_id) {
            owners.push(target_id.to_string());
        }
        first
    }

    /// Number of distinct hashes seen
    pub fn unique_hashes(&self) -> usize {
        self.seen.len()
    }

    /// Hashes shared by two or more targets, sorted by hash for stable output
    pub fn duplicate_groups(&self) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = self
            .seen
            .iter()
            .filter(|(_, owners)| owners.len() > 1)
            .map(|(hash, owners)| (hash.clone(), owners.clone()))
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
    }
}
