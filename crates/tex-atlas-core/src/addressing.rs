//! Content addressing: hash-derived file names and the incremental build cache.
//!
//! File names are a pure function of the payload bytes: the digest is BLAKE3 over
//! the payload only, never over the output path, so the same bytes map to the
//! same name in every build and on every machine.

use crate::model::ArtifactKind;
use std::collections::BTreeMap;

/// Lowercase hex BLAKE3 digest of `bytes` (64 characters).
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// `atlas.<digest>.<ext>`, with the digest truncated to `hash_length` when set.
pub fn artifact_file_name(kind: ArtifactKind, hash: &str, hash_length: Option<usize>) -> String {
    let digest = match hash_length {
        Some(n) if n < hash.len() => &hash[..n],
        _ => hash,
    };
    format!("atlas.{}.{}", digest, kind.extension())
}

/// Joins the configured output prefix and a file name.
///
/// An empty prefix yields the bare name; a prefix without a trailing `/` gets one.
pub fn join_output_path(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        file_name.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{file_name}")
    } else {
        format!("{prefix}/{file_name}")
    }
}

/// Identifies one output position: the image or metadata file of a given bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactSlot {
    pub bin: usize,
    pub kind: ArtifactKind,
}

/// Remembers the hash last emitted for every artifact slot.
///
/// Lives as long as the session that owns it. It is only replaced after a build
/// has fully succeeded, so a failed build never leaves it half-updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildState {
    emitted: BTreeMap<ArtifactSlot, String>,
}

impl BuildState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `slot` was last emitted with exactly this hash.
    pub fn is_unchanged(&self, slot: ArtifactSlot, hash: &str) -> bool {
        self.emitted.get(&slot).is_some_and(|h| h == hash)
    }

    pub fn last_hash(&self, slot: ArtifactSlot) -> Option<&str> {
        self.emitted.get(&slot).map(String::as_str)
    }

    /// Replace the remembered hashes with the slots of a completed build.
    ///
    /// Slots absent from `slots` (e.g. a bin that no longer exists) are forgotten.
    pub fn commit(&mut self, slots: impl IntoIterator<Item = (ArtifactSlot, String)>) {
        self.emitted = slots.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }
}
