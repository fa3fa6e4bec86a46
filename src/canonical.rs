//! Canonical serialization for deterministic fingerprints.
//!
//! Used to fingerprint graph snapshots and configuration so two runs (or a
//! graph before and after a read-only call) can be compared by digest.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap/BTreeSet for maps and sets in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes, reporting values JSON cannot
/// represent (e.g. a map with non-string keys).
pub fn try_to_canonical_bytes<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(value)
}

/// Hex xxh64 digest of the canonical bytes of `value`, if it serializes.
pub fn try_canonical_hash_hex<T: Serialize>(value: &T) -> serde_json::Result<String> {
    try_to_canonical_bytes(value).map(|bytes| format!("{:016x}", xxh64(&bytes, 0)))
}

/// Serialize a value to canonical JSON bytes for hashing.
///
/// # Panics
///
/// Panics if `value` cannot be represented as JSON. Every type this crate
/// hashes itself serializes cleanly; use [`try_to_canonical_bytes`] for
/// caller-supplied metadata.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    try_to_canonical_bytes(value).expect("Canonical serialization failed")
}

/// xxh64 digest of the canonical bytes of `value`.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// [`canonical_hash`] as a zero-padded hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
