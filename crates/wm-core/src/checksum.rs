//! SHA-256 helpers for drift detection and advisory lock ids.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 checksum of a string as lower-case hex.
///
/// Only used for equality comparison between a step's current SQL and the
/// SQL recorded in the journal. Stable across runs and platforms because it
/// hashes the UTF-8 bytes directly.
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Derive a 64-bit advisory lock id from a configured lock key.
///
/// The first eight bytes of the key's SHA-256 digest are read as a
/// big-endian `i64`. Distinct keys collide only with negligible probability.
pub fn advisory_lock_key(key: &str) -> i64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}
