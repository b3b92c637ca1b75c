//! Store key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Key for a request identity.
///
/// Hash of the upper-cased method and the URL exactly as requested. Only GET
/// is ever stored, but the method stays part of the identity.
pub fn resource_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());

    format!("{:x}", hasher.finalize())
}

/// File name stem for a spilled body.
///
/// The same key may exist in both partitions, so the partition is mixed in.
pub fn blob_key(partition: &str, key: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(partition.as_bytes());
    hasher.update(b"|");
    hasher.update(key.as_bytes());

    format!("{:x}", hasher.finalize())
}
