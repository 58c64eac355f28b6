//! SHA-256 fingerprints
//!
//! Every checksum produced in the workspace uses the canonical `sha256:<hex>`
//! form so fingerprints from different sources compare as plain strings.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of raw bytes.
pub fn compute_bytes_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of string content.
pub fn compute_content_checksum(content: &str) -> String {
    compute_bytes_checksum(content.as_bytes())
}

/// Compute the checksum of a value's compact JSON encoding.
///
/// Struct fields serialize in declaration order and `BTreeMap` keys in
/// sorted order, so equal values always produce equal fingerprints.
pub fn compute_json_checksum<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let encoded = serde_json::to_vec(value)?;
    Ok(compute_bytes_checksum(&encoded))
}
