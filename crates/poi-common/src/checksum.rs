//! Checksum utilities for content hashing

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of an in-memory buffer
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
