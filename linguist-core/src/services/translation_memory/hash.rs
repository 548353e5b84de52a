use sha2::{Digest, Sha256};

/// Hex SHA-256 of an already normalized source string.
pub fn hash_norm(norm: &str) -> String {
    hex::encode(Sha256::digest(norm.as_bytes()))
}
