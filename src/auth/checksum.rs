use sha2::{Digest, Sha256};

/// Proof of shared-secret possession sent with a token request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub timestamp: i64,
    pub digest: String,
}

impl Checksum {
    pub fn at(secret: &str, timestamp: i64) -> Self {
        Self {
            timestamp,
            digest: generate_checksum(secret, &timestamp.to_string()),
        }
    }
}

/// Lowercase hex SHA-256 of `secret + timestamp` (always 64 chars)
pub fn generate_checksum(secret: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(timestamp.as_bytes());
    format!("{:x}", hasher.finalize())
}
