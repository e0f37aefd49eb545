//! Content hashing for fingerprints.
//!
//! Every fingerprint except a raw URL is a lowercase hex SHA-256 digest.

use sha2::{Digest, Sha256};

/// SHA-256 hasher producing fingerprint digests.
///
/// # Example
///
/// ```rust
/// use repostwatch::services::deduplication::ContentHasher;
///
/// let hash = ContentHasher::hash_str("meetup moves to thursday at 7pm");
/// assert_eq!(hash.len(), 64); // SHA256 produces 64 hex chars
/// assert_eq!(hash, ContentHasher::hash_bytes(b"meetup moves to thursday at 7pm"));
/// ```
pub struct ContentHasher;

impl ContentHasher {
    /// Hashes a string. The input is hashed as-is; normalize first if needed.
    #[must_use]
    pub fn hash_str(content: &str) -> String {
        Self::hash_bytes(content.as_bytes())
    }

    /// Hashes raw bytes, e.g. a downloaded file.
    #[must_use]
    pub fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Hashes pipe-delimited parts.
    ///
    /// ```rust
    /// use repostwatch::services::deduplication::ContentHasher;
    ///
    /// assert_eq!(
    ///     ContentHasher::hash_parts(&["photo", "1024", "AQADx"]),
    ///     ContentHasher::hash_str("photo|1024|AQADx"),
    /// );
    /// ```
    #[must_use]
    pub fn hash_parts<S: AsRef<str>>(parts: &[S]) -> String {
        let mut hasher = Sha256::new();
        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                hasher.update(b"|");
            }
            hasher.update(part.as_ref().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
