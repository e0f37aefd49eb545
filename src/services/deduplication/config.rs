//! Deduplication configuration.

use crate::{Error, Result};

/// Default number of fingerprints retained per surface.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default minimum normalized text length for text fingerprints.
///
/// Very short messages are more likely to repeat by coincidence.
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 30;

/// Configuration for the deduplication engine.
///
/// Environment overrides are applied by [`crate::config::RepostwatchConfig`],
/// which rejects unparsable values.
///
/// # Example
///
/// ```rust
/// use repostwatch::services::DeduplicationConfig;
///
/// let config = DeduplicationConfig::default().with_cache_capacity(500);
/// assert_eq!(config.cache_capacity, 500);
/// assert_eq!(config.min_text_length, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationConfig {
    /// Recency cache capacity, per surface.
    pub cache_capacity: usize,

    /// Minimum normalized text length.
    ///
    /// Text shorter than this is skipped rather than fingerprinted.
    pub min_text_length: usize,
}

impl DeduplicationConfig {
    /// Builder method to set the cache capacity.
    #[must_use]
    pub const fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Builder method to set the minimum text length.
    #[must_use]
    pub const fn with_min_text_length(mut self, length: usize) -> Self {
        self.min_text_length = length;
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::InvalidInput(
                "cache capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
        }
    }
}
