//! # Repostwatch
//!
//! Duplicate-post detection for a Telegram broadcast channel and the
//! discussion chat that mirrors it.
//!
//! Every inbound message is fingerprinted (media metadata, first link, or
//! normalized text) and checked against a bounded, insertion-ordered recency
//! cache kept separately for each surface. Media whose cheap metadata key
//! collides is downloaded and hashed before it can be called a duplicate.
//! What happens to a duplicate depends on the configured [`ActionMode`].
//!
//! ## Features
//!
//! - Forward-only, in-memory detection (nothing is persisted)
//! - Two-tier media confirmation: metadata key first, content hash only on collision
//! - Race-free contains-then-insert per surface under true parallelism
//! - Watch / Warn / Delete enforcement with self-deleting notices
//!
//! ## Example
//!
//! ```rust,ignore
//! use repostwatch::services::{DeduplicationConfig, DeduplicationService};
//!
//! let service = DeduplicationService::new(surfaces, &DeduplicationConfig::default(), fetcher)?;
//! let outcome = service.resolve(&message).await;
//! if outcome.is_duplicate() {
//!     tracing::info!("repost detected");
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod transport;

pub use config::RepostwatchConfig;
pub use models::{
    ActionMode, Attachment, ChatId, ChatRef, FileReference, LinkAnnotation, MediaKind, Message,
    MessageContent, MessageHandle, Sender, Surface, SurfaceId,
};
pub use services::{
    ActionExecutor, ActionPolicy, DeduplicationConfig, DeduplicationService, Effect, Outcome,
    Verdict, Watcher,
};
pub use transport::{ContentFetcher, MessageSink, TelegramTransport, Transport, TransportError};

/// Error type for repostwatch operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing token or surfaces, zero cache capacity, unparsable mode |
/// | `OperationFailed` | Config file I/O, log file creation, metrics exporter install |
/// | `Transport` | A Bot API call failed outside the per-message pipeline (startup, polling) |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The messaging transport reported an error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type alias for repostwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::from(TransportError::Api {
            code: 400,
            description: "Bad Request: message to delete not found".to_string(),
        });
        assert!(err.to_string().contains("message to delete not found"));
    }
}
