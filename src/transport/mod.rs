//! Messaging platform transport.
//!
//! The detection engine only needs three operations from the platform:
//! download a file's bytes, post a message, delete a message. They are split
//! across two traits so the resolver can depend on fetching alone.

mod telegram;
mod wire;

pub use telegram::{BotIdentity, DEFAULT_API_BASE, MAX_FILE_DOWNLOAD_BYTES, TelegramTransport};

use crate::models::{ChatId, FileReference, MessageHandle};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request itself failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The platform answered with an error.
    #[error("API error {code}: {description}")]
    Api {
        /// Platform error code.
        code: i64,
        /// Platform error description.
        description: String,
    },

    /// The file exceeds what the platform lets bots download.
    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge {
        /// Reported file size.
        size: u64,
        /// Download limit.
        limit: u64,
    },

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs embed the bot token.
        let err = err.without_url();
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Downloads the raw bytes behind a file reference.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches the content of `file`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the file cannot be downloaded.
    async fn fetch_content(&self, file: &FileReference) -> Result<Vec<u8>, TransportError>;
}

/// Posts and deletes messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Posts `text` to `chat`, returning the handle of the new message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the message cannot be sent.
    async fn send_message(&self, chat: ChatId, text: &str)
    -> Result<MessageHandle, TransportError>;

    /// Deletes `message` from `chat`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the message cannot be deleted.
    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageHandle,
    ) -> Result<(), TransportError>;
}

/// A full transport: fetches content and sends/deletes messages.
pub trait Transport: ContentFetcher + MessageSink {}

impl<T: ContentFetcher + MessageSink + ?Sized> Transport for T {}
