//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates` for inbound traffic and implements
//! [`ContentFetcher`] and [`MessageSink`] over the HTTP API.
//!
//! # Error Handling
//!
//! - Poll errors: logged, then retried after a back-off (longer for network
//!   errors than for a polling conflict)
//! - Send, delete and download errors: returned to the caller, never retried
//!
//! The bot token is part of every request URL, so URLs are stripped from
//! HTTP errors before they are logged or returned.

use super::wire::{ApiResponse, SentMessage, Update, WireFileInfo, WireUser};
use super::{ContentFetcher, MessageSink, TransportError};
use crate::models::{ChatId, FileReference, Message, MessageHandle};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Largest file the Bot API lets a bot download (20 MB).
pub const MAX_FILE_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Long-poll timeout passed to `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Back-off after a network or parse error while polling.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Back-off after a 409 conflict (another poller on the same token).
const POLL_CONFLICT_BACKOFF: Duration = Duration::from_secs(2);

/// The bot's own account, as reported by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// Numeric user id.
    pub id: i64,
    /// Display name.
    pub first_name: String,
    /// Bot username, without `@`.
    pub username: Option<String>,
    /// Always true for a bot token.
    pub is_bot: bool,
}

impl From<WireUser> for BotIdentity {
    fn from(user: WireUser) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            username: user.username,
            is_bot: user.is_bot,
        }
    }
}

impl fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "@{username} (ID: {})", self.id),
            None => write!(f, "{} (ID: {})", self.first_name, self.id),
        }
    }
}

/// Telegram transport over the HTTP Bot API.
pub struct TelegramTransport {
    /// Bot token.
    token: SecretString,
    /// Shared HTTP client with connection pooling.
    client: reqwest::Client,
    /// Base URL, overridable for local Bot API servers.
    api_base: String,
    /// Download size limit.
    max_file_bytes: u64,
}

impl TelegramTransport {
    /// Creates a transport for `token` against the public Bot API.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] if the HTTP client cannot be built.
    pub fn new(token: SecretString) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 15))
            .user_agent(concat!("repostwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            token,
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            max_file_bytes: MAX_FILE_DOWNLOAD_BYTES,
        })
    }

    /// Overrides the Bot API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the download size limit.
    #[must_use]
    pub const fn with_max_file_bytes(mut self, limit: u64) -> Self {
        self.max_file_bytes = limit;
        self
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token.expose_secret())
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{file_path}",
            self.api_base,
            self.token.expose_secret()
        )
    }

    /// Calls a Bot API method with a JSON body and unwraps the envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(TransportError::Api {
                code: i64::from(status.as_u16()),
                description: status.to_string(),
            }),
            Err(e) => Err(TransportError::MalformedResponse(format!("{method}: {e}"))),
        }
    }

    /// Returns the bot's own identity.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the call fails or the token is rejected.
    pub async fn get_me(&self) -> Result<BotIdentity, TransportError> {
        let user: WireUser = self.call("getMe", &serde_json::json!({})).await?;
        Ok(user.into())
    }

    /// Fetches one batch of updates starting at `offset`.
    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "channel_post"]
        });
        self.call("getUpdates", &body).await
    }

    /// Long-polls for updates and forwards every carried message to `tx`.
    ///
    /// Runs until the receiving side of `tx` is dropped. Errors are logged
    /// and retried after a back-off; they never end the loop.
    pub async fn poll(&self, tx: mpsc::Sender<Message>) {
        let mut offset: i64 = 0;
        tracing::info!("Listening for Telegram updates");

        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(TransportError::Api { code: 409, description }) => {
                    tracing::warn!(
                        description = %description,
                        "Polling conflict, is another process using this bot token?"
                    );
                    tokio::time::sleep(POLL_CONFLICT_BACKOFF).await;
                    continue;
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram poll error");
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    continue;
                },
            };

            for update in updates {
                // Advance past this update whether or not it carries a message.
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.into_message() else {
                    continue;
                };
                if tx.send(message).await.is_err() {
                    tracing::debug!("Message receiver closed, stopping poll loop");
                    return;
                }
            }
        }
    }
}

impl fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("api_base", &self.api_base)
            .field("max_file_bytes", &self.max_file_bytes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentFetcher for TelegramTransport {
    async fn fetch_content(&self, file: &FileReference) -> Result<Vec<u8>, TransportError> {
        let info: WireFileInfo = self
            .call("getFile", &serde_json::json!({ "file_id": file.as_str() }))
            .await?;

        if let Some(size) = info.file_size.filter(|size| *size > self.max_file_bytes) {
            return Err(TransportError::FileTooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }

        let file_path = info.file_path.ok_or_else(|| {
            TransportError::MalformedResponse("getFile: missing file_path".to_string())
        })?;

        let response = self.client.get(self.file_url(&file_path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api {
                code: i64::from(status.as_u16()),
                description: format!("file download failed: {status}"),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl MessageSink for TelegramTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
    ) -> Result<MessageHandle, TransportError> {
        let body = serde_json::json!({
            "chat_id": chat.0,
            "text": text,
            "parse_mode": "Markdown"
        });
        let sent: SentMessage = self.call("sendMessage", &body).await?;
        Ok(MessageHandle(sent.message_id))
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageHandle,
    ) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "chat_id": chat.0,
            "message_id": message.0
        });
        let deleted: bool = self.call("deleteMessage", &body).await?;
        if deleted {
            Ok(())
        } else {
            Err(TransportError::Api {
                code: 0,
                description: "deleteMessage returned false".to_string(),
            })
        }
    }
}
