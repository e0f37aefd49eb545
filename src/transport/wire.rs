//! Telegram Bot API wire types.
//!
//! Only the fields the bot reads are modelled; everything else in the JSON is
//! ignored.

use super::TransportError;
use crate::models::{
    Attachment, ChatRef, FileReference, LinkAnnotation, Message, MessageContent, MessageHandle,
    Sender,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Envelope around every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwraps the envelope into its result or an API error.
    pub fn into_result(self) -> Result<T, TransportError> {
        if !self.ok {
            return Err(TransportError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self
                    .description
                    .unwrap_or_else(|| "unknown Telegram API error".to_string()),
            });
        }
        self.result
            .ok_or_else(|| TransportError::MalformedResponse("missing result".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub channel_post: Option<WireMessage>,
}

impl Update {
    /// Returns the carried message, whether posted in a chat or a channel.
    pub fn into_message(self) -> Option<Message> {
        self.message
            .or(self.channel_post)
            .map(WireMessage::into_message)
    }
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub message_id: i64,
    #[serde(default)]
    pub date: i64,
    pub chat: WireChat,
    #[serde(default)]
    pub from: Option<WireUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<WireFile>>,
    #[serde(default)]
    pub video: Option<WireFile>,
    #[serde(default)]
    pub document: Option<WireFile>,
    #[serde(default)]
    pub entities: Vec<WireEntity>,
}

impl WireMessage {
    pub fn into_message(self) -> Message {
        let content = if let Some(sizes) = self.photo {
            MessageContent::Photo(sizes.into_iter().map(WireFile::into_attachment).collect())
        } else if let Some(video) = self.video {
            MessageContent::Video(video.into_attachment())
        } else if let Some(document) = self.document {
            MessageContent::Document(document.into_attachment())
        } else if let Some(text) = self.text {
            MessageContent::Text(text)
        } else {
            MessageContent::Empty
        };

        Message {
            chat: ChatRef::new(self.chat.id, self.chat.username.as_deref()),
            id: MessageHandle(self.message_id),
            date: DateTime::<Utc>::from_timestamp(self.date, 0).unwrap_or_default(),
            sender: self.from.map(|user| Sender {
                id: user.id,
                username: user.username,
            }),
            content,
            caption: self.caption,
            links: self
                .entities
                .into_iter()
                .filter_map(WireEntity::into_link)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireChat {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A photo size, video or document.
#[derive(Debug, Deserialize)]
pub struct WireFile {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl WireFile {
    fn into_attachment(self) -> Attachment {
        Attachment {
            file_reference: FileReference::new(self.file_id),
            stable_id: self.file_unique_id,
            size: self.file_size,
            file_name: self.file_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub url: Option<String>,
}

impl WireEntity {
    /// Converts `url` and `text_link` entities; other entity types are not links.
    fn into_link(self) -> Option<LinkAnnotation> {
        match self.kind.as_str() {
            "url" => Some(LinkAnnotation::span(self.offset, self.length)),
            "text_link" => Some(LinkAnnotation {
                offset: self.offset,
                length: self.length,
                url: self.url,
            }),
            _ => None,
        }
    }
}

/// Result of `getFile`.
#[derive(Debug, Deserialize)]
pub struct WireFileInfo {
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Result of `sendMessage`.
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}
