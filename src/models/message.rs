//! Inbound message types.

use super::surface::ChatRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-delivery file handle used to download an attachment.
///
/// The platform issues a new handle every time the same file is forwarded,
/// so it must never be used as a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileReference(String);

impl FileReference {
    /// Creates a new file reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a message on its surface, as returned by a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub i64);

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media attachment, in fingerprint precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Photo (one or more size variants).
    Photo,
    /// Video.
    Video,
    /// Generic document.
    Document,
}

impl MediaKind {
    /// Returns the tag used in metadata keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single media attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Per-delivery download handle.
    pub file_reference: FileReference,
    /// Platform-assigned identifier that is stable across forwards.
    pub stable_id: String,
    /// Size in bytes, when the platform reports it.
    pub size: Option<u64>,
    /// Original filename (videos and documents only).
    pub file_name: Option<String>,
}

impl Attachment {
    /// Creates an attachment without size or filename.
    #[must_use]
    pub fn new(file_reference: impl Into<String>, stable_id: impl Into<String>) -> Self {
        Self {
            file_reference: FileReference::new(file_reference),
            stable_id: stable_id.into(),
            size: None,
            file_name: None,
        }
    }

    /// Sets the byte size.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the filename.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// The discriminated content payload of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Photo, delivered as several size variants of the same image.
    Photo(Vec<Attachment>),
    /// Video.
    Video(Attachment),
    /// Generic document.
    Document(Attachment),
    /// Anything else (stickers, service messages, deleted content).
    Empty,
}

impl MessageContent {
    /// Returns the message text, if the payload is text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the governing media attachment and its kind.
    ///
    /// For photos the largest size variant is chosen; variants without a
    /// reported size rank lowest. An empty photo list yields `None`.
    #[must_use]
    pub fn media(&self) -> Option<(MediaKind, &Attachment)> {
        match self {
            Self::Photo(variants) => variants
                .iter()
                .enumerate()
                .max_by_key(|(index, variant)| (variant.size.unwrap_or(0), *index))
                .map(|(_, largest)| (MediaKind::Photo, largest)),
            Self::Video(video) => Some((MediaKind::Video, video)),
            Self::Document(document) => Some((MediaKind::Document, document)),
            Self::Text(_) | Self::Empty => None,
        }
    }
}

/// An inline link annotation.
///
/// `offset` and `length` are in UTF-16 code units. `url` is set when the
/// annotation carries an explicit target (a text link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAnnotation {
    /// Start of the span in UTF-16 code units.
    pub offset: usize,
    /// Length of the span in UTF-16 code units.
    pub length: usize,
    /// Explicit URL, when present.
    pub url: Option<String>,
}

impl LinkAnnotation {
    /// Creates a span annotation whose URL is the covered text.
    #[must_use]
    pub const fn span(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            url: None,
        }
    }

    /// Creates an annotation with an explicit URL.
    #[must_use]
    pub fn explicit(offset: usize, length: usize, url: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            url: Some(url.into()),
        }
    }

    /// Resolves the URL this annotation points at.
    ///
    /// Returns `None` when there is no explicit URL and the span does not
    /// fall on valid boundaries of `text`.
    #[must_use]
    pub fn resolve(&self, text: Option<&str>) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|url| !url.is_empty()) {
            return Some(url.to_string());
        }
        let text = text?;
        let units: Vec<u16> = text.encode_utf16().collect();
        let end = self.offset.checked_add(self.length)?;
        let slice = units.get(self.offset..end)?;
        String::from_utf16(slice).ok().filter(|url| !url.is_empty())
    }
}

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Numeric user id.
    pub id: i64,
    /// Username, if the user has one.
    pub username: Option<String>,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (ID: {})",
            self.username.as_deref().unwrap_or("No username"),
            self.id
        )
    }
}

/// An inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The chat the message arrived in.
    pub chat: ChatRef,
    /// Numeric message id within the chat.
    pub id: MessageHandle,
    /// When the message was sent.
    pub date: DateTime<Utc>,
    /// The author, when known.
    pub sender: Option<Sender>,
    /// Content payload.
    pub content: MessageContent,
    /// Caption attached to media.
    pub caption: Option<String>,
    /// Link annotations over the text, in document order.
    pub links: Vec<LinkAnnotation>,
}

impl Message {
    /// Creates a message with the given content and no sender, caption or links.
    #[must_use]
    pub fn new(chat: ChatRef, id: i64, content: MessageContent) -> Self {
        Self {
            chat,
            id: MessageHandle(id),
            date: DateTime::<Utc>::UNIX_EPOCH,
            sender: None,
            content,
            caption: None,
            links: Vec::new(),
        }
    }

    /// Creates a text message.
    #[must_use]
    pub fn text(chat: ChatRef, id: i64, text: impl Into<String>) -> Self {
        Self::new(chat, id, MessageContent::Text(text.into()))
    }

    /// Sets the caption.
    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Appends a link annotation.
    #[must_use]
    pub fn with_link(mut self, link: LinkAnnotation) -> Self {
        self.links.push(link);
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the date.
    #[must_use]
    pub const fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_largest_photo_variant_wins() {
        let content = MessageContent::Photo(vec![
            Attachment::new("small", "u-small").with_size(1_000),
            Attachment::new("large", "u-large").with_size(90_000),
            Attachment::new("medium", "u-medium").with_size(12_000),
        ]);

        let (kind, attachment) = content.media().unwrap();
        assert_eq!(kind, MediaKind::Photo);
        assert_eq!(attachment.stable_id, "u-large");
    }

    #[test]
    fn test_photo_without_sizes_takes_last_variant() {
        let content = MessageContent::Photo(vec![
            Attachment::new("a", "u-a"),
            Attachment::new("b", "u-b"),
        ]);
        assert_eq!(content.media().unwrap().1.stable_id, "u-b");
    }

    #[test]
    fn test_empty_photo_list_has_no_media() {
        assert!(MessageContent::Photo(Vec::new()).media().is_none());
        assert!(MessageContent::Empty.media().is_none());
        assert!(MessageContent::Text("hi".into()).media().is_none());
    }

    #[test]
    fn test_link_explicit_url_is_verbatim() {
        let link = LinkAnnotation::explicit(0, 4, "https://example.com/x");
        assert_eq!(
            link.resolve(Some("here and more")).as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn test_link_span_slices_text() {
        let text = "see https://example.com/a now";
        let link = LinkAnnotation::span(4, 21);
        assert_eq!(link.resolve(Some(text)).as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn test_link_span_counts_utf16_units() {
        // The emoji occupies two UTF-16 code units.
        let text = "🔥 https://x.io";
        let link = LinkAnnotation::span(3, 12);
        assert_eq!(link.resolve(Some(text)).as_deref(), Some("https://x.io"));
    }

    #[test]
    fn test_link_span_out_of_range() {
        let link = LinkAnnotation::span(10, 50);
        assert!(link.resolve(Some("short")).is_none());
        assert!(link.resolve(None).is_none());
        assert!(LinkAnnotation::span(usize::MAX, 2).resolve(Some("x")).is_none());
    }

    #[test]
    fn test_sender_display() {
        let named = Sender {
            id: 7,
            username: Some("alice".into()),
        };
        assert_eq!(named.to_string(), "alice (ID: 7)");

        let anonymous = Sender { id: 8, username: None };
        assert_eq!(anonymous.to_string(), "No username (ID: 8)");
    }
}
