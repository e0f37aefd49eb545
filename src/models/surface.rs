//! Monitored surfaces and chat identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two monitored message sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// The broadcast channel.
    Channel,
    /// The discussion chat mirroring the channel.
    Chat,
}

impl Surface {
    /// Returns both surfaces.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Channel, Self::Chat]
    }

    /// Returns the surface as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Chat => "chat",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Numeric chat identifier used to address sends and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The chat a message arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRef {
    /// Numeric chat id.
    pub id: ChatId,
    /// Public username, without the leading `@`.
    pub username: Option<String>,
}

impl ChatRef {
    /// Creates a chat reference.
    #[must_use]
    pub fn new(id: i64, username: Option<&str>) -> Self {
        Self {
            id: ChatId(id),
            username: username.map(|name| name.trim_start_matches('@').to_string()),
        }
    }
}

/// Configured identity of a monitored surface.
///
/// Parsed from `@username`, a bare username, or a numeric chat id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    /// Match by public username (case-insensitive).
    Username(String),
    /// Match by numeric chat id.
    Id(i64),
}

impl SurfaceId {
    /// Returns true if `chat` is this surface.
    #[must_use]
    pub fn matches(&self, chat: &ChatRef) -> bool {
        match self {
            Self::Id(id) => chat.id.0 == *id,
            Self::Username(name) => chat
                .username
                .as_deref()
                .is_some_and(|username| username.eq_ignore_ascii_case(name)),
        }
    }
}

impl FromStr for SurfaceId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<i64>() {
            return Ok(Self::Id(id));
        }
        let name = trimmed.trim_start_matches('@');
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(crate::Error::InvalidInput(format!(
                "invalid surface identity: {s:?}"
            )));
        }
        Ok(Self::Username(name.to_string()))
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(name) => write!(f, "@{name}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Identities of the two monitored surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceDirectory {
    /// The broadcast channel.
    pub channel: Option<SurfaceId>,
    /// The discussion chat.
    pub chat: Option<SurfaceId>,
}

impl SurfaceDirectory {
    /// Creates a directory for both surfaces.
    #[must_use]
    pub const fn new(channel: Option<SurfaceId>, chat: Option<SurfaceId>) -> Self {
        Self { channel, chat }
    }

    /// Classifies the chat a message arrived in.
    ///
    /// Returns `None` for traffic from any other chat. When both identities
    /// match the same chat, the chat surface wins.
    #[must_use]
    pub fn classify(&self, chat: &ChatRef) -> Option<Surface> {
        if self.chat.as_ref().is_some_and(|id| id.matches(chat)) {
            return Some(Surface::Chat);
        }
        if self.channel.as_ref().is_some_and(|id| id.matches(chat)) {
            return Some(Surface::Channel);
        }
        None
    }

    /// Returns true if no surface is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.channel.is_none() && self.chat.is_none()
    }
}
