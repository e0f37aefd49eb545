//! Deduplication result types.
//!
//! [`FingerprintPlan`] is produced by one pure classification step and
//! consumed by the resolver; [`Outcome`] and [`Verdict`] describe what the
//! resolver decided.

use crate::models::{FileReference, MediaKind, Surface};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Cache key representing a message's dedup-relevant content.
///
/// Either a lowercase hex SHA-256 digest or a raw URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for Fingerprint {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Fingerprinting plan for a media message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlan {
    /// Which attachment governs the plan.
    pub kind: MediaKind,
    /// Hash of kind, size, stable id, filename and caption.
    pub metadata_key: Fingerprint,
    /// Set once the metadata key has collided and the content must be fetched.
    pub needs_content_fetch: bool,
    /// Download handle for the double-check.
    pub file_reference: FileReference,
}

impl MediaPlan {
    /// Marks the plan as requiring a content fetch.
    #[must_use]
    pub const fn requiring_content_fetch(mut self) -> Self {
        self.needs_content_fetch = true;
        self
    }
}

/// Why a message was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No text, or nothing left after normalization.
    NoText,
    /// Normalized text is shorter than the configured minimum.
    TooShort {
        /// Normalized length.
        length: usize,
        /// Configured minimum.
        minimum: usize,
    },
    /// The text is one of this bot's own notices.
    OwnNotice,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoText => write!(f, "no_text"),
            Self::TooShort { length, minimum } => write!(f, "too_short({length}<{minimum})"),
            Self::OwnNotice => write!(f, "own_notice"),
        }
    }
}

/// Which content dimension governs dedup for a message.
///
/// Precedence: media > URL > text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintPlan {
    /// A media attachment is present.
    Media(MediaPlan),
    /// No media; the first link annotation is authoritative.
    Url {
        /// The URL, verbatim.
        key: Fingerprint,
    },
    /// Neither media nor links; hash of the normalized text.
    Text {
        /// SHA-256 of the normalized text.
        key: Fingerprint,
    },
    /// Not evaluated.
    Skip {
        /// Why.
        reason: SkipReason,
    },
}

/// The kind of key that decided a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// First-tier media key (metadata only).
    MediaMetadata,
    /// Second-tier media key (hash of the downloaded bytes).
    MediaContent,
    /// Raw URL.
    Url,
    /// Hash of normalized text.
    Text,
}

impl KeyKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MediaMetadata => "media_metadata",
            Self::MediaContent => "media_content",
            Self::Url => "url",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of the media double-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCheck {
    /// Metadata key was new; nothing was downloaded.
    NotNeeded,
    /// Content was downloaded and hashed.
    Completed,
    /// The fetch failed; the message is treated as original.
    Failed,
}

/// Final decision for an evaluated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the message repeats recently seen content.
    pub is_duplicate: bool,
    /// Which key decided.
    pub kind: KeyKind,
    /// The deciding key.
    pub key: Fingerprint,
    /// Double-check status; `None` for non-media messages.
    pub content_check: Option<ContentCheck>,
}

impl Verdict {
    /// Creates a verdict for a URL or text key.
    #[must_use]
    pub const fn direct(is_duplicate: bool, kind: KeyKind, key: Fingerprint) -> Self {
        Self {
            is_duplicate,
            kind,
            key,
            content_check: None,
        }
    }

    /// Creates a media verdict.
    #[must_use]
    pub const fn media(
        is_duplicate: bool,
        kind: KeyKind,
        key: Fingerprint,
        content_check: ContentCheck,
    ) -> Self {
        Self {
            is_duplicate,
            kind,
            key,
            content_check: Some(content_check),
        }
    }
}

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not from a monitored surface.
    Dropped,
    /// From a monitored surface but not evaluated.
    Skipped {
        /// The surface.
        surface: Surface,
        /// Why.
        reason: SkipReason,
    },
    /// Evaluated against the surface cache.
    Evaluated {
        /// The surface.
        surface: Surface,
        /// The decision.
        verdict: Verdict,
    },
}

impl Outcome {
    /// Returns true if the message was evaluated and found to be a duplicate.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Evaluated { verdict, .. } if verdict.is_duplicate)
    }

    /// Returns the verdict, if the message was evaluated.
    #[must_use]
    pub const fn verdict(&self) -> Option<&Verdict> {
        match self {
            Self::Evaluated { verdict, .. } => Some(verdict),
            Self::Dropped | Self::Skipped { .. } => None,
        }
    }

    /// Returns the surface, unless the message was dropped.
    #[must_use]
    pub const fn surface(&self) -> Option<Surface> {
        match self {
            Self::Dropped => None,
            Self::Skipped { surface, .. } | Self::Evaluated { surface, .. } => Some(*surface),
        }
    }

    /// Returns a short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Dropped => "dropped",
            Self::Skipped { .. } => "skipped",
            Self::Evaluated { verdict, .. } if verdict.is_duplicate => "duplicate",
            Self::Evaluated { .. } => "original",
        }
    }
}
