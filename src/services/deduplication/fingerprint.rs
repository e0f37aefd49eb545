//! Fingerprint derivation.
//!
//! Decides which content dimension governs dedup for a message and derives
//! its primary key. Pure: no I/O, no cache access.

use super::hasher::ContentHasher;
use super::normalizer::TextNormalizer;
use super::types::{Fingerprint, FingerprintPlan, MediaPlan, SkipReason};
use crate::models::{Attachment, MediaKind, Message};

/// Derives [`FingerprintPlan`]s from messages.
///
/// # Precedence
///
/// image > video > document > first link annotation > normalized text.
///
/// # Example
///
/// ```rust
/// use repostwatch::models::{ChatRef, LinkAnnotation, Message};
/// use repostwatch::services::deduplication::{FingerprintDeriver, FingerprintPlan};
///
/// let deriver = FingerprintDeriver::new(30, &[]);
/// let message = Message::text(ChatRef::new(1, None), 10, "look https://example.com/x wow")
///     .with_link(LinkAnnotation::span(5, 21));
///
/// match deriver.derive(&message) {
///     FingerprintPlan::Url { key } => assert_eq!(key.as_str(), "https://example.com/x"),
///     other => panic!("unexpected plan: {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FingerprintDeriver {
    /// Minimum normalized text length.
    min_text_length: usize,
    /// Normalized forms of texts that must never be fingerprinted.
    suppressed: Vec<String>,
}

impl FingerprintDeriver {
    /// Creates a deriver.
    ///
    /// `suppressed` holds raw texts (typically this bot's own notices); they
    /// are normalized once here.
    #[must_use]
    pub fn new(min_text_length: usize, suppressed: &[&str]) -> Self {
        let suppressed = suppressed
            .iter()
            .map(|text| TextNormalizer::normalize(text))
            .filter(|normalized| !normalized.is_empty())
            .collect();
        Self {
            min_text_length,
            suppressed,
        }
    }

    /// Returns the configured minimum text length.
    #[must_use]
    pub const fn min_text_length(&self) -> usize {
        self.min_text_length
    }

    /// Derives the plan for one message.
    #[must_use]
    pub fn derive(&self, message: &Message) -> FingerprintPlan {
        if let Some((kind, attachment)) = message.content.media() {
            return FingerprintPlan::Media(Self::media_plan(
                kind,
                attachment,
                message.caption.as_deref(),
            ));
        }

        let text = message.content.text();

        // Only the first annotation counts, even if it cannot be resolved.
        if let Some(url) = message.links.first().and_then(|link| link.resolve(text)) {
            return FingerprintPlan::Url {
                key: Fingerprint::new(url),
            };
        }

        self.text_plan(text)
    }

    /// Derives the plan for bare text, as if it were a text-only message.
    #[must_use]
    pub fn derive_text(&self, text: &str) -> FingerprintPlan {
        self.text_plan(Some(text))
    }

    fn text_plan(&self, text: Option<&str>) -> FingerprintPlan {
        let normalized = text.map(TextNormalizer::normalize).unwrap_or_default();

        if normalized.is_empty() {
            return FingerprintPlan::Skip {
                reason: SkipReason::NoText,
            };
        }
        if self.suppressed.iter().any(|own| *own == normalized) {
            return FingerprintPlan::Skip {
                reason: SkipReason::OwnNotice,
            };
        }
        if normalized.len() < self.min_text_length {
            return FingerprintPlan::Skip {
                reason: SkipReason::TooShort {
                    length: normalized.len(),
                    minimum: self.min_text_length,
                },
            };
        }

        FingerprintPlan::Text {
            key: Fingerprint::new(ContentHasher::hash_str(&normalized)),
        }
    }

    /// Builds the metadata key: `kind|size|stable_id[|filename][|caption]`.
    ///
    /// The per-delivery file reference changes on every forward and is
    /// deliberately left out.
    fn media_plan(kind: MediaKind, attachment: &Attachment, caption: Option<&str>) -> MediaPlan {
        let mut parts: Vec<String> = vec![
            kind.as_str().to_string(),
            attachment.size.map(|size| size.to_string()).unwrap_or_default(),
            attachment.stable_id.clone(),
        ];
        if matches!(kind, MediaKind::Video | MediaKind::Document) {
            parts.push(attachment.file_name.clone().unwrap_or_default());
        }
        if let Some(caption) = caption.filter(|caption| !caption.is_empty()) {
            parts.push(caption.to_string());
        }

        MediaPlan {
            kind,
            metadata_key: Fingerprint::new(ContentHasher::hash_parts(&parts)),
            needs_content_fetch: false,
            file_reference: attachment.file_reference.clone(),
        }
    }
}
