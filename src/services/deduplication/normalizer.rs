//! Text normalization.
//!
//! Turns message text into a comparison-stable form so that cosmetic edits
//! (case, accents, punctuation, shorthand, pasted links) do not defeat
//! duplicate detection.

use once_cell::sync::Lazy;
use regex::Regex;

/// Embedded URLs: scheme followed by URL-safe characters.
static URL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"https?://[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+").ok());

/// Shorthand substitutions, applied in order after lowercasing.
///
/// `w/o` precedes `w/` so the longer form wins.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("&", "and"),
    ("@", "at"),
    ("w/o", "without"),
    ("w/", "with"),
];

/// Text normalizer.
///
/// # Normalization
///
/// 1. Transliterate non-ASCII characters to their closest ASCII equivalents
/// 2. Lowercase
/// 3. Expand shorthand (`&`, `@`, `w/`, `w/o`)
/// 4. Strip embedded `http(s)://` URLs
/// 5. Replace every other non-alphanumeric character with a space
/// 6. Collapse whitespace and trim
///
/// The result contains only `[a-z0-9 ]`, never starts or ends with a space,
/// and normalizing it again is a no-op.
///
/// # Example
///
/// ```rust
/// use repostwatch::services::deduplication::TextNormalizer;
///
/// assert_eq!(TextNormalizer::normalize("  Café  &  Crème!! "), "cafe and creme");
/// assert_eq!(TextNormalizer::normalize("   "), "");
/// ```
pub struct TextNormalizer;

impl TextNormalizer {
    /// Normalizes text for fingerprinting.
    #[must_use]
    pub fn normalize(text: &str) -> String {
        let mut canonical = deunicode::deunicode(text).to_lowercase();

        for (from, to) in SUBSTITUTIONS {
            if canonical.contains(from) {
                canonical = canonical.replace(from, to);
            }
        }

        if let Some(pattern) = URL_PATTERN.as_ref() {
            canonical = pattern.replace_all(&canonical, " ").into_owned();
        }

        let spaced: String = canonical
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() || c.is_ascii_digit() {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        spaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
