//! Duplicate notices posted to each surface.

use crate::models::Surface;

/// Notice posted when a channel post repeats recent channel content.
pub const DUPLICATE_CHANNEL_NOTICE: &str = "⚠️ This appears to duplicate an existing message in the *channel*. Please avoid reposting the same content. 😉";

/// Notice posted when a chat message repeats recent chat content.
pub const DUPLICATE_CHAT_NOTICE: &str = "⚠️ This appears to duplicate an existing message in the *chat*. Please avoid reposting the same content. 😉 (Posts to the channel are copied to the chat, posts to the chat are not necessarily copied to the channel.)";

/// Returns the notice template for a surface.
#[must_use]
pub const fn notice_for(surface: Surface) -> &'static str {
    match surface {
        Surface::Channel => DUPLICATE_CHANNEL_NOTICE,
        Surface::Chat => DUPLICATE_CHAT_NOTICE,
    }
}

/// Returns every notice this bot can post.
///
/// The fingerprint deriver skips these so the bot never flags itself.
#[must_use]
pub const fn all_notices() -> &'static [&'static str] {
    &[DUPLICATE_CHANNEL_NOTICE, DUPLICATE_CHAT_NOTICE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_per_surface() {
        assert!(notice_for(Surface::Channel).contains("*channel*"));
        assert!(notice_for(Surface::Chat).contains("*chat*"));
        assert_eq!(all_notices().len(), Surface::all().len());
    }
}
