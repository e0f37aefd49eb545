//! Status CLI command.

use crate::config::RepostwatchConfig;
use crate::transport::{BotIdentity, TelegramTransport};
use crate::Result;
use std::fmt::Write;

/// Status command handler: reports the bot identity and effective config.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCommand;

impl StatusCommand {
    /// Creates a new status command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Looks up the bot identity and renders the report.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or `getMe` fails.
    pub async fn execute(&self, config: &RepostwatchConfig) -> Result<String> {
        let transport =
            TelegramTransport::new(config.require_token()?)?.with_api_base(&config.api_base);
        let identity = transport.get_me().await?;
        Ok(Self::render(config, Some(&identity)))
    }

    /// Renders the report. The token is never included.
    #[must_use]
    pub fn render(config: &RepostwatchConfig, identity: Option<&BotIdentity>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Repostwatch Status");
        let _ = writeln!(out, "==================");
        let _ = writeln!(out);
        let _ = writeln!(out, "Version: {}", env!("CARGO_PKG_VERSION"));
        match identity {
            Some(identity) => {
                let _ = writeln!(out, "Bot: {identity}");
            },
            None => {
                let _ = writeln!(out, "Bot: unknown");
            },
        }
        let _ = writeln!(out);

        let token = if config.bot_token.is_some() {
            "set (redacted)"
        } else {
            "not set"
        };
        let _ = writeln!(out, "Token: {token}");
        let _ = writeln!(out, "API base: {}", config.api_base);
        let _ = writeln!(out, "Channel: {}", display_or_unset(config.channel.as_ref()));
        let _ = writeln!(out, "Chat: {}", display_or_unset(config.chat.as_ref()));
        let _ = writeln!(out, "Mode: {}", config.mode);
        let _ = writeln!(out, "Cache capacity: {}", config.dedup.cache_capacity);
        let _ = writeln!(out, "Min text length: {}", config.dedup.min_text_length);
        let _ = writeln!(out, "Notice delay: {}s", config.notice_delay.as_secs());
        out
    }
}

fn display_or_unset<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "not set".to_string(), ToString::to_string)
}
