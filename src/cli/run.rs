//! Run CLI command.

use crate::config::RepostwatchConfig;
use crate::models::{ActionMode, SurfaceId};
use crate::services::Watcher;
use crate::transport::TelegramTransport;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of the queue between the poller and the watcher.
const INBOUND_QUEUE: usize = 256;

/// Upper bound on removing outstanding notices at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Run command handler: watch both surfaces until Ctrl-C.
#[derive(Debug, Clone, Default)]
pub struct RunCommand {
    /// Mode override.
    pub mode: Option<ActionMode>,
    /// Channel override.
    pub channel: Option<SurfaceId>,
    /// Chat override.
    pub chat: Option<SurfaceId>,
}

impl RunCommand {
    /// Creates a run command with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies command-line overrides on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: RepostwatchConfig) -> RepostwatchConfig {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(channel) = &self.channel {
            config.channel = Some(channel.clone());
        }
        if let Some(chat) = &self.chat {
            config.chat = Some(chat.clone());
        }
        config
    }

    /// Runs the bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the bot token
    /// is rejected at startup. Per-message failures never end the run.
    pub async fn execute(&self, config: RepostwatchConfig) -> Result<()> {
        let config = self.apply(config);
        config.validate()?;

        let transport = Arc::new(
            TelegramTransport::new(config.require_token()?)?.with_api_base(&config.api_base),
        );
        let identity = transport.get_me().await?;
        tracing::info!(bot = %identity, bot_id = identity.id, "Bot started");
        tracing::info!(
            channel = ?config.channel.as_ref().map(ToString::to_string),
            chat = ?config.chat.as_ref().map(ToString::to_string),
            mode = %config.mode,
            cache_capacity = config.dedup.cache_capacity,
            "Watching surfaces"
        );

        let watcher = Arc::new(Watcher::from_transport(
            config.surfaces(),
            &config.dedup,
            config.mode,
            config.notice_delay,
            transport.clone(),
        )?);

        let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
        let pipeline = tokio::spawn(Arc::clone(&watcher).run(rx));

        tokio::select! {
            () = transport.poll(tx) => {
                tracing::warn!("Poll loop ended");
            }
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| Error::OperationFailed {
                    operation: "ctrl_c".to_string(),
                    cause: e.to_string(),
                })?;
                tracing::info!("Shutting down");
            }
        }

        // The sender went with the poll future, so the watcher drains and stops.
        pipeline.await.map_err(|e| Error::OperationFailed {
            operation: "watcher_join".to_string(),
            cause: e.to_string(),
        })?;
        remove_pending_notices(&watcher, SHUTDOWN_GRACE).await;
        Ok(())
    }
}

/// Deletes notices whose timers have not fired yet, giving up after `grace`.
///
/// Returns the number of notices removed, or `None` on timeout.
async fn remove_pending_notices(watcher: &Watcher, grace: Duration) -> Option<usize> {
    match tokio::time::timeout(grace, watcher.executor().reaper().flush()).await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(removed, "Removed pending duplicate notices");
            }
            Some(removed)
        },
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Timed out removing pending duplicate notices"
            );
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatId, ChatRef, FileReference, Message, MessageHandle, SurfaceDirectory};
    use crate::services::DeduplicationConfig;
    use crate::transport::{ContentFetcher, MessageSink, TransportError};
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::Mutex;

    /// Sink whose deletes take `delete_delay`.
    struct SlowSink {
        delete_delay: Duration,
        deleted: Mutex<Vec<MessageHandle>>,
    }

    impl SlowSink {
        fn new(delete_delay: Duration) -> Self {
            Self {
                delete_delay,
                deleted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentFetcher for SlowSink {
        async fn fetch_content(
            &self,
            _file: &FileReference,
        ) -> std::result::Result<Vec<u8>, TransportError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl MessageSink for SlowSink {
        async fn send_message(
            &self,
            _chat: ChatId,
            _text: &str,
        ) -> std::result::Result<MessageHandle, TransportError> {
            Ok(MessageHandle(500))
        }

        async fn delete_message(
            &self,
            _chat: ChatId,
            message: MessageHandle,
        ) -> std::result::Result<(), TransportError> {
            tokio::time::sleep(self.delete_delay).await;
            self.deleted.lock().unwrap().push(message);
            Ok(())
        }
    }

    async fn warned_watcher(sink: &Arc<SlowSink>) -> Watcher {
        let watcher = Watcher::from_transport(
            SurfaceDirectory::new(None, Some(SurfaceId::Id(-7))),
            &DeduplicationConfig::default(),
            ActionMode::Warn,
            Duration::from_secs(60),
            sink.clone(),
        )
        .unwrap();
        let text = "The same announcement posted twice in a row by mistake";
        for id in 1..=2 {
            watcher
                .handle(&Message::text(ChatRef::new(-7, None), id, text))
                .await;
        }
        watcher
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_removes_pending_notices() {
        let sink = Arc::new(SlowSink::new(Duration::from_millis(10)));
        let watcher = warned_watcher(&sink).await;
        assert_eq!(watcher.executor().reaper().pending(), 1);

        let removed = remove_pending_notices(&watcher, SHUTDOWN_GRACE).await;

        assert_eq!(removed, Some(1));
        assert_eq!(*sink.deleted.lock().unwrap(), vec![MessageHandle(500)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_gives_up_after_grace() {
        let sink = Arc::new(SlowSink::new(Duration::from_secs(600)));
        let watcher = warned_watcher(&sink).await;

        let removed = remove_pending_notices(&watcher, SHUTDOWN_GRACE).await;

        assert_eq!(removed, None);
        assert!(sink.deleted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_overrides_replace_config() {
        let config = RepostwatchConfig::default().with_chat(SurfaceId::Id(-1));
        let command = RunCommand {
            mode: Some(ActionMode::Delete),
            channel: Some(SurfaceId::Username("news".to_string())),
            chat: None,
        };

        let config = command.apply(config);
        assert_eq!(config.mode, ActionMode::Delete);
        assert_eq!(config.channel, Some(SurfaceId::Username("news".to_string())));
        assert_eq!(config.chat, Some(SurfaceId::Id(-1)));
    }

    #[tokio::test]
    async fn test_incomplete_config_fails_before_network() {
        let config = RepostwatchConfig {
            bot_token: Some(SecretString::from("1:A".to_string())),
            ..RepostwatchConfig::default()
        };
        let result = RunCommand::new().execute(config).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
