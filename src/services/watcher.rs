//! Message pipeline: classify, resolve, act.

use super::action::{ActionExecutor, ActionPolicy};
use super::deduplication::{DeduplicationConfig, DeduplicationService, Outcome};
use crate::Result;
use crate::models::{ActionMode, Message, SurfaceDirectory};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Runs every inbound message through detection and enforcement.
///
/// Each message is processed by its own task, so a slow content download
/// never holds up unrelated messages.
pub struct Watcher {
    dedup: DeduplicationService,
    policy: ActionPolicy,
    executor: ActionExecutor,
}

impl Watcher {
    /// Creates a watcher.
    #[must_use]
    pub const fn new(
        dedup: DeduplicationService,
        policy: ActionPolicy,
        executor: ActionExecutor,
    ) -> Self {
        Self {
            dedup,
            policy,
            executor,
        }
    }

    /// Wires detection and enforcement over one transport.
    ///
    /// The transport downloads media for the double-check and carries out
    /// sends and deletes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `config` is invalid.
    pub fn from_transport<T: Transport + 'static>(
        surfaces: SurfaceDirectory,
        config: &DeduplicationConfig,
        mode: ActionMode,
        notice_delay: Duration,
        transport: Arc<T>,
    ) -> Result<Self> {
        let dedup = DeduplicationService::new(surfaces, config, transport.clone())?;
        Ok(Self::new(
            dedup,
            ActionPolicy::new(mode),
            ActionExecutor::new(transport, notice_delay),
        ))
    }

    /// Returns the enforcement executor.
    #[must_use]
    pub const fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// Returns the detection service.
    #[must_use]
    pub const fn dedup(&self) -> &DeduplicationService {
        &self.dedup
    }

    /// Processes one message to completion, excluding any delayed notice
    /// removal, which runs detached.
    pub async fn handle(&self, message: &Message) -> Outcome {
        match &message.sender {
            Some(sender) => tracing::info!(
                sender = %sender,
                date = %message.date.format("%Y-%m-%d %H:%M:%S UTC"),
                message_id = %message.id,
                "Received message"
            ),
            None => tracing::info!(
                message_id = %message.id,
                "Received message, user information is not available"
            ),
        }

        let outcome = self.dedup.resolve(message).await;
        let effect = self.policy.apply(&outcome);

        if let Some(surface) = outcome.surface() {
            if outcome.is_duplicate() {
                tracing::info!(
                    surface = %surface,
                    message_id = %message.id,
                    mode = %self.policy.mode(),
                    effect = effect.as_str(),
                    "Duplicate message"
                );
            }
            self.executor
                .execute(effect, surface, message.chat.id, message.id)
                .await;
        }

        outcome
    }

    /// Consumes messages from `rx` until the channel closes.
    ///
    /// Spawns one task per message and waits for in-flight tasks before
    /// returning.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Message>) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(message) = received else {
                        break;
                    };
                    let watcher = Arc::clone(&self);
                    tasks.spawn(async move {
                        watcher.handle(&message).await;
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join_error(joined);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }
        tracing::debug!("Watcher stopped");
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Message task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChatId, ChatRef, FileReference, MessageHandle, Sender, Surface, SurfaceId,
    };
    use crate::transport::{ContentFetcher, MessageSink, TransportError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    const LONG_TEXT: &str = "This is a sufficiently long original message for testing purposes";

    #[derive(Default)]
    struct CountingTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentFetcher for CountingTransport {
        async fn fetch_content(&self, _file: &FileReference) -> std::result::Result<Vec<u8>, TransportError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl MessageSink for CountingTransport {
        async fn send_message(
            &self,
            _chat: ChatId,
            text: &str,
        ) -> std::result::Result<MessageHandle, TransportError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(MessageHandle(1))
        }

        async fn delete_message(
            &self,
            _chat: ChatId,
            _message: MessageHandle,
        ) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    fn watcher(transport: &Arc<CountingTransport>, mode: ActionMode) -> Watcher {
        Watcher::from_transport(
            SurfaceDirectory::new(None, Some(SurfaceId::Id(-1))),
            &DeduplicationConfig::default(),
            mode,
            Duration::from_secs(60),
            transport.clone(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_handle_warns_once() {
        let transport = Arc::new(CountingTransport::default());
        let watcher = watcher(&transport, ActionMode::Warn);
        let chat = ChatRef::new(-1, None);

        assert!(!watcher.handle(&Message::text(chat.clone(), 1, LONG_TEXT)).await.is_duplicate());
        assert!(watcher.handle(&Message::text(chat, 2, LONG_TEXT)).await.is_duplicate());
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let transport = Arc::new(CountingTransport::default());
        let watcher = Arc::new(watcher(&transport, ActionMode::Watch));
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(Arc::clone(&watcher).run(rx));
        for id in 0..3 {
            tx.send(Message::text(ChatRef::new(-1, None), id, LONG_TEXT))
                .await
                .unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(watcher.dedup().cache(Surface::Chat).len(), 1);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    /// In-memory log sink for asserting on emitted events.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_sender_and_date_logged_at_info() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Arc::new(CountingTransport::default());
        let watcher = watcher(&transport, ActionMode::Watch);
        let sender = Sender {
            id: 42,
            username: Some("alice".to_string()),
        };
        let date = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let message = Message::text(ChatRef::new(-1, None), 1, LONG_TEXT)
            .with_sender(sender)
            .with_date(date);
        watcher.handle(&message).await;
        watcher
            .handle(&Message::text(ChatRef::new(-1, None), 2, "anonymous post"))
            .await;

        let output = logs.contents();
        let received: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("Received message"))
            .collect();
        assert_eq!(received.len(), 2);
        assert!(received.iter().all(|line| line.contains(" INFO ")));
        assert!(received[0].contains("alice (ID: 42)"));
        assert!(received[0].contains("2024-03-01 12:30:00 UTC"));
        assert!(received[1].contains("user information is not available"));
    }
}
