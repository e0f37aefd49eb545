//! End-to-end detection scenarios over an in-memory transport.
//!
//! Drives [`Watcher`] with realistic message sequences and checks both the
//! verdicts and the calls made against the transport.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use repostwatch::models::{
    ActionMode, Attachment, ChatId, ChatRef, FileReference, LinkAnnotation, Message,
    MessageContent, MessageHandle, Surface, SurfaceDirectory, SurfaceId,
};
use repostwatch::services::deduplication::{ContentCheck, KeyKind};
use repostwatch::services::notice::notice_for;
use repostwatch::services::{DeduplicationConfig, Outcome, Watcher};
use repostwatch::transport::{ContentFetcher, MessageSink, TransportError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CHANNEL_ID: i64 = -100_111;
const CHAT_ID: i64 = -100_222;

/// Records every send, delete and fetch.
#[derive(Default)]
struct RecordingTransport {
    content: Mutex<HashMap<String, Vec<u8>>>,
    fetches: Mutex<Vec<String>>,
    sent: Mutex<Vec<(ChatId, String)>>,
    deleted: Mutex<Vec<(ChatId, MessageHandle)>>,
}

impl RecordingTransport {
    fn with_file(self, file_reference: &str, bytes: &[u8]) -> Self {
        self.content
            .lock()
            .unwrap()
            .insert(file_reference.to_string(), bytes.to_vec());
        self
    }

    fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<(ChatId, MessageHandle)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for RecordingTransport {
    async fn fetch_content(&self, file: &FileReference) -> Result<Vec<u8>, TransportError> {
        self.fetches.lock().unwrap().push(file.as_str().to_string());
        self.content
            .lock()
            .unwrap()
            .get(file.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Api {
                code: 400,
                description: "Bad Request: file is temporarily unavailable".to_string(),
            })
    }
}

#[async_trait]
impl MessageSink for RecordingTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
    ) -> Result<MessageHandle, TransportError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat, text.to_string()));
        Ok(MessageHandle(10_000 + i64::try_from(sent.len()).unwrap()))
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageHandle,
    ) -> Result<(), TransportError> {
        self.deleted.lock().unwrap().push((chat, message));
        Ok(())
    }
}

fn channel() -> ChatRef {
    ChatRef::new(CHANNEL_ID, Some("news"))
}

fn chat() -> ChatRef {
    ChatRef::new(CHAT_ID, Some("news_chat"))
}

fn watcher(
    transport: &Arc<RecordingTransport>,
    mode: ActionMode,
    config: &DeduplicationConfig,
) -> Watcher {
    let surfaces = SurfaceDirectory::new(
        Some(SurfaceId::Username("news".to_string())),
        Some(SurfaceId::Id(CHAT_ID)),
    );
    Watcher::from_transport(
        surfaces,
        config,
        mode,
        Duration::from_secs(60),
        transport.clone(),
    )
    .unwrap()
}

fn photo(id: i64, file_reference: &str, stable_id: &str) -> Message {
    Message::new(
        chat(),
        id,
        MessageContent::Photo(vec![
            Attachment::new(format!("{file_reference}-thumb"), format!("{stable_id}-thumb"))
                .with_size(900),
            Attachment::new(file_reference, stable_id).with_size(84_512),
        ]),
    )
}

#[tokio::test(start_paused = true)]
async fn test_warn_mode_repeated_text_posts_one_notice() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Warn, &DeduplicationConfig::default());
    let text = "This is a sufficiently long original message for testing purposes";

    let first = watcher.handle(&Message::text(chat(), 1, text)).await;
    let second = watcher.handle(&Message::text(chat(), 2, text)).await;

    assert!(!first.is_duplicate());
    assert!(second.is_duplicate());
    assert_eq!(second.verdict().unwrap().kind, KeyKind::Text);
    assert_eq!(
        transport.sent(),
        vec![(ChatId(CHAT_ID), notice_for(Surface::Chat).to_string())]
    );
    assert!(transport.deleted().is_empty());

    // The notice removes itself after the delay.
    tokio::time::sleep(Duration::from_secs(61)).await;
    tokio::task::yield_now().await;
    assert_eq!(
        transport.deleted(),
        vec![(ChatId(CHAT_ID), MessageHandle(10_001))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flush_removes_outstanding_notices() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Warn, &DeduplicationConfig::default());
    let text = "Reposted right before the bot was asked to shut down";

    watcher.handle(&Message::text(chat(), 1, text)).await;
    watcher.handle(&Message::text(chat(), 2, text)).await;
    watcher.handle(&Message::text(channel(), 3, text)).await;
    watcher.handle(&Message::text(channel(), 4, text)).await;

    let reaper = watcher.executor().reaper();
    assert_eq!(reaper.pending(), 2);
    assert_eq!(reaper.flush().await, 2);
    assert_eq!(reaper.pending(), 0);

    let mut deleted = transport.deleted();
    deleted.sort_by_key(|(chat, _)| chat.0);
    assert_eq!(
        deleted,
        vec![
            (ChatId(CHAT_ID), MessageHandle(10_001)),
            (ChatId(CHANNEL_ID), MessageHandle(10_002)),
        ]
    );

    // The cancelled timers do not delete again.
    tokio::time::sleep(Duration::from_secs(120)).await;
    tokio::task::yield_now().await;
    assert_eq!(transport.deleted().len(), 2);
}

#[tokio::test]
async fn test_photo_double_check_sequence() {
    let transport = Arc::new(
        RecordingTransport::default()
            .with_file("file-a", b"jpeg bytes")
            .with_file("file-b", b"jpeg bytes"),
    );
    let watcher = watcher(&transport, ActionMode::Watch, &DeduplicationConfig::default());

    let first = watcher.handle(&photo(1, "file-a", "uniq-1")).await;
    assert!(!first.is_duplicate());
    assert_eq!(
        first.verdict().unwrap().content_check,
        Some(ContentCheck::NotNeeded)
    );
    assert!(transport.fetches().is_empty());

    // Same metadata: downloaded and hashed, content key seen for the first time.
    let second = watcher.handle(&photo(2, "file-b", "uniq-1")).await;
    assert!(!second.is_duplicate());
    assert_eq!(second.verdict().unwrap().kind, KeyKind::MediaContent);
    assert_eq!(transport.fetches(), vec!["file-b".to_string()]);

    let third = watcher.handle(&photo(3, "file-a", "uniq-1")).await;
    assert!(third.is_duplicate());
    assert_eq!(
        third.verdict().unwrap().content_check,
        Some(ContentCheck::Completed)
    );
    assert_eq!(transport.fetches().len(), 2);
}

#[tokio::test]
async fn test_fetch_failure_is_never_a_duplicate() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Delete, &DeduplicationConfig::default());

    watcher.handle(&photo(1, "gone", "uniq-9")).await;
    let second = watcher.handle(&photo(2, "gone", "uniq-9")).await;
    let third = watcher.handle(&photo(3, "gone", "uniq-9")).await;

    for outcome in [&second, &third] {
        assert!(!outcome.is_duplicate());
        assert_eq!(
            outcome.verdict().unwrap().content_check,
            Some(ContentCheck::Failed)
        );
    }
    assert_eq!(transport.fetches().len(), 2);
    assert!(transport.deleted().is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_explicit_link_target_is_the_key() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Watch, &DeduplicationConfig::default());
    let url = "https://example.com/x";

    let first = Message::text(channel(), 1, "Read this")
        .with_link(LinkAnnotation::explicit(0, 9, url));
    let second = Message::text(channel(), 2, "Totally different words here")
        .with_link(LinkAnnotation::explicit(0, 7, url));

    assert!(!watcher.handle(&first).await.is_duplicate());
    let outcome = watcher.handle(&second).await;

    assert!(outcome.is_duplicate());
    let verdict = outcome.verdict().unwrap();
    assert_eq!(verdict.kind, KeyKind::Url);
    assert_eq!(verdict.key.as_str(), url);
}

#[tokio::test]
async fn test_cosmetic_edits_still_match() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Watch, &DeduplicationConfig::default());

    let first = Message::text(chat(), 1, "Big announcement: the meetup moves to Thursday @ 7pm!");
    let second = Message::text(
        chat(),
        2,
        "big announcement -- the meetup moves to thursday at 7pm https://t.me/news/1",
    );

    assert!(!watcher.handle(&first).await.is_duplicate());
    assert!(watcher.handle(&second).await.is_duplicate());
}

#[tokio::test]
async fn test_capacity_two_evicts_oldest() {
    let transport = Arc::new(RecordingTransport::default());
    let config = DeduplicationConfig::default().with_cache_capacity(2);
    let watcher = watcher(&transport, ActionMode::Watch, &config);

    let texts = [
        "First post about the quarterly community roadmap update",
        "Second post about the new contributors onboarding guide",
        "Third post about the upcoming release candidate testing",
    ];
    for (id, text) in (1..).zip(texts) {
        assert!(!watcher.handle(&Message::text(chat(), id, text)).await.is_duplicate());
    }

    let cache = watcher.dedup().cache(Surface::Chat);
    assert_eq!(cache.len(), 2);

    // The first text fell out, the third is still remembered.
    assert!(!watcher.handle(&Message::text(chat(), 4, texts[0])).await.is_duplicate());
    assert!(watcher.handle(&Message::text(chat(), 5, texts[2])).await.is_duplicate());
}

#[tokio::test(start_paused = true)]
async fn test_delete_mode_deletes_then_warns() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Delete, &DeduplicationConfig::default());
    let text = "Channel post that is long enough to be fingerprinted";

    watcher.handle(&Message::text(channel(), 7, text)).await;
    let outcome = watcher.handle(&Message::text(channel(), 8, text)).await;

    assert!(outcome.is_duplicate());
    assert_eq!(transport.deleted(), vec![(ChatId(CHANNEL_ID), MessageHandle(8))]);
    assert_eq!(
        transport.sent(),
        vec![(ChatId(CHANNEL_ID), notice_for(Surface::Channel).to_string())]
    );
}

#[tokio::test]
async fn test_surfaces_are_independent_and_strangers_dropped() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Warn, &DeduplicationConfig::default());
    let text = "Mirrored from the channel into the discussion chat verbatim";

    assert!(!watcher.handle(&Message::text(channel(), 1, text)).await.is_duplicate());
    assert!(!watcher.handle(&Message::text(chat(), 1, text)).await.is_duplicate());

    let stranger = ChatRef::new(-100_999, Some("elsewhere"));
    let outcome = watcher.handle(&Message::text(stranger.clone(), 1, text)).await;
    assert_eq!(outcome, Outcome::Dropped);
    let outcome = watcher.handle(&Message::text(stranger, 2, text)).await;
    assert_eq!(outcome, Outcome::Dropped);

    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_own_notice_is_skipped() {
    let transport = Arc::new(RecordingTransport::default());
    let watcher = watcher(&transport, ActionMode::Warn, &DeduplicationConfig::default());
    let notice = notice_for(Surface::Chat);

    for id in 1..=2 {
        let outcome = watcher.handle(&Message::text(chat(), id, notice)).await;
        assert!(matches!(outcome, Outcome::Skipped { .. }));
    }
    assert!(transport.sent().is_empty());
}
