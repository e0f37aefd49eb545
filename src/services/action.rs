//! What to do about a duplicate.
//!
//! [`ActionPolicy`] maps a verdict to an [`Effect`]; [`ActionExecutor`]
//! carries the effect out over a [`MessageSink`]. Transient notices are
//! removed later by a [`NoticeReaper`] task that runs detached from the
//! message that caused them.

use crate::models::{ActionMode, ChatId, MessageHandle, Surface};
use crate::services::deduplication::Outcome;
use crate::services::notice::notice_for;
use crate::transport::MessageSink;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

/// Default lifetime of a duplicate notice.
pub const DEFAULT_NOTICE_DELAY: Duration = Duration::from_secs(60);

/// Side effect requested for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Do nothing.
    None,
    /// Post the surface notice and remove it after the notice delay.
    TransientWarn,
    /// Delete the duplicate; if that succeeds, post a transient notice.
    DeleteAndTransientWarn,
}

impl Effect {
    /// Returns a short label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TransientWarn => "warn",
            Self::DeleteAndTransientWarn => "delete",
        }
    }
}

/// Maps outcomes to effects under an [`ActionMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionPolicy {
    mode: ActionMode,
}

impl ActionPolicy {
    /// Creates a policy for `mode`.
    #[must_use]
    pub const fn new(mode: ActionMode) -> Self {
        Self { mode }
    }

    /// Returns the mode.
    #[must_use]
    pub const fn mode(&self) -> ActionMode {
        self.mode
    }

    /// Returns the effect for an outcome.
    ///
    /// Anything but a duplicate maps to [`Effect::None`] in every mode.
    #[must_use]
    pub const fn apply(&self, outcome: &Outcome) -> Effect {
        if !outcome.is_duplicate() {
            return Effect::None;
        }
        match self.mode {
            ActionMode::Watch => Effect::None,
            ActionMode::Warn => Effect::TransientWarn,
            ActionMode::Delete => Effect::DeleteAndTransientWarn,
        }
    }
}

/// Notices awaiting removal, keyed by where they were posted.
type PendingNotices = HashMap<(ChatId, MessageHandle), AbortHandle>;

/// Deletes a posted notice after a delay.
///
/// Every scheduled notice is tracked until it is removed, so that
/// [`NoticeReaper::flush`] can remove the remaining ones at shutdown instead
/// of leaving them behind when the runtime stops.
#[derive(Clone)]
pub struct NoticeReaper {
    sink: Arc<dyn MessageSink>,
    delay: Duration,
    pending: Arc<Mutex<PendingNotices>>,
}

impl NoticeReaper {
    /// Creates a reaper.
    #[must_use]
    pub fn new(sink: Arc<dyn MessageSink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedules deletion of `notice` in `chat`.
    ///
    /// The task is detached: dropping the handle does not cancel it. Failure
    /// to delete is logged and otherwise ignored.
    pub fn schedule(&self, chat: ChatId, notice: MessageHandle) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;

        let mut tracked = lock(&self.pending);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Whoever takes the entry out owns the deletion.
            if lock(&pending).remove(&(chat, notice)).is_none() {
                return;
            }
            remove_notice(sink.as_ref(), chat, notice).await;
        });
        tracked.insert((chat, notice), task.abort_handle());
        task
    }

    /// Returns the number of notices still waiting for their delay.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Removes every pending notice now, cancelling its delayed task.
    ///
    /// Returns the number of notices removed.
    pub async fn flush(&self) -> usize {
        let drained: Vec<_> = lock(&self.pending).drain().collect();
        for (_, task) in &drained {
            task.abort();
        }
        for ((chat, notice), _) in &drained {
            remove_notice(self.sink.as_ref(), *chat, *notice).await;
        }
        drained.len()
    }
}

fn lock(pending: &Mutex<PendingNotices>) -> MutexGuard<'_, PendingNotices> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn remove_notice(sink: &dyn MessageSink, chat: ChatId, notice: MessageHandle) {
    match sink.delete_message(chat, notice).await {
        Ok(()) => {
            tracing::debug!(chat_id = %chat, notice_id = %notice, "Removed duplicate notice");
            record_action("reap_notice", "ok");
        },
        Err(e) => {
            tracing::warn!(
                chat_id = %chat,
                notice_id = %notice,
                error = %e,
                "Failed to remove duplicate notice"
            );
            record_action("reap_notice", "error");
        },
    }
}

impl std::fmt::Debug for NoticeReaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeReaper")
            .field("delay", &self.delay)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Carries out effects over a [`MessageSink`].
#[derive(Clone)]
pub struct ActionExecutor {
    sink: Arc<dyn MessageSink>,
    reaper: NoticeReaper,
}

impl ActionExecutor {
    /// Creates an executor whose notices live for `notice_delay`.
    #[must_use]
    pub fn new(sink: Arc<dyn MessageSink>, notice_delay: Duration) -> Self {
        let reaper = NoticeReaper::new(Arc::clone(&sink), notice_delay);
        Self { sink, reaper }
    }

    /// Returns the reaper that removes posted notices.
    #[must_use]
    pub const fn reaper(&self) -> &NoticeReaper {
        &self.reaper
    }

    /// Executes `effect` for `message` in `chat`.
    ///
    /// Returns the reaper task for a posted notice, if one was scheduled.
    /// Failures are logged, never retried, and never propagated.
    pub async fn execute(
        &self,
        effect: Effect,
        surface: Surface,
        chat: ChatId,
        message: MessageHandle,
    ) -> Option<JoinHandle<()>> {
        match effect {
            Effect::None => None,
            Effect::TransientWarn => self.warn(surface, chat).await,
            Effect::DeleteAndTransientWarn => {
                match self.sink.delete_message(chat, message).await {
                    Ok(()) => {
                        tracing::info!(
                            surface = %surface,
                            message_id = %message,
                            "Deleted duplicate message"
                        );
                        record_action("delete", "ok");
                    },
                    Err(e) => {
                        tracing::warn!(
                            surface = %surface,
                            message_id = %message,
                            error = %e,
                            "Failed to delete duplicate message"
                        );
                        record_action("delete", "error");
                        return None;
                    },
                }
                self.warn(surface, chat).await
            },
        }
    }

    async fn warn(&self, surface: Surface, chat: ChatId) -> Option<JoinHandle<()>> {
        match self.sink.send_message(chat, notice_for(surface)).await {
            Ok(notice) => {
                tracing::info!(surface = %surface, notice_id = %notice, "Posted duplicate notice");
                record_action("warn", "ok");
                Some(self.reaper.schedule(chat, notice))
            },
            Err(e) => {
                tracing::warn!(surface = %surface, error = %e, "Failed to post duplicate notice");
                record_action("warn", "error");
                None
            },
        }
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("reaper", &self.reaper)
            .finish_non_exhaustive()
    }
}

fn record_action(action: &'static str, result: &'static str) {
    metrics::counter!(
        "repostwatch_actions_total",
        "action" => action,
        "result" => result
    )
    .increment(1);
}
