//! Per-surface duplicate resolution.

use super::fingerprint::FingerprintDeriver;
use super::hasher::ContentHasher;
use super::recent::RecencyCache;
use super::types::{
    ContentCheck, Fingerprint, FingerprintPlan, KeyKind, MediaPlan, Outcome, Verdict,
};
use crate::models::{Message, Surface};
use crate::transport::ContentFetcher;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Resolves messages for one surface against that surface's cache.
///
/// Owns its [`RecencyCache`] exclusively.
pub struct SurfaceResolver {
    surface: Surface,
    cache: RecencyCache,
    deriver: Arc<FingerprintDeriver>,
}

impl SurfaceResolver {
    /// Creates a resolver with an empty cache.
    #[must_use]
    pub fn new(surface: Surface, capacity: NonZeroUsize, deriver: Arc<FingerprintDeriver>) -> Self {
        Self {
            surface,
            cache: RecencyCache::new(surface, capacity),
            deriver,
        }
    }

    /// Returns the surface this resolver serves.
    #[must_use]
    pub const fn surface(&self) -> Surface {
        self.surface
    }

    /// Returns the surface cache.
    #[must_use]
    pub const fn cache(&self) -> &RecencyCache {
        &self.cache
    }

    /// Decides whether `message` repeats recent content on this surface.
    ///
    /// Inserts the relevant key(s) when the message is original. The only
    /// suspension point is the media content fetch, which runs without the
    /// cache lock held.
    #[instrument(
        skip(self, message, fetcher),
        fields(
            operation = "resolve",
            surface = %self.surface,
            message_id = %message.id
        )
    )]
    #[allow(clippy::cast_precision_loss)]
    pub async fn resolve(&self, message: &Message, fetcher: &dyn ContentFetcher) -> Outcome {
        let start = Instant::now();
        self.cache.evict_to_capacity();

        let outcome = match self.deriver.derive(message) {
            FingerprintPlan::Skip { reason } => {
                tracing::debug!(reason = %reason, "Message not evaluated");
                Outcome::Skipped {
                    surface: self.surface,
                    reason,
                }
            },
            FingerprintPlan::Url { key } => self.resolve_direct(KeyKind::Url, key),
            FingerprintPlan::Text { key } => self.resolve_direct(KeyKind::Text, key),
            FingerprintPlan::Media(plan) => self.resolve_media(plan, fetcher).await,
        };

        metrics::histogram!(
            "repostwatch_resolve_duration_ms",
            "surface" => self.surface.as_str()
        )
        .record(start.elapsed().as_millis() as f64);

        outcome
    }

    fn resolve_direct(&self, kind: KeyKind, key: Fingerprint) -> Outcome {
        let is_duplicate = self.cache.check_and_insert(&key, std::slice::from_ref(&key));
        self.log_verdict(kind, &key, is_duplicate);
        Outcome::Evaluated {
            surface: self.surface,
            verdict: Verdict::direct(is_duplicate, kind, key),
        }
    }

    async fn resolve_media(&self, plan: MediaPlan, fetcher: &dyn ContentFetcher) -> Outcome {
        let metadata_key = plan.metadata_key.clone();
        tracing::debug!(kind = %plan.kind, metadata_key = %metadata_key, "Media metadata key");

        if !self
            .cache
            .check_and_insert(&metadata_key, std::slice::from_ref(&metadata_key))
        {
            // Common case: new metadata, no download.
            self.log_verdict(KeyKind::MediaMetadata, &metadata_key, false);
            return self.evaluated(Verdict::media(
                false,
                KeyKind::MediaMetadata,
                metadata_key,
                ContentCheck::NotNeeded,
            ));
        }

        // A metadata hit is necessary but not sufficient.
        let plan = plan.requiring_content_fetch();
        tracing::info!(
            file_reference = %plan.file_reference,
            "Metadata match, downloading content to double check"
        );

        let bytes = match fetcher.fetch_content(&plan.file_reference).await {
            Ok(bytes) => {
                metrics::counter!("repostwatch_content_fetch_total", "result" => "ok")
                    .increment(1);
                bytes
            },
            Err(e) => {
                metrics::counter!("repostwatch_content_fetch_total", "result" => "error")
                    .increment(1);
                tracing::warn!(
                    error = %e,
                    file_reference = %plan.file_reference,
                    "Content fetch failed, skipping double check"
                );
                return self.evaluated(Verdict::media(
                    false,
                    KeyKind::MediaMetadata,
                    metadata_key,
                    ContentCheck::Failed,
                ));
            },
        };

        let content_key = Fingerprint::new(ContentHasher::hash_bytes(&bytes));
        tracing::debug!(content_key = %content_key, size = bytes.len(), "Downloaded content hashed");

        let is_duplicate = self
            .cache
            .check_and_insert(&content_key, &[metadata_key, content_key.clone()]);
        self.log_verdict(KeyKind::MediaContent, &content_key, is_duplicate);

        self.evaluated(Verdict::media(
            is_duplicate,
            KeyKind::MediaContent,
            content_key,
            ContentCheck::Completed,
        ))
    }

    const fn evaluated(&self, verdict: Verdict) -> Outcome {
        Outcome::Evaluated {
            surface: self.surface,
            verdict,
        }
    }

    fn log_verdict(&self, kind: KeyKind, key: &Fingerprint, is_duplicate: bool) {
        if is_duplicate {
            tracing::info!(kind = %kind, key = %key, "Duplicate found");
            metrics::counter!(
                "repostwatch_duplicates_total",
                "surface" => self.surface.as_str(),
                "kind" => kind.as_str()
            )
            .increment(1);
        } else {
            tracing::debug!(kind = %kind, key = %key, "Stored fingerprint");
        }
    }
}
