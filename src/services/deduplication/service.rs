//! Deduplication service orchestrator.
//!
//! Routes each message to the resolver for its surface. Messages from
//! anywhere else are dropped without being evaluated.

use crate::Result;
use crate::models::{Message, Surface, SurfaceDirectory};
use crate::services::notice::all_notices;
use crate::transport::ContentFetcher;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::instrument;

use super::config::DeduplicationConfig;
use super::fingerprint::FingerprintDeriver;
use super::recent::RecencyCache;
use super::resolver::SurfaceResolver;
use super::types::Outcome;

/// Service for duplicate detection across both surfaces.
///
/// Channel and chat keep independent caches: the same content on both is
/// never a cross-surface duplicate.
///
/// # Example
///
/// ```rust,ignore
/// use repostwatch::models::{ChatRef, Message, SurfaceDirectory};
/// use repostwatch::services::{DeduplicationConfig, DeduplicationService};
/// use std::sync::Arc;
///
/// let surfaces = SurfaceDirectory::new(None, Some("mygroup".parse()?));
/// let service = DeduplicationService::new(surfaces, &DeduplicationConfig::default(), transport)?;
///
/// let outcome = service.resolve(&message).await;
/// if outcome.is_duplicate() {
///     println!("Duplicate: {:?}", outcome.verdict());
/// }
/// ```
pub struct DeduplicationService {
    /// Which chats are the channel and the chat.
    surfaces: SurfaceDirectory,
    /// Channel resolver.
    channel: SurfaceResolver,
    /// Chat resolver.
    chat: SurfaceResolver,
    /// Downloads media content for metadata hits.
    fetcher: Arc<dyn ContentFetcher>,
}

impl DeduplicationService {
    /// Creates a service with empty caches.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the configuration is invalid.
    pub fn new(
        surfaces: SurfaceDirectory,
        config: &DeduplicationConfig,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.cache_capacity).ok_or_else(|| {
            crate::Error::InvalidInput("cache capacity must be greater than zero".to_string())
        })?;

        let deriver = Arc::new(FingerprintDeriver::new(
            config.min_text_length,
            all_notices(),
        ));

        Ok(Self {
            surfaces,
            channel: SurfaceResolver::new(Surface::Channel, capacity, Arc::clone(&deriver)),
            chat: SurfaceResolver::new(Surface::Chat, capacity, deriver),
            fetcher,
        })
    }

    /// Returns the resolver for a surface.
    #[must_use]
    pub const fn resolver(&self, surface: Surface) -> &SurfaceResolver {
        match surface {
            Surface::Channel => &self.channel,
            Surface::Chat => &self.chat,
        }
    }

    /// Returns the cache for a surface.
    #[must_use]
    pub const fn cache(&self, surface: Surface) -> &RecencyCache {
        self.resolver(surface).cache()
    }

    /// Returns the surface directory.
    #[must_use]
    pub const fn surfaces(&self) -> &SurfaceDirectory {
        &self.surfaces
    }

    /// Resolves one inbound message.
    ///
    /// Returns [`Outcome::Dropped`] for messages from an unconfigured chat.
    #[instrument(
        skip(self, message),
        fields(operation = "dedup_resolve", chat_id = %message.chat.id)
    )]
    pub async fn resolve(&self, message: &Message) -> Outcome {
        let Some(surface) = self.surfaces.classify(&message.chat) else {
            tracing::trace!("Message from unconfigured chat, dropped");
            record_outcome("none", "dropped");
            return Outcome::Dropped;
        };

        let outcome = self
            .resolver(surface)
            .resolve(message, self.fetcher.as_ref())
            .await;
        record_outcome(surface.as_str(), outcome.label());
        outcome
    }
}

fn record_outcome(surface: &'static str, outcome: &'static str) {
    metrics::counter!(
        "repostwatch_messages_total",
        "surface" => surface,
        "outcome" => outcome
    )
    .increment(1);
}
