//! Duplicate detection for the channel and the chat.
//!
//! Each message is reduced to one fingerprint along its governing content
//! dimension and checked against a bounded, per-surface recency cache:
//! 1. **Media**: hash of stable metadata, double-checked against a hash of
//!    the downloaded bytes on a metadata hit
//! 2. **URL**: the first link annotation, verbatim
//! 3. **Text**: SHA-256 of the normalized text
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    DeduplicationService                      │
//! │   SurfaceDirectory ──► SurfaceResolver (channel | chat)      │
//! │  ┌───────────────────┐  ┌──────────────┐  ┌───────────────┐  │
//! │  │ FingerprintDeriver│  │ RecencyCache │  │ ContentFetcher│  │
//! │  │                   │  │              │  │               │  │
//! │  │ media > url >     │  │ FIFO, bounded│  │ only on a     │  │
//! │  │ normalized text   │  │ atomic check │  │ metadata hit  │  │
//! │  └───────────────────┘  └──────────────┘  └───────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod fingerprint;
mod hasher;
mod normalizer;
mod recent;
mod resolver;
mod service;
mod types;

pub use config::{DEFAULT_CACHE_CAPACITY, DEFAULT_MIN_TEXT_LENGTH, DeduplicationConfig};
pub use fingerprint::FingerprintDeriver;
pub use hasher::ContentHasher;
pub use normalizer::TextNormalizer;
pub use recent::RecencyCache;
pub use resolver::SurfaceResolver;
pub use service::DeduplicationService;
pub use types::{
    ContentCheck, Fingerprint, FingerprintPlan, KeyKind, MediaPlan, Outcome, SkipReason, Verdict,
};
