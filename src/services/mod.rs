//! Business logic services.
//!
//! Services sit between the transport and the models: detection decides,
//! actions enforce, the watcher wires the two together per message.

mod action;
pub mod deduplication;
pub mod notice;
mod watcher;

pub use action::{ActionExecutor, ActionPolicy, DEFAULT_NOTICE_DELAY, Effect, NoticeReaper};
pub use deduplication::{DeduplicationConfig, DeduplicationService, Outcome, Verdict};
pub use watcher::Watcher;
