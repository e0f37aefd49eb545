//! Data models for repostwatch.
//!
//! Inbound messages as the detection engine sees them, the two monitored
//! surfaces, and the enforcement mode.

mod message;
mod mode;
mod surface;

pub use message::{
    Attachment, FileReference, LinkAnnotation, MediaKind, Message, MessageContent, MessageHandle,
    Sender,
};
pub use mode::ActionMode;
pub use surface::{ChatId, ChatRef, Surface, SurfaceDirectory, SurfaceId};
