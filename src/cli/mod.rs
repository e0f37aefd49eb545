//! CLI command implementations.
//!
//! This module provides the command-line interface for repostwatch. Each
//! submodule implements a specific CLI command.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Watch the channel and chat until Ctrl-C |
//! | `status` | Show the bot identity and effective configuration |
//! | `fingerprint` | Show how a text would be normalized and keyed |
//!
//! # Example Usage
//!
//! ```bash
//! # Watch a channel and its discussion chat, warning on reposts
//! repostwatch run --channel @mychannel --chat @mychannel_chat --mode warn
//!
//! # Check what a message would be keyed as
//! repostwatch fingerprint "Café & crème w/ friends: https://example.com"
//! ```

mod fingerprint;
mod run;
mod status;

pub use fingerprint::FingerprintCommand;
pub use run::RunCommand;
pub use status::StatusCommand;
