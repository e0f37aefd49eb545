//! Enforcement mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when a duplicate is found. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    /// Detect and log only. Used to observe false-positive rates.
    #[default]
    Watch,
    /// Post a notice that deletes itself after a delay.
    Warn,
    /// Delete the duplicate, then post the self-deleting notice.
    Delete,
}

impl ActionMode {
    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Warn => "warn",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "watch" | "log" => Ok(Self::Watch),
            "warn" => Ok(Self::Warn),
            "delete" => Ok(Self::Delete),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown action mode '{other}' (expected watch, warn or delete)"
            ))),
        }
    }
}
