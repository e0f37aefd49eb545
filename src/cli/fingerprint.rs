//! Fingerprint CLI command.
//!
//! Shows what the detector would do with a piece of text, without touching
//! the network.

use crate::services::deduplication::{FingerprintDeriver, FingerprintPlan, TextNormalizer};
use crate::services::notice::all_notices;
use std::fmt::Write;

/// Fingerprint command handler.
#[derive(Debug, Clone)]
pub struct FingerprintCommand {
    deriver: FingerprintDeriver,
}

impl FingerprintCommand {
    /// Creates the command with the configured minimum text length.
    #[must_use]
    pub fn new(min_text_length: usize) -> Self {
        Self {
            deriver: FingerprintDeriver::new(min_text_length, all_notices()),
        }
    }

    /// Renders the normalized form and resulting plan for `text`.
    #[must_use]
    pub fn report(&self, text: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Normalized: {:?}", TextNormalizer::normalize(text));
        match self.deriver.derive_text(text) {
            FingerprintPlan::Text { key } => {
                let _ = writeln!(out, "Plan: text");
                let _ = writeln!(out, "Key: {key}");
            },
            FingerprintPlan::Skip { reason } => {
                let _ = writeln!(out, "Plan: skip ({reason})");
            },
            FingerprintPlan::Url { key } => {
                let _ = writeln!(out, "Plan: url");
                let _ = writeln!(out, "Key: {key}");
            },
            FingerprintPlan::Media(plan) => {
                let _ = writeln!(out, "Plan: {}", plan.kind);
                let _ = writeln!(out, "Key: {}", plan.metadata_key);
            },
        }
        out
    }
}
