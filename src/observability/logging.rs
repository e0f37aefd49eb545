//! Structured logging.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when nothing else is configured.
const DEFAULT_FILTER: &str = "repostwatch=info,warn";

/// Default filter with `--verbose`.
const VERBOSE_FILTER: &str = "repostwatch=debug,info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional append-only log file.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// Filter precedence: `RUST_LOG`, `REPOSTWATCH_LOG_FILTER`, the config
    /// file, then the default (raised to debug by `verbose`).
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let format = env_string("REPOSTWATCH_LOG_FORMAT")
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map_or_else(LogFormat::default, |f| LogFormat::parse(&f));

        let directive = env_string("RUST_LOG")
            .or_else(|| env_string("REPOSTWATCH_LOG_FILTER"))
            .or_else(|| settings.and_then(|s| s.filter.clone()))
            .unwrap_or_else(|| {
                if verbose {
                    VERBOSE_FILTER.to_string()
                } else {
                    DEFAULT_FILTER.to_string()
                }
            });
        // An unparsable directive falls back to the default filter.
        let filter =
            EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let file = env_string("REPOSTWATCH_LOG_FILE")
            .or_else(|| settings.and_then(|s| s.file.clone()))
            .map(|path| PathBuf::from(shellexpand::tilde(&path).into_owned()));

        Self {
            format,
            filter,
            file,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
