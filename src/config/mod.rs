//! Configuration management.
//!
//! Settings come from a TOML file, then `REPOSTWATCH_*` environment
//! variables (a `.env` file is honoured), then command-line flags. Later
//! sources win.

use crate::models::{ActionMode, SurfaceDirectory, SurfaceId};
use crate::services::{DEFAULT_NOTICE_DELAY, DeduplicationConfig};
use crate::transport::DEFAULT_API_BASE;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "REPOSTWATCH_CONFIG_PATH";

/// Main configuration for repostwatch.
#[derive(Debug, Clone)]
pub struct RepostwatchConfig {
    /// Bot API token. Never logged.
    pub bot_token: Option<SecretString>,
    /// The broadcast channel.
    pub channel: Option<SurfaceId>,
    /// The discussion chat.
    pub chat: Option<SurfaceId>,
    /// Enforcement mode.
    pub mode: ActionMode,
    /// Detection settings.
    pub dedup: DeduplicationConfig,
    /// Lifetime of a duplicate notice.
    pub notice_delay: Duration,
    /// Bot API base URL.
    pub api_base: String,
    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

/// Observability section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilitySettings {
    /// Logging settings.
    pub logging: Option<LoggingSettings>,
    /// Metrics settings.
    pub metrics: Option<MetricsSettings>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `tracing` filter directive, e.g. `repostwatch=debug`.
    pub filter: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<String>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether to install the Prometheus exporter.
    pub enabled: Option<bool>,
    /// Listen port for the exporter.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Bot token; `${VAR}` references are expanded.
    pub bot_token: Option<String>,
    /// Channel `@username` or numeric id.
    pub channel: Option<String>,
    /// Chat `@username` or numeric id.
    pub chat: Option<String>,
    /// `watch`, `warn` or `delete`.
    pub mode: Option<String>,
    /// Fingerprints kept per surface.
    pub cache_capacity: Option<usize>,
    /// Minimum normalized text length.
    pub min_text_length: Option<usize>,
    /// Notice lifetime in seconds.
    pub notice_delay_secs: Option<u64>,
    /// Bot API base URL.
    pub api_base: Option<String>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

impl Default for RepostwatchConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel: None,
            chat: None,
            mode: ActionMode::default(),
            dedup: DeduplicationConfig::default(),
            notice_delay: DEFAULT_NOTICE_DELAY,
            api_base: DEFAULT_API_BASE.to_string(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl RepostwatchConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file, |name| std::env::var(name).ok())
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/repostwatch/` on macOS)
    /// 2. XDG config dir (`~/.config/repostwatch/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found. A file that
    /// exists but cannot be parsed is an error.
    pub fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let candidates = [
            base_dirs.config_dir().join("repostwatch").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("repostwatch")
                .join("config.toml"),
        ];

        candidates
            .iter()
            .find(|path| path.exists())
            .map_or_else(|| Ok(Self::default()), |path| Self::load_from_file(path))
    }

    /// Loads configuration from `explicit`, `REPOSTWATCH_CONFIG_PATH`, or the
    /// default location, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or parsed, or an
    /// environment override is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load_from_file(&path)?
            },
            None => Self::load_default()?,
        };

        config.with_env_overrides()
    }

    /// Applies `REPOSTWATCH_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a variable holds an invalid value.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a variable holds an invalid value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(token) = get("REPOSTWATCH_BOT_TOKEN") {
            self.bot_token = Some(SecretString::from(token));
        }
        if let Some(channel) = get("REPOSTWATCH_CHANNEL") {
            self.channel = Some(channel.parse()?);
        }
        if let Some(chat) = get("REPOSTWATCH_CHAT") {
            self.chat = Some(chat.parse()?);
        }
        if let Some(mode) = get("REPOSTWATCH_MODE") {
            self.mode = mode.parse()?;
        }
        if let Some(capacity) = get("REPOSTWATCH_CACHE_CAPACITY") {
            self.dedup.cache_capacity = parse_number("REPOSTWATCH_CACHE_CAPACITY", &capacity)?;
        }
        if let Some(length) = get("REPOSTWATCH_MIN_TEXT_LENGTH") {
            self.dedup.min_text_length = parse_number("REPOSTWATCH_MIN_TEXT_LENGTH", &length)?;
        }
        if let Some(delay) = get("REPOSTWATCH_NOTICE_DELAY_SECS") {
            self.notice_delay =
                Duration::from_secs(parse_number("REPOSTWATCH_NOTICE_DELAY_SECS", &delay)?);
        }

        Ok(self)
    }

    /// Converts a `ConfigFile` to `RepostwatchConfig`.
    fn from_config_file<F>(file: ConfigFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(token) = file.bot_token {
            let expanded = shellexpand::env_with_context_no_errors(&token, |name| lookup(name));
            if !expanded.trim().is_empty() {
                config.bot_token = Some(SecretString::from(expanded.into_owned()));
            }
        }
        if let Some(channel) = file.channel {
            config.channel = Some(channel.parse()?);
        }
        if let Some(chat) = file.chat {
            config.chat = Some(chat.parse()?);
        }
        if let Some(mode) = file.mode {
            config.mode = mode.parse()?;
        }
        if let Some(capacity) = file.cache_capacity {
            config.dedup.cache_capacity = capacity;
        }
        if let Some(length) = file.min_text_length {
            config.dedup.min_text_length = length;
        }
        if let Some(delay) = file.notice_delay_secs {
            config.notice_delay = Duration::from_secs(delay);
        }
        if let Some(api_base) = file.api_base {
            config.api_base = api_base;
        }
        config.observability = ObservabilitySettings {
            logging: file.logging,
            metrics: file.metrics,
        };

        Ok(config)
    }

    /// Sets the mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ActionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the channel identity.
    #[must_use]
    pub fn with_channel(mut self, channel: SurfaceId) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Sets the chat identity.
    #[must_use]
    pub fn with_chat(mut self, chat: SurfaceId) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Returns both surface identities.
    #[must_use]
    pub fn surfaces(&self) -> SurfaceDirectory {
        SurfaceDirectory::new(self.channel.clone(), self.chat.clone())
    }

    /// Returns the token, or an error if none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no token is set.
    pub fn require_token(&self) -> Result<SecretString> {
        self.bot_token
            .clone()
            .filter(|token| !token.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidInput(
                    "bot token is not set (bot_token in config.toml or REPOSTWATCH_BOT_TOKEN)"
                        .to_string(),
                )
            })
    }

    /// Checks that the configuration is complete enough to run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the token or both surfaces are
    /// missing, or the detection settings are invalid.
    pub fn validate(&self) -> Result<()> {
        self.require_token()?;
        if self.surfaces().is_empty() {
            return Err(Error::InvalidInput(
                "at least one of channel or chat must be configured".to_string(),
            ));
        }
        self.dedup.validate()
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{name}: not a valid number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = RepostwatchConfig::default();
        assert!(config.bot_token.is_none());
        assert_eq!(config.mode, ActionMode::Watch);
        assert_eq!(config.dedup.cache_capacity, 1000);
        assert_eq!(config.dedup.min_text_length, 30);
        assert_eq!(config.notice_delay, Duration::from_secs(60));
        assert_eq!(config.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bot_token = "123:ABC"
channel = "@MyChannel"
chat = "-1001234"
mode = "warn"
cache_capacity = 50
notice_delay_secs = 5

[logging]
format = "json"

[metrics]
enabled = true
port = 9100
"#
        )
        .unwrap();

        let config = RepostwatchConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.bot_token.unwrap().expose_secret(), "123:ABC");
        assert_eq!(config.channel, Some(SurfaceId::Username("MyChannel".to_string())));
        assert_eq!(config.chat, Some(SurfaceId::Id(-1_001_234)));
        assert_eq!(config.mode, ActionMode::Warn);
        assert_eq!(config.dedup.cache_capacity, 50);
        assert_eq!(config.notice_delay, Duration::from_secs(5));
        assert_eq!(
            config.observability.logging.unwrap().format.as_deref(),
            Some("json")
        );
        assert_eq!(config.observability.metrics.unwrap().port, Some(9100));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bot_tokn = \"x\"").unwrap();
        assert!(RepostwatchConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = RepostwatchConfig::load_from_file(Path::new("/nonexistent/repostwatch.toml"));
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_token_env_expansion() {
        let file = ConfigFile {
            bot_token: Some("${TELEGRAM_TOKEN}".to_string()),
            ..ConfigFile::default()
        };
        let config =
            RepostwatchConfig::from_config_file(file, lookup(&[("TELEGRAM_TOKEN", "999:XYZ")]))
                .unwrap();
        assert_eq!(config.bot_token.unwrap().expose_secret(), "999:XYZ");
    }

    #[test]
    fn test_overrides_win() {
        let config = RepostwatchConfig::default()
            .with_overrides(lookup(&[
                ("REPOSTWATCH_BOT_TOKEN", "1:A"),
                ("REPOSTWATCH_CHAT", "@group"),
                ("REPOSTWATCH_MODE", "delete"),
                ("REPOSTWATCH_CACHE_CAPACITY", "2"),
                ("REPOSTWATCH_MIN_TEXT_LENGTH", "10"),
                ("REPOSTWATCH_NOTICE_DELAY_SECS", "1"),
            ]))
            .unwrap();

        assert_eq!(config.mode, ActionMode::Delete);
        assert_eq!(config.chat, Some(SurfaceId::Username("group".to_string())));
        assert_eq!(config.dedup.cache_capacity, 2);
        assert_eq!(config.dedup.min_text_length, 10);
        assert_eq!(config.notice_delay, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let bad_mode =
            RepostwatchConfig::default().with_overrides(lookup(&[("REPOSTWATCH_MODE", "ban")]));
        assert!(matches!(bad_mode, Err(Error::InvalidInput(_))));

        let bad_number = RepostwatchConfig::default()
            .with_overrides(lookup(&[("REPOSTWATCH_CACHE_CAPACITY", "lots")]));
        assert!(matches!(bad_number, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate() {
        let config = RepostwatchConfig::default();
        assert!(config.validate().is_err());

        let config = RepostwatchConfig {
            bot_token: Some(SecretString::from("1:A".to_string())),
            ..RepostwatchConfig::default()
        };
        assert!(config.validate().is_err());

        let config = config.with_channel(SurfaceId::Id(-1));
        assert!(config.validate().is_ok());

        let mut config = config;
        config.dedup.cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RepostwatchConfig {
            bot_token: Some(SecretString::from("123:SECRET".to_string())),
            ..RepostwatchConfig::default()
        };
        assert!(!format!("{config:?}").contains("SECRET"));
    }
}
