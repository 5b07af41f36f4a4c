//! Configuration file parser for ~/.config/digest-sync/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde, though we log a warning when the file
//! contains potential typos.
use serde::Deserialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::util::{validate_endpoint, EndpointError};

/// Environment variable that overrides `webhook_url`.
pub const WEBHOOK_ENV_VAR: &str = "SLACK_WEBHOOK_URL";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Invalid endpoint for '{key}': {source}")]
    Endpoint {
        key: &'static str,
        #[source]
        source: EndpointError,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// Custom Debug impl masks `webhook_url`: the URL itself is the credential.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Defaults to `digest.db` in the config directory.
    pub database_path: Option<PathBuf>,

    /// Directory search endpoint of the What's New feed.
    pub feed_base_url: String,

    pub feed_directory_id: String,

    pub feed_locale: String,

    /// Records requested per page.
    pub page_size: u32,

    /// Minutes between scheduled cycles.
    pub sync_interval_minutes: u64,

    /// Bound on each outbound HTTP request.
    pub request_timeout_secs: u64,

    /// Directory of `.mime` newsletter files. Mail processing is off when unset.
    pub mail_dir: Option<PathBuf>,

    /// Only newsletters whose subject contains this text are processed.
    pub mail_subject_filter: Option<String>,

    /// Incoming-webhook URL for update notifications.
    /// The SLACK_WEBHOOK_URL env var takes precedence over the config file.
    pub webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            feed_base_url: "https://aws.amazon.com/api/dirs/items/search".to_string(),
            feed_directory_id: "whats-new-v2".to_string(),
            feed_locale: "en_US".to_string(),
            page_size: 100,
            sync_interval_minutes: 24 * 60,
            request_timeout_secs: 30,
            mail_dir: None,
            mail_subject_filter: None,
            webhook_url: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("feed_base_url", &self.feed_base_url)
            .field("feed_directory_id", &self.feed_directory_id)
            .field("feed_locale", &self.feed_locale)
            .field("page_size", &self.page_size)
            .field("sync_interval_minutes", &self.sync_interval_minutes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("mail_dir", &self.mail_dir)
            .field("mail_subject_filter", &self.mail_subject_filter)
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 10] = [
        "database_path",
        "feed_base_url",
        "feed_directory_id",
        "feed_locale",
        "page_size",
        "sync_interval_minutes",
        "request_timeout_secs",
        "mail_dir",
        "mail_subject_filter",
        "webhook_url",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            page_size = config.page_size,
            sync_interval_minutes = config.sync_interval_minutes,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Applies environment overrides (currently only the webhook URL).
    pub fn apply_env(&mut self) {
        self.apply_webhook_override(std::env::var(WEBHOOK_ENV_VAR).ok());
    }

    /// A non-empty override replaces the configured webhook URL.
    pub fn apply_webhook_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using webhook URL from {}", WEBHOOK_ENV_VAR);
            self.webhook_url = Some(url);
        }
    }

    /// Checks every value that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.page_size()?;
        self.sync_interval()?;
        self.request_timeout()?;
        self.feed_endpoint()?;
        self.webhook_endpoint()?;
        if self.feed_directory_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "feed_directory_id",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn page_size(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.page_size).ok_or(ConfigError::Invalid {
            key: "page_size",
            reason: "must be greater than zero".into(),
        })
    }

    pub fn sync_interval(&self) -> Result<Duration, ConfigError> {
        if self.sync_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "sync_interval_minutes",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(Duration::from_secs(self.sync_interval_minutes.saturating_mul(60)))
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn feed_endpoint(&self) -> Result<Url, ConfigError> {
        validate_endpoint(&self.feed_base_url).map_err(|source| ConfigError::Endpoint {
            key: "feed_base_url",
            source,
        })
    }

    pub fn webhook_endpoint(&self) -> Result<Option<Url>, ConfigError> {
        self.webhook_url
            .as_deref()
            .map(|raw| {
                validate_endpoint(raw).map_err(|source| ConfigError::Endpoint {
                    key: "webhook_url",
                    source,
                })
            })
            .transpose()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("digest_sync_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.sync_interval_minutes, 1440);
        assert_eq!(config.feed_directory_id, "whats-new-v2");
        assert_eq!(config.feed_locale, "en_US");
        assert!(config.database_path.is_none());
        assert!(config.mail_dir.is_none());
        assert!(config.webhook_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/digest_sync_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.sync_interval_minutes, 1440);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "page_size = 25\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.feed_locale, "en_US");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
database_path = "/var/lib/digest/news.db"
feed_base_url = "https://feed.example.com/search"
feed_directory_id = "whats-new-v3"
feed_locale = "ko_KR"
page_size = 50
sync_interval_minutes = 60
request_timeout_secs = 5
mail_dir = "/var/mail/digest"
mail_subject_filter = "Weekly Update"
webhook_url = "https://hooks.example.com/services/T/B/x"
"#;
        let (dir, path) = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.database_path.as_deref(),
            Some(Path::new("/var/lib/digest/news.db"))
        );
        assert_eq!(config.feed_directory_id, "whats-new-v3");
        assert_eq!(config.feed_locale, "ko_KR");
        assert_eq!(config.page_size().unwrap().get(), 50);
        assert_eq!(config.sync_interval().unwrap(), Duration::from_secs(3600));
        assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(config.mail_subject_filter.as_deref(), Some("Weekly Update"));
        assert!(config.webhook_endpoint().unwrap().is_some());
        assert!(config.validate().is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "page_size = 10\ntotally_fake_key = 1\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 10);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrongtype", "page_size = \"many\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = Config {
            page_size: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "page_size", .. })
        ));

        let config = Config {
            sync_interval_minutes: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_insecure_endpoints_rejected() {
        let config = Config {
            feed_base_url: "http://feed.example.com/search".into(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Endpoint { key: "feed_base_url", .. })
        ));

        let config = Config {
            webhook_url: Some("ftp://hooks.example.com".into()),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Endpoint { key: "webhook_url", .. })
        ));

        let config = Config {
            feed_base_url: "http://127.0.0.1:8080/search".into(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_webhook_override_precedence() {
        let mut config = Config {
            webhook_url: Some("https://file.example.com/hook".into()),
            ..Config::default()
        };
        config.apply_webhook_override(Some("   ".into()));
        assert_eq!(config.webhook_url.as_deref(), Some("https://file.example.com/hook"));

        config.apply_webhook_override(Some("https://env.example.com/hook".into()));
        assert_eq!(config.webhook_url.as_deref(), Some("https://env.example.com/hook"));

        config.apply_webhook_override(None);
        assert_eq!(config.webhook_url.as_deref(), Some("https://env.example.com/hook"));
    }

    #[test]
    fn test_debug_masks_webhook_url() {
        let config = Config {
            webhook_url: Some("https://hooks.example.com/services/super-secret".into()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret"));
        assert!(debug_output.contains("[REDACTED]"));

        let debug_output = format!("{:?}", Config::default());
        assert!(!debug_output.contains("[REDACTED]"));
    }
}
