//! Configuration module for PartyShow.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides every other credential source.
pub const ACCESS_TOKEN_ENV: &str = "PARTYSHOW_ACCESS_TOKEN";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "PARTYSHOW_CONFIG";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for PartyShow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
    pub classifier: ClassifierConfig,
    pub slideshow: SlideshowConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

/// Remote content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Folder watched on the remote store. `""` is the store root.
    pub folder_path: String,
}

/// Local photo cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one file per cached photo.
    pub dir: PathBuf,
    /// File extensions (without the dot) the cache manages.
    pub extensions: Vec<String>,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long a single long-poll request waits for changes, in seconds.
    pub longpoll_timeout_secs: u64,
    /// Fixed delay between a failed cycle and the next attempt, in seconds.
    pub retry_delay_secs: u64,
}

/// Filename classification rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Treat `"name (1).jpg"` style copies as non-displayable duplicates.
    pub exclude_duplicates: bool,
}

/// Slideshow pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideshowConfig {
    /// Seconds each photo stays on screen before advancing.
    pub interval_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Access credential sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Inline access token. Prefer `token_file` for anything shared.
    pub access_token: Option<String>,
    /// File whose trimmed contents are the access token.
    pub token_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// `$PARTYSHOW_CONFIG` wins when set, otherwise typically
    /// `$XDG_CONFIG_HOME/partyshow/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("partyshow")
            .join("config.yaml")
    }
}

impl AuthConfig {
    /// Resolve the access token: environment, then token file, then inline value.
    ///
    /// Empty values are treated as absent.
    pub fn resolve_token(&self) -> Option<String> {
        let from_env = std::env::var(ACCESS_TOKEN_ENV).ok();
        let from_file = self
            .token_file
            .as_ref()
            .and_then(|path| std::fs::read_to_string(path).ok());

        [from_env, from_file, self.access_token.clone()]
            .into_iter()
            .flatten()
            .map(|token| token.trim().to_string())
            .find(|token| !token.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            folder_path: "/PartyPhotos".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("~/.cache"))
                .join("partyshow")
                .join("photos"),
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            longpoll_timeout_secs: 60,
            retry_delay_secs: 5,
        }
    }
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.retry_delay_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Long-poll timeout bounds accepted by the remote store.
pub const LONGPOLL_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 30..=480;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        if let Err(e) = crate::domain::RemotePath::new(self.remote.folder_path.clone()) {
            errors.push(ValidationError {
                field: "remote.folder_path".into(),
                message: e.to_string(),
            });
        }

        // --- cache ---
        if self.cache.dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "cache.dir".into(),
                message: "must not be empty".into(),
            });
        }
        if self.cache.extensions.is_empty() {
            errors.push(ValidationError {
                field: "cache.extensions".into(),
                message: "must list at least one extension".into(),
            });
        }
        for ext in &self.cache.extensions {
            if ext.is_empty() || ext.contains('.') {
                errors.push(ValidationError {
                    field: "cache.extensions".into(),
                    message: format!("invalid extension '{ext}'; use e.g. 'jpg' without a dot"),
                });
            }
        }

        // --- sync ---
        if !LONGPOLL_TIMEOUT_RANGE.contains(&self.sync.longpoll_timeout_secs) {
            errors.push(ValidationError {
                field: "sync.longpoll_timeout_secs".into(),
                message: format!(
                    "must be in range {}..={}",
                    LONGPOLL_TIMEOUT_RANGE.start(),
                    LONGPOLL_TIMEOUT_RANGE.end()
                ),
            });
        }
        if self.sync.retry_delay_secs == 0 || self.sync.retry_delay_secs > 9 {
            errors.push(ValidationError {
                field: "sync.retry_delay_secs".into(),
                message: "must be in range 1..=9".into(),
            });
        }

        // --- slideshow ---
        if self.slideshow.interval_secs == 0 {
            errors.push(ValidationError {
                field: "slideshow.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use partyshow_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .remote_folder_path("/Wedding")
///     .cache_dir(PathBuf::from("/var/cache/partyshow"))
///     .slideshow_interval_secs(8)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_folder_path(mut self, path: impl Into<String>) -> Self {
        self.config.remote.folder_path = path.into();
        self
    }

    // --- cache ---

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache.dir = dir;
        self
    }

    pub fn cache_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.cache.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    // --- sync ---

    pub fn sync_longpoll_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.sync.longpoll_timeout_secs = seconds;
        self
    }

    pub fn sync_retry_delay_secs(mut self, seconds: u64) -> Self {
        self.config.sync.retry_delay_secs = seconds;
        self
    }

    // --- classifier ---

    pub fn classifier_exclude_duplicates(mut self, exclude: bool) -> Self {
        self.config.classifier.exclude_duplicates = exclude;
        self
    }

    // --- slideshow ---

    pub fn slideshow_interval_secs(mut self, seconds: u64) -> Self {
        self.config.slideshow.interval_secs = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- auth ---

    pub fn auth_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth.access_token = Some(token.into());
        self
    }

    pub fn auth_token_file(mut self, path: PathBuf) -> Self {
        self.config.auth.token_file = Some(path);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
