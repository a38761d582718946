//! Tracker configuration.
//!
//! Loaded from a TOML file (`$TRACKER_CONFIG`, else
//! `~/.config/agenda-tracker/tracker.toml`). Every key is optional; a missing
//! file yields the built-in defaults. API keys are never read from the file,
//! only from the environment (see [`ApiKeys::from_env`]).
//!
//! ```toml
//! [llm]
//! model = "gpt-4o-mini"
//!
//! [progress]
//! fallback = "zero"
//!
//! [[alerts]]
//! category = "Media Subversion"
//! threshold = 60
//! reason = "Media capture accelerating."
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alert::{AlertRule, default_rules};
use crate::api_clients::{news, openai};
use crate::prediction::{PredictionSeed, default_seeds};
use crate::progress::{DEFAULT_INITIAL_PROGRESS, MAX_PROGRESS, ProgressFallback};

/// Env var that overrides the config file location.
pub const CONFIG_PATH_ENV_VAR: &str = "TRACKER_CONFIG";
pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const NEWS_API_KEY_ENV_VAR: &str = "NEWS_API_KEY";

const CONFIG_DIR_NAME: &str = "agenda-tracker";
const CONFIG_FILE_NAME: &str = "tracker.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where [`TrackerConfig::load_with_source`] got its values from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The default location had no file.
    Missing(PathBuf),
    NoConfigDir,
}

impl ConfigSource {
    /// Binaries load config before the subscriber exists, so they call this
    /// once tracing is initialized.
    pub fn log(&self) {
        match self {
            Self::File(path) => tracing::info!(path = %path.display(), "loaded config"),
            Self::Missing(path) => {
                tracing::info!(path = %path.display(), "config file not found; using defaults");
            }
            Self::NoConfigDir => tracing::info!("no config directory; using defaults"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub news: NewsConfig,
    pub rss: RssConfig,
    pub progress: ProgressConfig,
    pub alerts: Vec<AlertRule>,
    pub predictions: Vec<PredictionSeed>,
    pub log: LogConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            news: NewsConfig::default(),
            rss: RssConfig::default(),
            progress: ProgressConfig::default(),
            alerts: default_rules(),
            predictions: default_seeds(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// How long a successful status judgment is reused. 0 disables.
    #[serde(default = "default_score_cache_ttl_secs")]
    pub score_cache_ttl_secs: u64,
}

fn default_llm_base_url() -> String {
    openai::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    openai::DEFAULT_MODEL.to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_score_cache_ttl_secs() -> u64 {
    600
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            timeout_secs: default_llm_timeout_secs(),
            score_cache_ttl_secs: default_score_cache_ttl_secs(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn score_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.score_cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewsConfig {
    pub base_url: String,
    pub language: String,
    pub sort_by: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    /// Prepended to every search, e.g. `"Project 2025 Judicial Defiance"`.
    pub query_prefix: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: news::DEFAULT_BASE_URL.to_string(),
            language: "en".to_string(),
            sort_by: "relevancy".to_string(),
            page_size: 5,
            timeout_secs: 10,
            query_prefix: "Project 2025".to_string(),
        }
    }
}

impl NewsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RssConfig {
    pub feeds: Vec<String>,
    pub entries_per_feed: usize,
    pub timeout_secs: u64,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            feeds: vec![
                "http://feeds.reuters.com/Reuters/worldNews".to_string(),
                "http://feeds.bbci.co.uk/news/world/rss.xml".to_string(),
                "https://apnews.com/rss/apf-topnews".to_string(),
            ],
            entries_per_feed: 1,
            timeout_secs: 10,
        }
    }
}

impl RssConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgressConfig {
    pub initial: u8,
    pub fallback: ProgressFallback,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_PROGRESS,
            fallback: ProgressFallback::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl TrackerConfig {
    /// Default config file location, if a config dir can be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Resolve the path to read: explicit argument, then `$TRACKER_CONFIG`,
    /// then the default location.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| {
                std::env::var_os(CONFIG_PATH_ENV_VAR)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .or_else(Self::default_path)
    }

    /// Load from the resolved path. An explicitly named file must exist; the
    /// default location may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_source(explicit).map(|(config, _)| config)
    }

    pub fn load_with_source(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let must_exist =
            explicit.is_some() || std::env::var_os(CONFIG_PATH_ENV_VAR).is_some_and(|v| !v.is_empty());
        let Some(path) = Self::resolve_path(explicit) else {
            return Ok((Self::default(), ConfigSource::NoConfigDir));
        };
        if !must_exist && !path.exists() {
            return Ok((Self::default(), ConfigSource::Missing(path)));
        }
        let config = Self::load_from_path(&path)?;
        Ok((config, ConfigSource::File(path)))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        if !(1..=100).contains(&self.news.page_size) {
            return Err(ConfigError::Invalid(format!(
                "news.page_size must be between 1 and 100, got {}",
                self.news.page_size
            )));
        }
        if self.rss.feeds.is_empty() {
            return Err(ConfigError::Invalid(
                "rss.feeds must list at least one feed".to_string(),
            ));
        }
        if self.progress.initial > MAX_PROGRESS {
            return Err(ConfigError::Invalid(format!(
                "progress.initial must be at most {MAX_PROGRESS}, got {}",
                self.progress.initial
            )));
        }
        if let Some(rule) = self.alerts.iter().find(|r| r.threshold > MAX_PROGRESS) {
            return Err(ConfigError::Invalid(format!(
                "alert threshold for {} must be at most {MAX_PROGRESS}, got {}",
                rule.category, rule.threshold
            )));
        }
        Ok(())
    }
}

/// Credentials, read from the environment only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub news: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &self.openai.as_ref().map(|_| "<redacted>"))
            .field("news", &self.news.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ApiKeys {
    pub fn from_env() -> Self {
        fn read(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        let keys = Self {
            openai: read(OPENAI_API_KEY_ENV_VAR),
            news: read(NEWS_API_KEY_ENV_VAR),
        };
        if keys.openai.is_none() {
            tracing::warn!("{OPENAI_API_KEY_ENV_VAR} is not set; model judgments will fall back");
        }
        if keys.news.is_none() {
            tracing::warn!("{NEWS_API_KEY_ENV_VAR} is not set; news searches will return nothing");
        }
        keys
    }
}
