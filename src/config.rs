use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the Clipt sync engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote service locations
    pub services: ServiceConfig,

    /// Navigation sequence settings
    pub navigation: NavigationConfig,

    /// Playback synchronizer settings
    pub playback: PlaybackConfig,

    /// Assistant conversation texts
    pub assistant: AssistantConfig,

    /// Persisted search-result store
    pub storage: StorageConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the backend (query, chat, summary, landing pages)
    pub backend_url: String,

    /// Path of the conversational endpoint
    pub chat_path: String,

    /// Path of the full-text query endpoint
    pub query_path: String,

    /// Path of the summary endpoint
    pub summary_path: String,

    /// Base URL transcripts are fetched from (`{base}/{video_id}.json`)
    pub transcript_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Matching window between a requested offset and a stored offset
    pub offset_tolerance_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How long a programmatic seek waits for the next play event
    pub seek_settle_timeout_ms: u64,

    /// Template for the player source, `{video_id}` is substituted
    pub source_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// First assistant message of every conversation
    pub greeting: Option<String>,

    /// Text shown while an answer is pending
    pub placeholder_text: String,

    /// Text used when the service returns neither answer nor error
    pub fallback_text: String,

    /// Text used when the service cannot be reached
    pub transport_error_text: String,

    /// Text used when a search query fails
    pub query_error_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding persisted search results for this session
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub log_level: String,
}

impl ServiceConfig {
    pub fn chat_url(&self) -> String {
        join_url(&self.backend_url, &self.chat_path)
    }

    pub fn query_url(&self) -> String {
        join_url(&self.backend_url, &self.query_path)
    }

    pub fn summary_url(&self) -> String {
        join_url(&self.backend_url, &self.summary_path)
    }

    pub fn login_url(&self) -> String {
        join_url(&self.backend_url, "/login")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl PlaybackConfig {
    pub fn seek_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_settle_timeout_ms)
    }

    /// Player source reference for a video
    pub fn source_for(&self, video_id: &str) -> String {
        self.source_template.replace("{video_id}", video_id)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = ["clipt-sync.toml", "config/clipt-sync.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str)?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CLIPT_BACKEND_URL") {
            config.services.backend_url = url;
        }

        if let Ok(url) = std::env::var("CLIPT_TRANSCRIPT_URL") {
            config.services.transcript_base_url = url;
        }

        if let Ok(dir) = std::env::var("CLIPT_STORE_DIR") {
            config.storage.store_dir = PathBuf::from(dir);
        }

        if let Ok(timeout) = std::env::var("CLIPT_SEEK_TIMEOUT_MS") {
            config.playback.seek_settle_timeout_ms = timeout.parse().unwrap_or(1500);
        }

        if let Ok(log_level) = std::env::var("CLIPT_LOG_LEVEL") {
            config.logging.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.services.backend_url)
            .map_err(|e| anyhow!("backend_url is not a valid URL: {}", e))?;

        url::Url::parse(&self.services.transcript_base_url)
            .map_err(|e| anyhow!("transcript_base_url is not a valid URL: {}", e))?;

        if self.services.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        if !self.navigation.offset_tolerance_seconds.is_finite() || self.navigation.offset_tolerance_seconds < 0.0 {
            return Err(anyhow!("offset_tolerance_seconds must be a non-negative number"));
        }

        if self.playback.seek_settle_timeout_ms == 0 {
            return Err(anyhow!("seek_settle_timeout_ms must be greater than 0"));
        }

        if !self.playback.source_template.contains("{video_id}") {
            return Err(anyhow!("source_template must contain {{video_id}}"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Clipt Sync Configuration:\n\
            - Backend: {}\n\
            - Transcripts: {}\n\
            - Offset Tolerance: {}s\n\
            - Seek Settle Timeout: {}ms\n\
            - Store Directory: {}",
            self.services.backend_url,
            self.services.transcript_base_url,
            self.navigation.offset_tolerance_seconds,
            self.playback.seek_settle_timeout_ms,
            self.storage.store_dir.display(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: ServiceConfig {
                backend_url: "https://aivideo.planeteria.com".to_string(),
                chat_path: "/api/llm_chat".to_string(),
                query_path: "/api/query".to_string(),
                summary_path: "/api/summary".to_string(),
                transcript_base_url: "https://video-search-training-bucket.s3.us-east-2.amazonaws.com/transcripts".to_string(),
                request_timeout_seconds: 30,
            },
            navigation: NavigationConfig {
                offset_tolerance_seconds: 2.0,
            },
            playback: PlaybackConfig {
                seek_settle_timeout_ms: 1500,
                source_template: "https://www.youtube.com/watch?v={video_id}".to_string(),
            },
            assistant: AssistantConfig {
                greeting: Some("Hi! Ask me anything about this video.".to_string()),
                placeholder_text: "Thinking...".to_string(),
                fallback_text: "Sorry, I couldn't find an answer.".to_string(),
                transport_error_text: "Error contacting server.".to_string(),
                query_error_text: "Error occurred during query. Please try again.".to_string(),
            },
            storage: StorageConfig {
                store_dir: PathBuf::from(".clipt_session"),
            },
            logging: LoggingConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.services.backend_url = url.into();
        self
    }

    pub fn with_transcript_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.services.transcript_base_url = url.into();
        self
    }

    pub fn with_store_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.store_dir = dir;
        self
    }

    pub fn with_offset_tolerance(mut self, seconds: f64) -> Self {
        self.config.navigation.offset_tolerance_seconds = seconds;
        self
    }

    pub fn with_seek_settle_timeout_ms(mut self, millis: u64) -> Self {
        self.config.playback.seek_settle_timeout_ms = millis;
        self
    }

    pub fn with_greeting(mut self, greeting: Option<String>) -> Self {
        self.config.assistant.greeting = greeting;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.navigation.offset_tolerance_seconds, 2.0);
        assert_eq!(config.services.chat_url(), "https://aivideo.planeteria.com/api/llm_chat");
        assert_eq!(config.services.login_url(), "https://aivideo.planeteria.com/login");
        assert_eq!(
            config.playback.source_for("abc123"),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_backend_url("http://localhost:5000/")
            .with_offset_tolerance(0.5)
            .with_seek_settle_timeout_ms(250)
            .with_greeting(None)
            .build();

        assert_eq!(config.services.query_url(), "http://localhost:5000/api/query");
        assert_eq!(config.navigation.offset_tolerance_seconds, 0.5);
        assert_eq!(config.playback.seek_settle_timeout(), Duration::from_millis(250));
        assert!(config.assistant.greeting.is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let bad = ConfigBuilder::new().with_backend_url("not a url").build();
        assert!(bad.validate().is_err());

        let bad = ConfigBuilder::new().with_offset_tolerance(-1.0).build();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clipt-sync.toml");

        let config = ConfigBuilder::new().with_seek_settle_timeout_ms(900).build();
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.playback.seek_settle_timeout_ms, 900);
        assert_eq!(loaded.services.backend_url, config.services.backend_url);
    }
}
