use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AutoReplyError, Result};
use crate::models::TextEncoding;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
    #[serde(default = "default_max_threads")]
    pub max_threads: u32,
    /// Gmail search query applied to the thread list, e.g. "in:inbox"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_replies")]
    pub max_concurrent_replies: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            max_threads: default_max_threads(),
            query: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_replies: default_max_concurrent_replies(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_html")]
    pub html: String,
    #[serde(default)]
    pub text_encoding: TextEncoding,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            text: default_text(),
            html: default_html(),
            text_encoding: TextEncoding::default(),
            dry_run: false,
        }
    }
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_min_interval_secs() -> u64 {
    50
}

fn default_max_interval_secs() -> u64 {
    120
}

fn default_max_threads() -> u32 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_replies() -> usize {
    10
}

fn default_subject() -> String {
    "Re: {subject}".to_string()
}

fn default_text() -> String {
    "Thanks for your message. I am currently away and will get back to you when I return."
        .to_string()
}

fn default_html() -> String {
    "<p>Thanks for your message. I am currently away and will get back to you when I return.</p>"
        .to_string()
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AutoReplyError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AutoReplyError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AutoReplyError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AutoReplyError::Config(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| AutoReplyError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.poll.min_interval_secs == 0 {
            return Err(AutoReplyError::Config(
                "poll.min_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.poll.max_interval_secs <= self.poll.min_interval_secs {
            return Err(AutoReplyError::Config(format!(
                "poll.max_interval_secs ({}) must be greater than poll.min_interval_secs ({})",
                self.poll.max_interval_secs, self.poll.min_interval_secs
            )));
        }

        if self.poll.max_threads == 0 {
            return Err(AutoReplyError::Config(
                "poll.max_threads must be at least 1".to_string(),
            ));
        }
        // threads.list caps maxResults at 500
        if self.poll.max_threads > 500 {
            return Err(AutoReplyError::Config(
                "poll.max_threads cannot exceed 500".to_string(),
            ));
        }

        if self.poll.request_timeout_secs == 0 {
            return Err(AutoReplyError::Config(
                "poll.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.poll.max_concurrent_replies == 0 {
            return Err(AutoReplyError::Config(
                "poll.max_concurrent_replies must be at least 1".to_string(),
            ));
        }

        if self.reply.subject.trim().is_empty() {
            return Err(AutoReplyError::Config(
                "reply.subject cannot be empty".to_string(),
            ));
        }
        if self.reply.text.trim().is_empty() {
            return Err(AutoReplyError::Config(
                "reply.text cannot be empty".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
