use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PawchatError, Result};
use crate::types::{ChatMode, UserId};

/// Top-level configuration for the PawChat client.
///
/// Loaded from `~/.pawchat/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PawchatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl PawchatConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PawchatConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PawchatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the chat engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chat.poll_interval_secs == 0 {
            return Err(PawchatError::Config(
                "chat.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.chat.max_message_chars == 0 {
            return Err(PawchatError::Config(
                "chat.max_message_chars must be at least 1".to_string(),
            ));
        }
        if self.remote.base_url.trim().is_empty() {
            return Err(PawchatError::Config("remote.base_url is empty".to_string()));
        }
        Ok(())
    }
}

/// General client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Remote conversation store endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    pub messages_path: String,
    pub start_conversation_path: String,
    pub save_message_path: String,
    pub admins_path: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1/api".to_string(),
            request_timeout_secs: 10,
            messages_path: "/messages".to_string(),
            start_conversation_path: "/messages/start_conversation".to_string(),
            save_message_path: "/messages/save_message".to_string(),
            admins_path: "/users/get_admins".to_string(),
        }
    }
}

impl RemoteConfig {
    /// Join `base_url` and an endpoint path with exactly one slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Chat session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// The fixed admin every conversation is opened with.
    pub counterpart_id: UserId,
    /// Seconds between refreshes while in human-relayed mode.
    pub poll_interval_secs: u64,
    /// Longest accepted message, in characters.
    pub max_message_chars: usize,
    /// Mode a new session starts in.
    pub initial_mode: ChatMode,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            counterpart_id: UserId(1),
            poll_interval_secs: 5,
            max_message_chars: 2000,
            initial_mode: ChatMode::HumanRelayed,
        }
    }
}
