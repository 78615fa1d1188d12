//! CLI argument definitions for the PawChat terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::Parser;
use pawchat_core::config::PawchatConfig;
use pawchat_core::types::{ChatMode, UserId};

/// PawChat: chat with the clinic, or with its automated assistant.
#[derive(Parser, Debug)]
#[command(name = "pawchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Account id of the user chatting.
    #[arg(short = 'u', long = "user-id")]
    pub user_id: Option<i64>,

    /// Base URL of the clinic API.
    #[arg(short = 'b', long = "base-url")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Start in assisted mode instead of talking to staff.
    #[arg(long = "assisted")]
    pub assisted: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PAWCHAT_CONFIG env var > ~/.pawchat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(env_var)
    }

    /// Resolve the chatting user.
    ///
    /// Priority: --user-id flag > PAWCHAT_USER_ID env var. There is no default.
    pub fn resolve_user_id(&self) -> Option<UserId> {
        self.resolve_user_id_with(env_var)
    }

    /// Apply flag and environment overrides on top of the loaded config.
    pub fn apply(&self, config: &mut PawchatConfig) {
        self.apply_with(config, env_var)
    }

    fn resolve_config_path_with(&self, env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env("PAWCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    fn resolve_user_id_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<UserId> {
        if let Some(id) = self.user_id {
            return Some(UserId(id));
        }
        env("PAWCHAT_USER_ID")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(UserId)
    }

    fn apply_with(&self, config: &mut PawchatConfig, env: impl Fn(&str) -> Option<String>) {
        if let Some(url) = self.base_url.clone().or_else(|| env("PAWCHAT_BASE_URL")) {
            config.remote.base_url = url;
        }
        if let Some(level) = self.log_level.clone().or_else(|| env("PAWCHAT_LOG_LEVEL")) {
            config.general.log_level = level;
        }
        if self.assisted || env("PAWCHAT_ASSISTED").is_some_and(|v| is_truthy(&v)) {
            config.chat.initial_mode = ChatMode::Assisted;
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".pawchat").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".pawchat").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(argv: &[&str]) -> CliArgs {
        let mut full = vec!["pawchat"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_config_path_flag_wins() {
        let a = args(&["--config", "/tmp/flag.toml"]);
        let path = a.resolve_config_path_with(env_of(&[("PAWCHAT_CONFIG", "/tmp/env.toml")]));
        assert_eq!(path, PathBuf::from("/tmp/flag.toml"));
    }

    #[test]
    fn test_config_path_from_env() {
        let path = args(&[]).resolve_config_path_with(env_of(&[("PAWCHAT_CONFIG", "/tmp/env.toml")]));
        assert_eq!(path, PathBuf::from("/tmp/env.toml"));
    }

    #[test]
    fn test_config_path_default_ends_with_config_toml() {
        let path = args(&[]).resolve_config_path_with(no_env);
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_user_id_priority() {
        let env = env_of(&[("PAWCHAT_USER_ID", "9")]);
        assert_eq!(args(&["-u", "5"]).resolve_user_id_with(&env), Some(UserId(5)));
        assert_eq!(args(&[]).resolve_user_id_with(&env), Some(UserId(9)));
        assert_eq!(args(&[]).resolve_user_id_with(no_env), None);
    }

    #[test]
    fn test_user_id_env_garbage_is_ignored() {
        let env = env_of(&[("PAWCHAT_USER_ID", "abc")]);
        assert_eq!(args(&[]).resolve_user_id_with(env), None);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = PawchatConfig::default();
        args(&["--base-url", "https://vet.example/api", "--assisted", "-l", "debug"])
            .apply_with(&mut config, no_env);
        assert_eq!(config.remote.base_url, "https://vet.example/api");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.chat.initial_mode, ChatMode::Assisted);
    }

    #[test]
    fn test_apply_env_below_flags() {
        let mut config = PawchatConfig::default();
        let env = env_of(&[
            ("PAWCHAT_BASE_URL", "https://env.example/api"),
            ("PAWCHAT_LOG_LEVEL", "warn"),
            ("PAWCHAT_ASSISTED", "yes"),
        ]);
        args(&["--base-url", "https://flag.example/api"]).apply_with(&mut config, env);
        assert_eq!(config.remote.base_url, "https://flag.example/api");
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.chat.initial_mode, ChatMode::Assisted);
    }

    #[test]
    fn test_apply_without_overrides_keeps_config() {
        let mut config = PawchatConfig::default();
        config.remote.base_url = "https://file.example/api".to_string();
        args(&[]).apply_with(&mut config, env_of(&[("PAWCHAT_ASSISTED", "0")]));
        assert_eq!(config.remote.base_url, "https://file.example/api");
        assert_eq!(config.chat.initial_mode, ChatMode::HumanRelayed);
    }
}
