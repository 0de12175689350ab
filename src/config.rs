use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "discord-ghost";
const CONFIG_FILE: &str = "config.json";

fn default_locale() -> String {
    "en".to_owned()
}

fn default_poll_interval_ms() -> u64 {
    15_000
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found at {0}; create it with your Bungie API key, Discord application id and linked accounts")]
    NotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config has an empty api_key")]
    MissingApiKey,

    #[error("config lists no linked accounts")]
    NoAccounts,

    #[error("could not determine a {0} directory for this platform")]
    NoBaseDir(&'static str),
}

/// One Bungie membership to poll, e.g. `{"membership_type": 3,
/// "membership_id": "4611686018467260757"}` for a Steam account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub membership_type: i32,
    pub membership_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: String,
    pub discord_app_id: i64,
    pub accounts: Vec<LinkedAccount>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE))
            .ok_or(ConfigError::NoBaseDir("config"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!("loading config from {}", path.display());

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_owned()));
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;

        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if config.accounts.is_empty() {
            return Err(ConfigError::NoAccounts);
        }

        Ok(config)
    }

    /// Directory holding the cached world content database.
    pub fn manifest_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|dir| dir.join(CONFIG_DIR_NAME).join("manifest"))
                .ok_or(ConfigError::NoBaseDir("local data")),
        }
    }
}
