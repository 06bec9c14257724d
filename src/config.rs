use log::info;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use crate::engine::Difficulty;
use crate::error::LobbyResult;

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_ENV: &str = "CHESS_LOBBY_CONFIG";

/// Server settings. Every field has a default, so an empty file is valid.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub static_dir: PathBuf,
    /// Captures are appended here as JSON lines when set
    pub ledger_path: Option<PathBuf>,
    pub queue_ttl_secs: u64,
    /// How often a connection recounts the waiting players
    pub queue_poll_secs: u64,
    pub join_timeout_secs: u64,
    pub default_difficulty: Difficulty,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            static_dir: PathBuf::from("./static"),
            ledger_path: None,
            queue_ttl_secs: 60,
            queue_poll_secs: 5,
            join_timeout_secs: 15,
            default_difficulty: Difficulty::Medium,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> LobbyResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read the file named by [`CONFIG_ENV`], or fall back to defaults when
    /// the variable is unset. A named file that is missing or malformed is an error.
    pub fn load() -> LobbyResult<Self> {
        match env::var(CONFIG_ENV) {
            Ok(path) => {
                info!("Loading configuration from {}", path);
                Self::from_toml(&fs::read_to_string(path)?)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl_secs)
    }

    pub fn queue_poll(&self) -> Duration {
        Duration::from_secs(self.queue_poll_secs.max(1))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}
