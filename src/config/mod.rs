use serde::{Deserialize, Serialize};
use std::fs;

/// snapkv configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
  /// Snapshot file used for persistence
  #[serde(default = "default_store_file")]
  pub store_file: String,

  /// Server listening address
  #[serde(default = "default_listen_addr")]
  pub listen_addr: String,
}

fn default_store_file() -> String {
  "snapkv.db.json".to_string()
}

fn default_listen_addr() -> String {
  "127.0.0.1:5000".to_string()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      store_file: default_store_file(),
      listen_addr: default_listen_addr(),
    }
  }
}

impl Config {
  /// Load configuration from TOML file
  pub fn from_file(path: &str) -> anyhow::Result<Self> {
    let config_str = fs::read_to_string(path)
      .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;

    let config: Config = toml::from_str(&config_str)
      .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path, e))?;

    Ok(config)
  }
}
