use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cache::SqliteStorage;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the user service, e.g. `https://api.example.com/v1`
  pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds after a fetch during which the user list is not refetched
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Keep a local mirror of the last response
  #[serde(default = "default_persist")]
  pub persist: bool,
  /// Mirror database location (defaults to the user data directory)
  pub mirror_path: Option<PathBuf>,
}

fn default_stale_secs() -> u64 {
  300
}

fn default_persist() -> bool {
  true
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      persist: default_persist(),
      mirror_path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./userdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/userdesk/config.yaml
  ///
  /// Without any file the defaults are used; the base URL can then come
  /// from the environment alone.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => {
        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("userdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("userdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Get the user service base URL, if one is set.
  ///
  /// Checks USERDESK_API_BASE_URL first, then API_BASE_URL, then the config file.
  pub fn api_base_url(&self) -> Result<Option<Url>> {
    let raw = std::env::var("USERDESK_API_BASE_URL")
      .or_else(|_| std::env::var("API_BASE_URL"))
      .ok()
      .or_else(|| self.api.base_url.clone());

    raw
      .map(|raw| Url::parse(&raw).map_err(|e| eyre!("Invalid API base URL '{}': {}", raw, e)))
      .transpose()
  }

  /// Location of the mirror database.
  pub fn mirror_path(&self) -> Result<PathBuf> {
    match &self.cache.mirror_path {
      Some(path) => Ok(path.clone()),
      None => SqliteStorage::default_path(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.cache.stale_secs, 300);
    assert!(config.cache.persist);
    assert!(config.api.base_url.is_none());
  }

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
api:
  base_url: https://api.example.com/v1
cache:
  stale_secs: 60
  persist: false
  mirror_path: /tmp/userdesk/mirror.db
"#,
    )
    .unwrap();

    assert_eq!(
      config.api.base_url.as_deref(),
      Some("https://api.example.com/v1")
    );
    assert_eq!(config.cache.stale_secs, 60);
    assert!(!config.cache.persist);
    assert_eq!(
      config.mirror_path().unwrap(),
      PathBuf::from("/tmp/userdesk/mirror.db")
    );
  }

  #[test]
  fn test_partial_cache_section() {
    let config = Config::parse("cache:\n  stale_secs: 10\n").unwrap();
    assert_eq!(config.cache.stale_secs, 10);
    assert!(config.cache.persist);
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api:\n  base_url: http://localhost:8080").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(
      config.api.base_url.as_deref(),
      Some("http://localhost:8080")
    );
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("nope.yaml"))).is_err());
  }

  #[test]
  fn test_invalid_yaml_is_an_error() {
    assert!(Config::parse("cache: [").is_err());
  }
}
