use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::page::Resource;

/// Environment variable overriding `origin`
const ORIGIN_ENV: &str = "PWA_SHELL_ORIGIN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Shown as the page title and the default notification title
  pub app_name: String,
  /// Origin the worker is registered for; relative URLs resolve against it
  pub origin: String,
  /// Name of the current cache bucket. Bump to invalidate everything cached.
  pub cache_version: String,
  /// Paths and URLs cached at install time
  pub precache: Vec<String>,
  pub fallbacks: FallbacksConfig,
  pub notifications: NotificationsConfig,
  /// Entries rendered by the page controller
  pub resources: Vec<Resource>,
  /// Cache database location (defaults to the XDG data directory)
  pub cache_path: Option<PathBuf>,
}

/// Cached stand-ins served when the network is unreachable
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbacksConfig {
  /// Served for failed page navigations
  pub navigation: String,
  /// Served for failed image loads
  pub image: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
  /// Title used when a push payload has none (defaults to `app_name`)
  pub default_title: Option<String>,
  pub default_body: String,
  pub icon: String,
  pub badge: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      app_name: "pwa-shell".to_string(),
      origin: "http://localhost:8080/".to_string(),
      cache_version: "pwa-shell-v1".to_string(),
      precache: DEFAULT_PRECACHE.iter().map(|s| s.to_string()).collect(),
      fallbacks: FallbacksConfig::default(),
      notifications: NotificationsConfig::default(),
      resources: vec![Resource {
        title: "Getting started".to_string(),
        url: "./data/1".to_string(),
      }],
      cache_path: None,
    }
  }
}

impl Default for FallbacksConfig {
  fn default() -> Self {
    Self {
      navigation: "/index.html".to_string(),
      image: "/assets/icons/icon-512x512.png".to_string(),
    }
  }
}

impl Default for NotificationsConfig {
  fn default() -> Self {
    Self {
      default_title: None,
      default_body: "You have a new notification.".to_string(),
      icon: "/assets/icons/icon-192x192.png".to_string(),
      badge: "/assets/icons/badge-72x72.png".to_string(),
    }
  }
}

/// Application shell, icons and the web font stylesheet
const DEFAULT_PRECACHE: &[&str] = &[
  "/",
  "/index.html",
  "/css/styles.css",
  "/js/app.js",
  "/manifest.json",
  "/assets/icons/icon-72x72.png",
  "/assets/icons/icon-96x96.png",
  "/assets/icons/icon-128x128.png",
  "/assets/icons/icon-144x144.png",
  "/assets/icons/icon-152x152.png",
  "/assets/icons/icon-192x192.png",
  "/assets/icons/icon-384x384.png",
  "/assets/icons/icon-512x512.png",
  "/assets/icons/favicon.ico",
  "https://fonts.googleapis.com/css2?family=Noto+Sans+KR:wght@400;500;700&display=swap",
];

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pwa-shell.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pwa-shell/config.yaml
  ///
  /// Falls back to built-in defaults when no file exists.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        debug!("No configuration file found, using defaults");
        Config::default()
      }
    };

    config.with_env_overrides()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pwa-shell.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pwa-shell").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    debug!("Loaded configuration from {}", path.display());
    Ok(config)
  }

  fn with_env_overrides(self) -> Result<Self> {
    let config = match std::env::var(ORIGIN_ENV) {
      Ok(origin) => Self { origin, ..self },
      Err(_) => self,
    };

    // Fail at load time rather than on first use
    config.origin_url()?;
    Ok(config)
  }

  /// The worker origin as an absolute URL.
  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))
  }

  /// Title for notifications whose payload has none.
  pub fn default_notification_title(&self) -> &str {
    self
      .notifications
      .default_title
      .as_deref()
      .unwrap_or(&self.app_name)
  }

  /// Location of the cache database.
  pub fn database_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.cache_path {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("pwa-shell").join("cache.db"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_cover_shell_and_icons() {
    let config = Config::default();
    assert!(config.precache.iter().any(|p| p == "/index.html"));
    assert!(config.precache.iter().any(|p| p.starts_with("https://")));
    assert_eq!(
      config
        .precache
        .iter()
        .filter(|p| p.contains("/icons/icon-"))
        .count(),
      8
    );
    assert_eq!(config.default_notification_title(), "pwa-shell");
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let yaml = r#"
app_name: saltnlight
origin: https://saltnlight.example/
cache_version: saltnlight-v2
notifications:
  default_body: Something new
resources:
  - title: First
    url: ./data/1
  - title: Second
    url: ./data/2
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.cache_version, "saltnlight-v2");
    assert_eq!(
      config.origin_url().unwrap().host_str(),
      Some("saltnlight.example")
    );
    assert_eq!(config.resources.len(), 2);
    assert_eq!(config.notifications.default_body, "Something new");
    assert_eq!(config.notifications.icon, "/assets/icons/icon-192x192.png");
    assert_eq!(config.fallbacks.navigation, "/index.html");
    assert_eq!(config.default_notification_title(), "saltnlight");
  }

  #[test]
  fn test_invalid_origin_is_rejected() {
    let config: Config = serde_yaml::from_str("origin: not a url\n").unwrap();
    assert!(config.origin_url().is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/pwa-shell.yaml"))).is_err());
  }

  #[test]
  fn test_explicit_cache_path_wins() {
    let config = Config {
      cache_path: Some(PathBuf::from("/tmp/cache.db")),
      ..Config::default()
    };
    assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/cache.db"));
  }
}
