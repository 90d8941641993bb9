//! Configuration Management
//!
//! Persistent configuration for the admin panels, with environment overrides
//! for the API base URL and token storage location.

use crate::logging::LogLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_URL_ENV: &str = "CELLAR_ADMIN_API_URL";
pub const TOKEN_FILE_ENV: &str = "CELLAR_ADMIN_TOKEN_FILE";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

fn default_page_size() -> u32 {
    crate::resource::pagination::DEFAULT_LIMIT
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL, e.g. `https://api.example.com/api`
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// JSON storage file holding the `admin_token` key
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub log_level: LogLevel,
    /// YAML file with extra or replacement resource definitions
    #[serde(default)]
    pub resource_overrides: Option<PathBuf>,
    /// Store whose admin panel is opened
    #[serde(default)]
    pub store_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            token_file: None,
            page_size: default_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: LogLevel::default(),
            resource_overrides: None,
            store_id: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cellar-admin").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file; missing or corrupt files give defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective base URL (env > config > default)
    pub fn effective_api_url(&self) -> String {
        resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_base_url.as_deref())
    }

    /// Get effective token storage file (env > config > data dir)
    pub fn effective_token_file(&self) -> PathBuf {
        resolve_token_file(
            std::env::var_os(TOKEN_FILE_ENV).map(PathBuf::from),
            self.token_file.as_deref(),
        )
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Set store and save
    pub fn set_store(&mut self, store_id: &str) -> Result<()> {
        self.store_id = Some(store_id.to_string());
        self.save()
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn resolve_api_url(env: Option<String>, configured: Option<&str>) -> String {
    env.as_deref()
        .and_then(non_blank)
        .or_else(|| configured.and_then(non_blank))
        .unwrap_or(DEFAULT_API_URL)
        .trim_end_matches('/')
        .to_string()
}

pub fn resolve_token_file(env: Option<PathBuf>, configured: Option<&Path>) -> PathBuf {
    env.filter(|p| !p.as_os_str().is_empty())
        .or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or_else(default_token_file)
}

fn default_token_file() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("cellar-admin").join("storage.json");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cellar-admin").join("storage.json");
    }
    PathBuf::from("cellar-admin-storage.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_api_url_precedence() {
        assert_eq!(resolve_api_url(None, None), DEFAULT_API_URL);
        assert_eq!(
            resolve_api_url(None, Some("https://admin.example.com/api/")),
            "https://admin.example.com/api"
        );
        assert_eq!(
            resolve_api_url(Some("http://staging/api".into()), Some("https://prod/api")),
            "http://staging/api"
        );
        assert_eq!(resolve_api_url(Some("  ".into()), Some("https://prod/api")), "https://prod/api");
    }

    #[test]
    fn test_token_file_precedence() {
        let configured = PathBuf::from("/srv/admin/storage.json");
        assert_eq!(
            resolve_token_file(Some("/tmp/t.json".into()), Some(&configured)),
            PathBuf::from("/tmp/t.json")
        );
        assert_eq!(resolve_token_file(None, Some(&configured)), configured);
        assert!(resolve_token_file(None, None).ends_with("storage.json"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_base_url: Some("https://api.example.com".into()),
            page_size: 50,
            store_id: Some("store-7".into()),
            log_level: LogLevel::Debug,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_corrupt_or_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::write(&path, r#"{"page_size": 10}"#).unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
