//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: backend
//! location, public endpoints, session timing, and where tokens are stored.
//!
//! Configuration is stored at `~/.config/storefront/config.json`. Missing
//! fields fall back to defaults, and `STOREFRONT_API_URL` overrides the
//! backend base URL.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::api::public::{DEFAULT_AUTH_ROOT, DEFAULT_PRODUCTS_ROOT};
use crate::api::PublicEndpoints;
use crate::auth::SessionConfig;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "storefront";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

/// Where the credential pair is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    #[default]
    Keyring,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub auth_path: String,
    pub products_path: String,
    /// Extra credential-free paths on top of the auth and catalogue routes
    pub public_endpoints: Vec<String>,
    pub refresh_cooldown_secs: u64,
    pub refresh_buffer_secs: i64,
    pub request_timeout_secs: u64,
    pub token_store: TokenStoreKind,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://localhost:7200".to_string(),
            auth_path: DEFAULT_AUTH_ROOT.to_string(),
            products_path: DEFAULT_PRODUCTS_ROOT.to_string(),
            public_endpoints: Vec::new(),
            refresh_cooldown_secs: 5,
            refresh_buffer_secs: 300,
            request_timeout_secs: 30,
            token_store: TokenStoreKind::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location, applying environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Record the last login email in the file at `path`.
    ///
    /// Only `last_email` changes; the rest of the file is written back as
    /// read, without environment or command-line overrides.
    pub fn remember_email(path: &Path, email: &str) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.last_email = Some(email.to_string());
        config.save_to(path)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Per-origin cache directory, used by the file token store
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(self.origin_dir_name()))
    }

    /// Scheme, host and port of the backend
    pub fn origin(&self) -> Result<String> {
        let url = url::Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.api_base_url))?;
        Ok(url.origin().ascii_serialization())
    }

    fn origin_dir_name(&self) -> String {
        let origin = self.origin().unwrap_or_else(|_| self.api_base_url.clone());
        origin
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            refresh_cooldown: StdDuration::from_secs(self.refresh_cooldown_secs),
            refresh_buffer: Duration::seconds(self.refresh_buffer_secs),
        }
    }

    pub fn public_endpoints(&self) -> PublicEndpoints {
        PublicEndpoints::new(&self.public_endpoints)
            .with_auth_root(&self.auth_path)
            .with_products_root(&self.products_path)
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.token_store, TokenStoreKind::Keyring);
        assert_eq!(config.session_config().refresh_cooldown, StdDuration::from_secs(5));
        assert_eq!(config.session_config().refresh_buffer, Duration::minutes(5));
        assert_eq!(config.origin().unwrap(), "https://localhost:7200");
        let public = config.public_endpoints();
        assert!(public.matches(&Method::POST, "/api/User/login"));
        assert!(public.matches(&Method::GET, "/api/Products/3"));
        assert!(!public.matches(&Method::DELETE, "/api/Products/3"));
    }

    #[test]
    fn test_public_endpoints_follow_auth_path() {
        let config = Config {
            auth_path: "/api/Account".to_string(),
            public_endpoints: vec!["/health".to_string()],
            ..Config::default()
        };
        let public = config.public_endpoints();
        assert!(public.matches(&Method::POST, "/api/Account/login"));
        assert!(public.matches(&Method::POST, "/api/Account/register"));
        assert!(public.matches(&Method::POST, "/api/Account/refresh-token"));
        assert!(!public.matches(&Method::POST, "/api/User/login"));
        assert!(public.matches(&Method::GET, "/health"));
    }

    #[test]
    fn test_remember_email_keeps_file_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_base_url":"https://shop.example.com","token_store":"file"}"#).unwrap();

        Config::remember_email(&path, "ada@example.com").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_email.as_deref(), Some("ada@example.com"));
        assert_eq!(loaded.api_base_url, "https://shop.example.com");
        assert_eq!(loaded.token_store, TokenStoreKind::File);
    }

    #[test]
    fn test_remember_email_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storefront").join("config.json");

        Config::remember_email(&path, "ada@example.com").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_email.as_deref(), Some("ada@example.com"));
        assert_eq!(loaded.api_base_url, Config::default().api_base_url);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_base_url":"https://shop.example.com/","token_store":"file"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.token_store, TokenStoreKind::File);
        assert_eq!(config.auth_path, "/api/User");
        assert_eq!(config.origin().unwrap(), "https://shop.example.com");
        assert_eq!(config.origin_dir_name(), "https___shop.example.com");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_email: Some("ada@example.com".to_string()),
            refresh_cooldown_secs: 9,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_email.as_deref(), Some("ada@example.com"));
        assert_eq!(loaded.refresh_cooldown_secs, 9);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.api_base_url, Config::default().api_base_url);
    }
}
