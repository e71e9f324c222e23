//! Client configuration.
//!
//! Values come from an optional JSON file and are then overridden by
//! environment variables. The API token is only ever read from the
//! environment and never written back to disk.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::{SyncOptions, DEFAULT_PAGE_SIZE};
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_API_URL: &str = "PIXNOTE_API_URL";
pub const ENV_API_TOKEN: &str = "PIXNOTE_API_TOKEN";
pub const ENV_PAGE_SIZE: &str = "PIXNOTE_PAGE_SIZE";

pub const MAX_PAGE_SIZE: usize = 200;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the remote document API; no remote when unset.
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            api_token: None,
        }
    }
}

impl ClientConfig {
    /// Parse and normalize a JSON config document.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::InvalidInput(format!("invalid config JSON: {error}")))?;
        config.normalized()
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(payload) => Self::from_json(&payload),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }

    /// Write the file-backed fields to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    /// Apply `PIXNOTE_*` overrides looked up through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_API_TOKEN)) {
            self.api_token = Some(token);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_PAGE_SIZE)) {
            self.page_size = raw.parse().map_err(|_| {
                Error::InvalidInput(format!("{ENV_PAGE_SIZE} must be a positive integer, got '{raw}'"))
            })?;
        }
        self.normalized()
    }

    /// File config at `path` (when given) plus process environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Trim values and validate ranges.
    pub fn normalized(mut self) -> Result<Self> {
        self.api_base_url = normalize_text_option(self.api_base_url)
            .map(|url| normalize_http_url(&url))
            .transpose()?;
        self.api_token = normalize_text_option(self.api_token);

        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::InvalidInput(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(self)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            page_size: self.page_size,
        }
    }
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn normalize_http_url(value: &str) -> Result<String> {
    if is_http_url(value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "api_base_url must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_env(config: ClientConfig, vars: &[(&str, &str)]) -> Result<ClientConfig> {
        let map = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        config.with_env_overrides(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_size, 20);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_unknown_fields() {
        let error = ClientConfig::from_json(r#"{"api_token": "x"}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn base_url_is_normalized() {
        let config =
            ClientConfig::from_json(r#"{"api_base_url": "  https://api.example.com/ "}"#).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));

        let config = ClientConfig::from_json(r#"{"api_base_url": "   "}"#).unwrap();
        assert_eq!(config.api_base_url, None);

        assert!(ClientConfig::from_json(r#"{"api_base_url": "ftp://x"}"#).is_err());
    }

    #[test]
    fn page_size_is_bounded() {
        assert!(ClientConfig::from_json(r#"{"page_size": 0}"#).is_err());
        assert!(ClientConfig::from_json(r#"{"page_size": 201}"#).is_err());
        assert_eq!(
            ClientConfig::from_json(r#"{"page_size": 200}"#).unwrap().page_size,
            200
        );
    }

    #[test]
    fn env_overrides_file_values() {
        let file = ClientConfig::from_json(
            r#"{"api_base_url": "https://file.example.com", "page_size": 5}"#,
        )
        .unwrap();
        let config = with_env(
            file,
            &[
                (ENV_API_URL, "https://env.example.com/"),
                (ENV_PAGE_SIZE, "50"),
                (ENV_API_TOKEN, " secret "),
            ],
        )
        .unwrap();

        assert_eq!(config.api_base_url.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.sync_options().page_size, 50);
    }

    #[test]
    fn invalid_env_page_size_is_reported() {
        let error = with_env(ClientConfig::default(), &[(ENV_PAGE_SIZE, "lots")]).unwrap_err();
        assert!(error.to_string().contains(ENV_PAGE_SIZE));
    }

    #[test]
    fn debug_redacts_token() {
        let config = with_env(ClientConfig::default(), &[(ENV_API_TOKEN, "hunter2")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn token_is_never_serialized() {
        let config = with_env(ClientConfig::default(), &[(ENV_API_TOKEN, "hunter2")]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn save_then_load_drops_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = with_env(
            ClientConfig {
                api_base_url: Some("https://api.example.com".into()),
                ..ClientConfig::default()
            },
            &[(ENV_API_TOKEN, "hunter2")],
        )
        .unwrap();

        config.save(&path).unwrap();
        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.api_base_url, config.api_base_url);
        assert_eq!(loaded.api_token, None);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"request_timeout_secs": 3}"#).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap().request_timeout_secs, 3);
    }
}
