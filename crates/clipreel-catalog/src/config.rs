//! Catalog client configuration.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{CatalogError, CatalogResult};

pub const DEFAULT_API_URL: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_OAUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const DEFAULT_RESOLVER_URL: &str =
    "https://cy49zmt23f.execute-api.us-east-1.amazonaws.com/dev/download_clip";
pub const DEFAULT_TOKEN_CACHE: &str = "oauth.json";

/// Largest page the catalog serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Clip catalog client configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Application client ID (sent as `Client-ID`)
    pub client_id: String,
    /// Application client secret
    pub client_secret: String,
    /// REST API base URL
    pub api_url: String,
    /// OAuth token endpoint
    pub oauth_url: String,
    /// Durable token cache file
    pub token_cache_path: PathBuf,
    /// Lookup service for v2 clip media
    pub resolver_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Page size requested from the catalog
    pub page_size: u32,
}

impl CatalogConfig {
    /// Create a config with default endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_url: DEFAULT_API_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            token_cache_path: PathBuf::from(DEFAULT_TOKEN_CACHE),
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> CatalogResult<Self> {
        let client_id = required_env("CATALOG_CLIENT_ID")?;
        let client_secret = required_env("CATALOG_CLIENT_SECRET")?;

        let timeout_secs: u64 = std::env::var("CATALOG_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let connect_timeout_secs: u64 = std::env::var("CATALOG_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let page_size: u32 = std::env::var("CATALOG_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(MAX_PAGE_SIZE);

        let config = Self {
            client_id,
            client_secret,
            api_url: std::env::var("CATALOG_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            oauth_url: std::env::var("CATALOG_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_OAUTH_URL.to_string()),
            token_cache_path: std::env::var("CATALOG_TOKEN_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_CACHE)),
            resolver_url: std::env::var("CLIP_RESOLVER_URL")
                .unwrap_or_else(|_| DEFAULT_RESOLVER_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that endpoints parse as absolute URLs.
    pub fn validate(&self) -> CatalogResult<()> {
        for (name, value) in [
            ("CATALOG_API_URL", &self.api_url),
            ("CATALOG_OAUTH_URL", &self.oauth_url),
            ("CLIP_RESOLVER_URL", &self.resolver_url),
        ] {
            Url::parse(value)
                .map_err(|e| CatalogError::config_error(format!("{name} is not a valid URL: {e}")))?;
        }
        Ok(())
    }
}

fn required_env(name: &str) -> CatalogResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CatalogError::config_error(format!("{name} must be set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "CATALOG_CLIENT_ID",
            "CATALOG_CLIENT_SECRET",
            "CATALOG_API_URL",
            "CATALOG_OAUTH_URL",
            "CATALOG_TOKEN_CACHE",
            "CLIP_RESOLVER_URL",
            "CATALOG_PAGE_SIZE",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_credentials() {
        clear_env();
        let result = CatalogConfig::from_env();
        assert!(matches!(result, Err(CatalogError::Config(_))));

        std::env::set_var("CATALOG_CLIENT_ID", "id");
        std::env::set_var("CATALOG_CLIENT_SECRET", "  ");
        assert!(CatalogConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("CATALOG_CLIENT_ID", "id");
        std::env::set_var("CATALOG_CLIENT_SECRET", "secret");
        std::env::set_var("CATALOG_PAGE_SIZE", "500");

        let config = CatalogConfig::from_env().unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.token_cache_path, PathBuf::from("oauth.json"));
        assert_eq!(config.page_size, MAX_PAGE_SIZE);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_url() {
        clear_env();
        std::env::set_var("CATALOG_CLIENT_ID", "id");
        std::env::set_var("CATALOG_CLIENT_SECRET", "secret");
        std::env::set_var("CATALOG_API_URL", "not a url");
        assert!(matches!(
            CatalogConfig::from_env(),
            Err(CatalogError::Config(_))
        ));
        clear_env();
    }
}
