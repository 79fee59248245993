//! Bearer token lifecycle for the catalog API.
//!
//! The token moves through three states:
//! - `Unauthenticated`: nothing loaded yet; the durable cache is consulted first
//! - `Authenticated`: a token with a known expiry
//! - `Invalidated`: the catalog rejected the token; the next access performs
//!   a fresh client-credentials exchange and bypasses the cache
//!
//! All transitions happen under one async mutex, so concurrent callers share
//! a single exchange and the cache file has a single writer.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::types::TokenResponse;

/// Refresh a token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::seconds(60);

/// Token lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Authenticated {
        token: String,
        expires_at: DateTime<Utc>,
    },
    Invalidated,
}

impl TokenState {
    fn usable_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match self {
            TokenState::Authenticated { token, expires_at } if now + TOKEN_REFRESH_MARGIN < *expires_at => {
                Some(token.as_str())
            }
            _ => None,
        }
    }
}

/// Owns the current bearer token and its durable cache.
pub struct TokenManager {
    http: Client,
    client_id: String,
    client_secret: String,
    oauth_url: String,
    cache_path: PathBuf,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(http: Client, config: &CatalogConfig) -> Self {
        Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            oauth_url: config.oauth_url.clone(),
            cache_path: config.token_cache_path.clone(),
            state: Mutex::new(TokenState::Unauthenticated),
        }
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    /// Current bearer token, authenticating if needed.
    pub async fn access_token(&self) -> CatalogResult<String> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(token) = state.usable_token(now) {
            return Ok(token.to_string());
        }

        if *state == TokenState::Unauthenticated {
            match load_cached(&self.cache_path).await {
                Ok(Some((token, expires_at))) if now + TOKEN_REFRESH_MARGIN < expires_at => {
                    debug!(path = %self.cache_path.display(), "Loaded cached catalog token");
                    *state = TokenState::Authenticated {
                        token: token.clone(),
                        expires_at,
                    };
                    return Ok(token);
                }
                Ok(Some(_)) => debug!("Cached catalog token expired"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring unreadable token cache"),
            }
        }

        let response = self.exchange().await?;
        let expires_at = now + Duration::seconds(response.expires_in);
        if let Err(e) = store_cached(&self.cache_path, &response).await {
            warn!(error = %e, path = %self.cache_path.display(), "Failed to persist catalog token");
        }

        *state = TokenState::Authenticated {
            token: response.access_token.clone(),
            expires_at,
        };
        info!(expires_at = %expires_at, "Authenticated with catalog");
        Ok(response.access_token)
    }

    /// Mark `rejected` as invalid.
    ///
    /// A no-op when another caller already replaced that token, so concurrent
    /// rejections of one token trigger a single exchange.
    pub async fn invalidate(&self, rejected: &str) {
        let mut state = self.state.lock().await;
        let is_current = matches!(&*state, TokenState::Authenticated { token, .. } if token == rejected);
        if is_current || *state == TokenState::Unauthenticated {
            debug!("Catalog token invalidated");
            *state = TokenState::Invalidated;
        }
    }

    /// Client-credentials exchange against the token endpoint.
    async fn exchange(&self) -> CatalogResult<TokenResponse> {
        let response = self
            .http
            .post(&self.oauth_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::auth_error(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice::<TokenResponse>(&bytes)
            .map_err(|e| CatalogError::auth_error(format!("malformed token response: {e}")))
    }
}

/// Read the cache file; expiry counts from the file's modification time.
async fn load_cached(path: &Path) -> CatalogResult<Option<(String, DateTime<Utc>)>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let cached: TokenResponse = serde_json::from_slice(&bytes)?;
    if cached.access_token.is_empty() {
        return Ok(None);
    }

    let written: DateTime<Utc> = tokio::fs::metadata(path)
        .await?
        .modified()
        .unwrap_or_else(|_| SystemTime::now())
        .into();
    Ok(Some((
        cached.access_token,
        written + Duration::seconds(cached.expires_in),
    )))
}

/// Write the cache file atomically via a sibling temp file.
async fn store_cached(path: &Path, token: &TokenResponse) -> CatalogResult<()> {
    let body = serde_json::to_vec_pretty(token)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
