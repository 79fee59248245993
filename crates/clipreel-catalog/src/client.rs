//! Clip catalog REST client.
//!
//! Every request carries the bearer token, the `Client-ID` header and
//! `Accept: application/json`. An unauthorized response invalidates the
//! token, forces a fresh exchange and retries the request exactly once; a
//! second unauthorized response fails the call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::metrics::{record_reauth, record_request};
use crate::token::TokenManager;
use crate::types::Page;

/// Query parameters for one request.
pub type QueryParams = Vec<(&'static str, String)>;

/// Outcome of a paginated walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageWalk {
    /// Pages fetched
    pub pages: usize,
    /// Stopped early by the cancel signal
    pub cancelled: bool,
}

/// Clip catalog client.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    config: Arc<CatalogConfig>,
    tokens: Arc<TokenManager>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl CatalogClient {
    /// Create a new catalog client.
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("clipreel-catalog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CatalogError::Network)?;

        let tokens = Arc::new(TokenManager::new(http.clone(), &config));
        Ok(Self {
            http,
            config: Arc::new(config),
            tokens,
            cancel_rx: None,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> CatalogResult<Self> {
        Self::new(CatalogConfig::from_env()?)
    }

    /// Stop paginated fetches early when the signal flips to `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Shared HTTP client, also used for clip downloads.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn cancel_signal(&self) -> Option<&watch::Receiver<bool>> {
        self.cancel_rx.as_ref()
    }

    /// Authenticate eagerly (loads the cache or exchanges credentials).
    pub async fn authenticate(&self) -> CatalogResult<()> {
        self.tokens.access_token().await.map(|_| ())
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &QueryParams,
    ) -> CatalogResult<T> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);
        let span = info_span!("catalog_request", operation = %operation, path = %path);

        let start = Instant::now();
        let result = async {
            let response = self.send_authorized(operation, &url, query).await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CatalogError::upstream(status.as_u16(), body));
            }
            let bytes = response.bytes().await?;
            serde_json::from_slice::<T>(&bytes)
                .map_err(|e| CatalogError::decode(format!("{operation}: {e}")))
        }
        .instrument(span)
        .await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, latency_ms);

        result
    }

    /// Send with the current token; on 401 re-authenticate and retry once.
    async fn send_authorized(
        &self,
        operation: &'static str,
        url: &str,
        query: &QueryParams,
    ) -> CatalogResult<Response> {
        let token = self.tokens.access_token().await?;
        let response = self.send(url, query, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!(operation = %operation, "Catalog rejected token, re-authenticating");
        record_reauth(operation);
        self.tokens.invalidate(&token).await;
        let token = self.tokens.access_token().await?;

        let retry = self.send(url, query, &token).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::Unauthorized {
                operation: operation.to_string(),
            });
        }
        Ok(retry)
    }

    async fn send(&self, url: &str, query: &QueryParams, token: &str) -> CatalogResult<Response> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header("Client-ID", &self.config.client_id)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        Ok(response)
    }

    /// Walk a cursor-paginated endpoint.
    ///
    /// `absorb` folds each page into the caller's accumulator and returns
    /// the accumulated count. The walk stops on an empty cursor, once the
    /// count reaches `cap`, or when `cancel` fires; cancellation is not an
    /// error and leaves whatever was absorbed so far.
    pub async fn paginate<R, F>(
        &self,
        operation: &'static str,
        path: &str,
        params: QueryParams,
        cap: usize,
        cancel: Option<&watch::Receiver<bool>>,
        mut absorb: F,
    ) -> CatalogResult<PageWalk>
    where
        R: DeserializeOwned,
        F: FnMut(Vec<R>) -> usize,
    {
        let mut cancel = cancel.cloned();
        let mut walk = PageWalk::default();
        let mut cursor: Option<String> = None;
        let mut accumulated = 0usize;

        loop {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                walk.cancelled = true;
                break;
            }
            if accumulated >= cap {
                break;
            }

            let mut query = params.clone();
            if let Some(after) = &cursor {
                query.push(("after", after.clone()));
            }

            let page: Page<R> = match cancel.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        page = self.get_json::<Page<R>>(operation, path, &query) => page?,
                        _ = cancelled(rx) => {
                            walk.cancelled = true;
                            break;
                        }
                    }
                }
                None => self.get_json::<Page<R>>(operation, path, &query).await?,
            };
            walk.pages += 1;

            accumulated = absorb(page.data);
            cursor = page.pagination.next_cursor();
            debug!(operation = %operation, page = walk.pages, accumulated, "Fetched catalog page");

            if cursor.is_none() {
                break;
            }
        }

        if walk.cancelled {
            info!(operation = %operation, accumulated, "Pagination cancelled, returning partial results");
        }
        Ok(walk)
    }
}

/// Resolve once the cancel flag is raised.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
