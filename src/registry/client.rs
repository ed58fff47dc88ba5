//! C2 — registry client: throttled, retried, cached access to the
//! external ARES VR API. Grounded on `original_source/ares_vr_client.py`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RegistryClientConfig;
use crate::error::{UboError, UboResult};
use crate::registry::cache::{CachedPayload, RegistryCache};
use crate::registry::payload::RegistryPayload;
use crate::types::normalize_ico;

/// What a fetch resolved to — a real payload, or a definitive absence.
pub enum FetchOutcome {
    Payload(RegistryPayload),
    /// Cached or fresh "HTTP 400"/"HTTP 404" record; never retried.
    NotFound(String),
}

/// The seam the tree resolver (C4) walks against — lets tests drive the
/// resolver without a network or a real cache.
#[async_trait]
pub trait RegistryPort: Send + Sync {
    async fn get_by_id(&self, id: &str, force_refresh: bool) -> UboResult<FetchOutcome>;
}

pub struct RegistryClient {
    http: reqwest::Client,
    cache: RegistryCache,
    config: RegistryClientConfig,
    last_request_at: Mutex<Option<Instant>>,
}

impl RegistryClient {
    pub async fn new(cache_path: &str, config: RegistryClientConfig) -> UboResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let cache = RegistryCache::open(cache_path).await?;
        Ok(Self {
            http,
            cache,
            config,
            last_request_at: Mutex::new(None),
        })
    }

    fn url_for(&self, ico: &str) -> String {
        format!("{}/ekonomicke-subjekty-vr/{}", self.config.base_url, ico)
    }

    async fn throttle(&self) {
        let mut last = self.last_request_at.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.config.min_delay_between_requests {
                tokio::time::sleep(self.config.min_delay_between_requests - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn backoff_for(&self, attempt: u32) -> std::time::Duration {
        let scaled = self.config.backoff_base * 2u32.saturating_pow(attempt);
        scaled.min(self.config.backoff_cap)
    }

    async fn fetch_fresh(&self, ico: &str) -> UboResult<FetchOutcome> {
        self.throttle().await;
        let url = self.url_for(ico);

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.config.max_retries {
            let resp = self
                .http
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await;

            match resp {
                Ok(r) if r.status() == StatusCode::OK => {
                    let body = r.text().await?;
                    let payload: RegistryPayload = serde_json::from_str(&body).map_err(|e| {
                        UboError::RegistryUnreachable {
                            ico: ico.to_string(),
                            reason: format!("invalid JSON payload: {e}"),
                        }
                    })?;
                    info!(ico, "registry fetch ok");
                    self.cache
                        .put(ico, &CachedPayload::Ok(body), Utc::now())
                        .await?;
                    return Ok(FetchOutcome::Payload(payload));
                }
                Ok(r) if r.status() == StatusCode::BAD_REQUEST || r.status() == StatusCode::NOT_FOUND => {
                    let message = format!("HTTP {}", r.status().as_u16());
                    info!(ico, status = %r.status(), "registry definitive absence, caching");
                    self.cache
                        .put(ico, &CachedPayload::Error { message: message.clone() }, Utc::now())
                        .await?;
                    return Ok(FetchOutcome::NotFound(message));
                }
                Ok(r) => {
                    last_err = Some(format!("HTTP {}", r.status().as_u16()));
                    warn!(ico, attempt, status = %r.status(), "registry retryable error");
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    warn!(ico, attempt, error = %e, "registry transport error");
                }
            }

            if attempt < self.config.max_retries {
                let delay = self.backoff_for(attempt);
                debug!(ico, attempt, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::time::sleep(delay).await;
            }
        }

        Err(UboError::RegistryUnreachable {
            ico: ico.to_string(),
            reason: last_err.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

#[async_trait]
impl RegistryPort for RegistryClient {
    async fn get_by_id(&self, id: &str, force_refresh: bool) -> UboResult<FetchOutcome> {
        let ico = normalize_ico(id);

        if !force_refresh {
            if let Some(cached) = self.cache.get(&ico).await? {
                debug!(ico, "cache hit");
                return match cached {
                    CachedPayload::Ok(body) => {
                        let payload: RegistryPayload =
                            serde_json::from_str(&body).map_err(|e| UboError::RegistryUnreachable {
                                ico: ico.clone(),
                                reason: format!("corrupt cache entry: {e}"),
                            })?;
                        Ok(FetchOutcome::Payload(payload))
                    }
                    CachedPayload::Error { message } => Ok(FetchOutcome::NotFound(message)),
                };
            }
        }

        self.fetch_fresh(&ico).await
    }
}
