//! The fetch loop: cache → rate-limit gate → transport → status handling.

use std::sync::Arc;
use std::time::Duration;

use finboard_types::{auth_pair, FetchError, FetchOutcome, WidgetConfig};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::{origin_key, RequestSignature, ResponseCache};
use super::config::FetchConfig;
use super::payload;
use super::rate_limit::parser::resolve_reset_delay_secs;
use super::rate_limit::RateLimitRegistry;
use super::retry::{apply_retry_strategy, determine_retry_strategy};
use super::transport::{
    parse_http_url, DirectTransport, PassthroughTransport, Transport, TransportFailure, TransportResponse,
};
use crate::error::{AppError, AppResult};
use crate::utils::time::now_millis;

/// One logical GET against a provider.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: String,
    pub auth_key: Option<String>,
    pub auth_header: Option<String>,
    /// Overrides [`FetchConfig::max_attempts`]
    pub max_attempts: Option<u32>,
    pub force_fallback_transport: bool,
    /// Overrides [`FetchConfig::default_ttl_secs`]; 0 disables caching
    pub ttl_secs: Option<u64>,
    pub bypass_cache: bool,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    pub fn with_auth(mut self, key: impl Into<String>, header: impl Into<String>) -> Self {
        self.auth_key = Some(key.into());
        self.auth_header = Some(header.into());
        self
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    pub fn force_fallback(mut self, force: bool) -> Self {
        self.force_fallback_transport = force;
        self
    }

    /// `(header, key)` sent with the request; same rules as [`WidgetConfig::auth_header`].
    pub fn auth_pair(&self) -> Option<(&str, &str)> {
        auth_pair(self.auth_header.as_deref(), self.auth_key.as_deref())
    }
}

impl From<&WidgetConfig> for FetchRequest {
    fn from(widget: &WidgetConfig) -> Self {
        Self {
            url: widget.api_url.clone(),
            auth_key: widget.api_key.clone(),
            auth_header: widget.api_key_header.clone(),
            ttl_secs: Some(widget.cache_ttl),
            ..Self::default()
        }
    }
}

/// Owns the rate-limit registry and response cache for every widget it serves.
pub struct FetchPipeline {
    config: FetchConfig,
    registry: RateLimitRegistry,
    cache: ResponseCache,
    direct: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("config", &self.config)
            .field("direct", &self.direct.name())
            .field("fallback", &self.fallback.as_ref().map(|t| t.name()))
            .finish_non_exhaustive()
    }
}

impl FetchPipeline {
    /// Pipeline with reqwest transports and an in-memory cache.
    pub fn new(config: FetchConfig) -> AppResult<Self> {
        Self::with_cache(config, ResponseCache::in_memory())
    }

    pub fn with_cache(config: FetchConfig, cache: ResponseCache) -> AppResult<Self> {
        let direct: Arc<dyn Transport> = Arc::new(DirectTransport::new(config.request_timeout)?);
        let fallback: Option<Arc<dyn Transport>> = match config.passthrough_url.as_deref() {
            Some(base) => Some(Arc::new(PassthroughTransport::new(base, config.request_timeout)?)),
            None => None,
        };
        Ok(Self::with_transports(config, cache, direct, fallback))
    }

    pub fn with_transports(
        config: FetchConfig,
        cache: ResponseCache,
        direct: Arc<dyn Transport>,
        fallback: Option<Arc<dyn Transport>>,
    ) -> Self {
        Self { config, registry: RateLimitRegistry::new(), cache, direct, fallback }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn registry(&self) -> &RateLimitRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Origin key for `url`, as used by the rate-limit registry.
    pub fn origin_of(url: &str) -> AppResult<String> {
        parse_http_url(url).map(|u| origin_key(&u))
    }

    /// Fetch a widget's data source; `force` bypasses the cache.
    pub async fn fetch_widget(&self, widget: &WidgetConfig, force: bool) -> FetchOutcome {
        self.fetch(&FetchRequest::from(widget).bypass_cache(force)).await
    }

    /// Run one fetch to completion. Never fails; errors land in the outcome.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        match self.run(request).await {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!("fetch failed: {}", error);
                FetchOutcome::failure(error, now_millis())
            }
        }
    }

    async fn run(&self, request: &FetchRequest) -> Result<FetchOutcome, FetchError> {
        let url = parse_http_url(&request.url).map_err(|e| match e {
            AppError::InvalidUrl { url, reason } => FetchError::InvalidUrl { url, reason },
            other => FetchError::InvalidUrl { url: request.url.clone(), reason: other.to_string() },
        })?;

        let auth = request.auth_pair();
        let signature = RequestSignature::compute(&url, auth.is_some(), auth.map(|(header, _)| header));
        let origin = signature.origin().to_string();
        let ttl_secs = request.ttl_secs.unwrap_or(self.config.default_ttl_secs);
        let bypass = request.bypass_cache || ttl_secs == 0;

        if let Some(entry) = self.cache.get(signature.as_str(), bypass) {
            let now = now_millis();
            let age = entry.age_secs_at(now);
            debug!(signature = %signature, origin = %origin, age_secs = age, "cache hit");
            return Ok(FetchOutcome::cached(entry.payload, age, now));
        }

        let headers: Vec<(String, String)> =
            auth.map(|(h, k)| vec![(h.to_string(), k.to_string())]).unwrap_or_default();
        let sequence = self.cache.begin_request();
        let max_attempts = request.max_attempts.unwrap_or(self.config.max_attempts).max(1);

        let mut attempt: u32 = 0;
        loop {
            let block = self.registry.check_blocked(&origin);
            if block.blocked {
                let wait_secs = block.remaining_secs(now_millis());
                debug!(origin = %origin, wait_secs, "origin rate limited, skipping network");
                return Err(FetchError::RateLimited { origin, wait_secs });
            }

            debug!(
                signature = %signature,
                origin = %origin,
                attempt = attempt + 1,
                auth_header = auth.map(|(h, _)| h).unwrap_or("-"),
                "issuing request"
            );
            let response = self
                .send(&url, &headers, request.force_fallback_transport)
                .await
                .map_err(|f| FetchError::Transport { message: f.message, cors_suspected: f.cors_suspected })?;

            if response.is_success() {
                return self.accept(response, signature.as_str(), ttl_secs, sequence);
            }

            let status = response.status;
            let message = payload::error_message(status, &response.body, &self.config.error_message_keys);
            let mut reset_delay = None;
            let error = match status {
                429 => {
                    let now = now_millis();
                    let secs = resolve_reset_delay_secs(
                        response.header("retry-after"),
                        &response.body,
                        self.config.rate_limit_default_secs,
                        now,
                    );
                    let reset_at =
                        now.saturating_add(i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX));
                    self.registry.record_limit(&origin, reset_at);
                    reset_delay = Some(Duration::from_secs(secs));
                    FetchError::RateLimited { origin: origin.clone(), wait_secs: secs }
                }
                401 | 403 => return Err(FetchError::Unauthorized { status }),
                400 => return Err(FetchError::BadRequest { message }),
                500..=599 => FetchError::Server { status, message },
                _ => return Err(FetchError::Other { status, message }),
            };

            let strategy = determine_retry_strategy(
                status,
                reset_delay,
                self.config.backoff_base,
                self.config.backoff_max,
                self.config.rate_limit_max_wait,
            );
            if !apply_retry_strategy(&strategy, attempt, max_attempts, status, &origin).await {
                return Err(match error {
                    FetchError::RateLimited { origin, wait_secs } => {
                        let remaining = self.registry.remaining_wait_secs(&origin);
                        FetchError::RateLimited { origin, wait_secs: remaining.min(wait_secs) }
                    }
                    other => other,
                });
            }
            attempt += 1;
        }
    }

    async fn send(
        &self,
        url: &Url,
        headers: &[(String, String)],
        force_fallback: bool,
    ) -> Result<TransportResponse, TransportFailure> {
        if force_fallback {
            match &self.fallback {
                Some(fallback) => return fallback.get(url, headers).await,
                None => warn!("fallback transport requested but none is configured, using direct"),
            }
        }

        match self.direct.get(url, headers).await {
            Err(failure) if failure.cors_suspected => {
                let Some(fallback) = &self.fallback else {
                    return Err(failure);
                };
                warn!(
                    transport = fallback.name(),
                    "direct request failed ({}), retrying once through fallback", failure.message
                );
                fallback.get(url, headers).await.map_err(|e| TransportFailure {
                    message: format!("{} (fallback: {})", failure.message, e.message),
                    cors_suspected: true,
                })
            }
            other => other,
        }
    }

    fn accept(
        &self,
        response: TransportResponse,
        signature: &str,
        ttl_secs: u64,
        sequence: u64,
    ) -> Result<FetchOutcome, FetchError> {
        if response.body.trim().is_empty() {
            return Err(FetchError::Decode { message: "empty response body".to_string() });
        }
        let data: Value = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::Decode { message: e.to_string() })?;

        if let Some(message) = payload::embedded_error(&data, &self.config.embedded_error_keys) {
            info!(signature = %signature, status = response.status, "provider reported an error in a 2xx body");
            return Err(FetchError::PayloadLogical { message });
        }

        if ttl_secs > 0 {
            self.cache.put(signature, data.clone(), ttl_secs, sequence);
        }
        debug!(signature = %signature, status = response.status, "fresh response");
        Ok(FetchOutcome::fresh(data, now_millis()))
    }
}
