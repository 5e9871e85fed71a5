//! Rate-limited HTTP fetch shared by every provider implementation (§4.3,
//! §4.5 "HTTP handling").

use std::sync::Arc;
use std::time::Duration;

use lex_core::ProviderError;
use lex_ratelimit::{HostLimits, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Shared HTTP client + rate limiter for provider requests. One instance
/// is built at startup and handed to every `DictionaryProvider`.
pub struct ProviderHttp {
    client: Client,
    limiter: Arc<RateLimiter>,
}

impl ProviderHttp {
    pub fn new(limits: HostLimits) -> Self {
        Self {
            client: Client::new(),
            limiter: Arc::new(RateLimiter::new(limits)),
        }
    }

    /// `GET url`, applying per-host throttling and the §4.5 status-code
    /// taxonomy: `429` -> `RateLimited` (honoring `Retry-After` exactly),
    /// `>=500` -> `Transient` (no retry at this layer), other `>=400` ->
    /// `Permanent`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        provider: &str,
        host: &str,
        url: &str,
    ) -> Result<T, ProviderError> {
        let permit = self.limiter.acquire(host).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: provider.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after_duration(&response);
            permit.record_rate_limited(retry_after);
            return Err(ProviderError::RateLimited {
                provider: provider.to_string(),
                retry_after_ms: retry_after.map(|d| d.as_millis() as u64),
            });
        }

        if status.is_server_error() {
            permit.record_rate_limited(None);
            return Err(ProviderError::Transient {
                provider: provider.to_string(),
                status: status.as_u16(),
            });
        }

        if status.is_client_error() {
            permit.record_success();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Permanent {
                provider: provider.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        permit.record_success();

        response.json::<T>().await.map_err(|e| {
            warn!(provider, error = %e, "failed to parse provider response");
            ProviderError::ParseFailed {
                provider: provider.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

fn retry_after_duration(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
