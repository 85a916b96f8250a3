//! Shared HTTP plumbing for the backends.
//!
//! Every backend talks JSON over `reqwest`; this module owns client
//! construction (timeout, extra headers) and the post → status check →
//! decode sequence, mapping each failure to `AgentError::Provider`.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use aigent_core::config::ProviderConfig;
use aigent_core::{AgentError, Backend, Result};

/// Default request timeout when the config doesn't set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A connection-pooled JSON client bound to one backend.
pub struct HttpClient {
    client: reqwest::Client,
    backend: Backend,
    /// Extra headers sent with every request.
    extra_headers: HeaderMap,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("backend", &self.backend)
            .field("extra_headers", &self.extra_headers.len())
            .finish()
    }
}

impl HttpClient {
    /// Build a client from the provider config.
    pub fn new(config: &ProviderConfig, backend: Backend) -> Result<Self> {
        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = config.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    warn!(backend = %backend, "Invalid header: {}={}", key, value);
                }
            }
        }

        let timeout = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| AgentError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(HttpClient {
            client,
            backend,
            extra_headers,
        })
    }

    /// POST `body` to `url` and decode the JSON response as `T`.
    ///
    /// `headers` are backend-specific auth headers, merged over the extra headers.
    pub async fn post_json<B, T>(&self, url: &str, headers: HeaderMap, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut all_headers = self.extra_headers.clone();
        all_headers.extend(headers);

        debug!(backend = %self.backend, url = %url, "POST");

        let response = self
            .client
            .post(url)
            .headers(all_headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(backend = %self.backend, error = %e, "HTTP request failed");
                AgentError::provider(self.backend, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                backend = %self.backend,
                status = %status,
                body = %error_text,
                "API error"
            );
            return Err(AgentError::provider(
                self.backend,
                format!("{status}: {error_text}"),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            error!(backend = %self.backend, error = %e, "Failed to parse response");
            AgentError::provider(self.backend, format!("malformed response: {e}"))
        })
    }
}

/// Resolve the API base: config value if set, else the backend default.
/// Trailing slashes are stripped so callers can append paths.
pub fn resolve_api_base(config: &ProviderConfig, default: &str) -> String {
    config
        .api_base
        .as_deref()
        .filter(|base| !base.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// A single header map entry, skipping values that aren't valid header text.
pub fn header(name: &'static str, value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    match HeaderValue::from_str(value) {
        Ok(v) => {
            map.insert(name, v);
        }
        Err(_) => warn!(header = name, "dropping header with invalid value"),
    }
    map
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
