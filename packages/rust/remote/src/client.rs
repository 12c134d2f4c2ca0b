//! The one place outbound HTTP happens.
//!
//! Every call to a peer service goes through [`RemoteClient::send`], which
//! applies the fixed timeout and turns transport failures (DNS, connect,
//! timeout, truncated body) into [`OnboardingError::Service`] with a
//! synthesized message. The underlying error is logged, never returned.

use std::time::Duration;

use onboarding_shared::{ErrorDetail, OnboardingError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

/// Per-call timeout for every peer service. Transformation can be slow.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(180);

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("onboarding/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// RemoteClient
// ---------------------------------------------------------------------------

/// Shared HTTP client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
}

impl RemoteClient {
    /// Build a client with the service's defaults.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REMOTE_TIMEOUT)
            .build()
            .map_err(|e| OnboardingError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Start a request. Send it with [`RemoteClient::send`].
    pub fn request(&self, method: reqwest::Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).timeout(REMOTE_TIMEOUT)
    }

    /// Send `request` to the named peer and read the whole response.
    ///
    /// Any HTTP status is `Ok`; only transport failures are errors.
    pub async fn send(&self, service: &str, request: RequestBuilder) -> Result<RemoteResponse> {
        let response = request.send().await.map_err(|e| transport_error(service, &e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(service, &e))?
            .to_vec();

        debug!(service, %status, bytes = body.len(), "remote call completed");
        Ok(RemoteResponse { status, body })
    }
}

fn transport_error(service: &str, err: &reqwest::Error) -> OnboardingError {
    error!(service, error = %err, "transport failure calling remote service");
    OnboardingError::service(format!("Could not reach the {service} service"))
}

// ---------------------------------------------------------------------------
// RemoteResponse
// ---------------------------------------------------------------------------

/// A fully-read response from a peer service.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// The peer's `errors` array, if the body carries one.
    ///
    /// Entries may be `{message, source?}` objects or bare strings.
    pub fn error_details(&self) -> Option<Vec<ErrorDetail>> {
        let value: serde_json::Value = self.json().ok()?;
        let entries = value.get("errors")?.as_array()?;
        let details: Vec<ErrorDetail> = entries
            .iter()
            .filter_map(|entry| match entry {
                serde_json::Value::String(message) => Some(ErrorDetail::new(message.clone())),
                other => serde_json::from_value(other.clone()).ok(),
            })
            .collect();
        (!details.is_empty()).then_some(details)
    }

    /// Pass this response's status and errors through to our caller.
    ///
    /// An unreadable body is replaced by `fallback`.
    pub fn passthrough(&self, fallback: impl FnOnce() -> String) -> OnboardingError {
        OnboardingError::Upstream {
            status: self.status.as_u16(),
            errors: self
                .error_details()
                .unwrap_or_else(|| vec![ErrorDetail::new(fallback())]),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append percent-encoded path segments to a base URL.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| {
        error!(base, error = %e, "service URL does not parse");
        OnboardingError::service(format!("Invalid service URL '{base}'"))
    })?;
    url.path_segments_mut()
        .map_err(|_| OnboardingError::service(format!("Invalid service URL '{base}'")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
