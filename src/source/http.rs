//! # HTTP adapter for the cloud camera API.
//!
//! [`HttpResolver`] binds the [`Resolver`](crate::source::Resolver) contract
//! to a REST endpoint: `GET {base}/v1/cameras/{id}/stream` with a bearer
//! token, answering `{ "url": ..., "expires_at": <unix secs> }`.
//!
//! Status mapping:
//! - `401`/`403` → [`ResolveError::AuthExpired`]
//! - `404`/`409`/`5xx` → [`ResolveError::CameraOffline`]
//! - `429` → [`ResolveError::RateLimited`] honoring the `Retry-After` header
//! - transport timeout → [`ResolveError::Timeout`]
//! - anything else → [`ResolveError::Unknown`]

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Deserialize;

use crate::source::resolver::{ResolveError, Resolver, StreamSource};

/// Response body of the stream endpoint.
#[derive(Debug, Deserialize)]
struct StreamPayload {
    url: String,
    #[serde(default)]
    expires_at: Option<u64>,
}

/// Cloud camera client speaking the vendor's REST API.
pub struct HttpResolver {
    http: reqwest::Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl HttpResolver {
    /// Builds a resolver with the request timeout baked into the client.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            timeout,
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> ResolveError {
        if err.is_timeout() {
            ResolveError::Timeout {
                timeout: self.timeout,
            }
        } else if err.is_connect() {
            ResolveError::CameraOffline
        } else {
            ResolveError::Unknown {
                error: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve_live(&self, camera: &str) -> Result<StreamSource, ResolveError> {
        let url = format!("{}/v1/cameras/{}/stream", self.base_url, camera);
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        match status {
            StatusCode::OK => {
                let payload: StreamPayload =
                    resp.json().await.map_err(|e| ResolveError::Unknown {
                        error: format!("malformed stream payload: {e}"),
                    })?;
                let expires_at = payload
                    .expires_at
                    .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs));
                Ok(StreamSource::live(payload.url, expires_at))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ResolveError::AuthExpired),
            StatusCode::TOO_MANY_REQUESTS => Err(ResolveError::RateLimited {
                retry_after: retry_after_hint(resp.headers()),
            }),
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => Err(ResolveError::CameraOffline),
            s if s.is_server_error() => Err(ResolveError::CameraOffline),
            s => Err(ResolveError::Unknown {
                error: format!("unexpected status {s}"),
            }),
        }
    }
}

/// Parses a `Retry-After: <seconds>` header; date forms are ignored.
fn retry_after_hint(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn resolver_for(server: &MockServer) -> HttpResolver {
        HttpResolver::new(server.uri(), "secret", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn ok_yields_live_source_with_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/cameras/porch/stream"))
            .and(bearer_token("secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "rtsps://cloud.example/feed/abc",
                "expires_at": 4102444800u64,
            })))
            .mount(&server)
            .await;

        let src = resolver_for(&server)
            .await
            .resolve_live("porch")
            .await
            .unwrap();
        assert_eq!(src.locator, "rtsps://cloud.example/feed/abc");
        assert!(src.expires_at.is_some());
        assert!(!src.is_expired());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = resolver_for(&server)
            .await
            .resolve_live("porch")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::AuthExpired));
    }

    #[tokio::test]
    async fn throttling_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = resolver_for(&server)
            .await
            .resolve_live("porch")
            .await
            .unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn server_error_maps_to_camera_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = resolver_for(&server)
            .await
            .resolve_live("porch")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::CameraOffline));
    }
}
