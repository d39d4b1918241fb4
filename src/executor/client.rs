//! Upstream request execution.
//!
//! # Responsibilities
//! - Validate the proxy before any network activity
//! - Build the outbound request (method, URL, headers minus `host`, body)
//! - Enforce the per-request deadline over the whole exchange
//! - Read the body up to the configured limit and fold headers

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use crate::config::ExecutorConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::executor::request::RequestDescriptor;
use crate::executor::response::{fold_headers, ResponseDescriptor};
use crate::fingerprint::{ProfileCache, Transport};

const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Executes request descriptors against upstream servers.
///
/// Holds no per-request state; one instance is shared by every session.
#[derive(Debug)]
pub struct RequestExecutor {
    profiles: Arc<ProfileCache>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl RequestExecutor {
    pub fn new(profiles: Arc<ProfileCache>, config: &ExecutorConfig) -> Self {
        Self {
            profiles,
            timeout: config.request_timeout(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    /// Resolve the request's fingerprint and execute it with the configured timeout.
    pub async fn execute(&self, request: &RequestDescriptor) -> BridgeResult<ResponseDescriptor> {
        let transport = self.profiles.resolve(&request.fingerprint).await?;
        self.execute_with(request, &transport, self.timeout).await
    }

    /// Execute a request over an already resolved transport.
    pub async fn execute_with(
        &self,
        request: &RequestDescriptor,
        transport: &Transport,
        timeout: Duration,
    ) -> BridgeResult<ResponseDescriptor> {
        let proxy = parse_proxy(request.proxy.as_deref())?;
        let client = transport.client(proxy.as_ref())?;

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| BridgeError::Network(format!("invalid method '{}': {}", request.method, e)))?;
        let url = Url::parse(&request.url)
            .map_err(|e| BridgeError::Network(format!("invalid url '{}': {}", request.url, e)))?;

        let builder = client
            .request(method, url)
            .headers(outbound_headers(&request.request_id, &request.headers))
            .body(request.body.clone());

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = fold_headers(response.headers());
            let body = read_body(response, self.max_body_bytes).await?;

            Ok::<_, BridgeError>(ResponseDescriptor {
                request_id: request.request_id.clone(),
                status,
                body,
                headers,
            })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| BridgeError::Timeout(timeout.as_millis() as u64))?
    }
}

/// Parse the proxy field; `None` when no proxy was requested.
pub fn parse_proxy(proxy: Option<&str>) -> BridgeResult<Option<Url>> {
    let Some(raw) = proxy else { return Ok(None) };

    let invalid = |reason: String| BridgeError::InvalidProxy {
        proxy: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(Some(url))
}

fn outbound_headers(request_id: &str, headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("host") {
            continue;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(request_id = %request_id, header = %name, "Skipping invalid header"),
        }
    }
    map
}

async fn read_body(mut response: reqwest::Response, limit: usize) -> BridgeResult<Vec<u8>> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(BridgeError::BodyTooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(BridgeError::BodyTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
