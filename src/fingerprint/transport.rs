//! Transport capability built from a fingerprint.
//!
//! # Responsibilities
//! - Map a JA3 descriptor onto HTTP client settings (TLS backend, version
//!   bounds, HTTP/2 availability)
//! - Hand out a client for direct or proxied requests
//! - Keep a bounded set of clients per proxy so proxied requests reuse
//!   connections

use std::time::Duration;

use dashmap::DashMap;
use reqwest::tls::Version;
use reqwest::{Client, ClientBuilder, Proxy};
use url::Url;

use crate::error::{BridgeError, BridgeResult};
use crate::fingerprint::ja3::Ja3;

/// Proxied clients kept per transport. Controllers that rotate proxy
/// credentials per request would otherwise grow the map forever.
pub const MAX_PROXIED_CLIENTS: usize = 64;

/// A configured, reusable HTTP transport for one fingerprint.
#[derive(Debug)]
pub struct Transport {
    ja3: Ja3,
    connect_timeout: Duration,
    direct: Client,
    proxied: DashMap<Url, Client>,
    proxy_capacity: usize,
}

impl Transport {
    /// Build the transport for a parsed descriptor.
    pub fn new(ja3: Ja3, connect_timeout: Duration) -> BridgeResult<Self> {
        let direct = client_builder(&ja3, connect_timeout)
            .no_proxy()
            .build()
            .map_err(|e| BridgeError::UnknownFingerprint(format!("{}: {}", ja3, e)))?;

        Ok(Self {
            ja3,
            connect_timeout,
            direct,
            proxied: DashMap::new(),
            proxy_capacity: MAX_PROXIED_CLIENTS,
        })
    }

    pub fn ja3(&self) -> &Ja3 {
        &self.ja3
    }

    /// Client to use for a request, tunnelled through `proxy` when given.
    pub fn client(&self, proxy: Option<&Url>) -> BridgeResult<Client> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };

        if let Some(client) = self.proxied.get(proxy) {
            return Ok(client.clone());
        }

        let invalid = |e: reqwest::Error| BridgeError::InvalidProxy {
            proxy: proxy.to_string(),
            reason: e.to_string(),
        };
        let client = client_builder(&self.ja3, self.connect_timeout)
            .proxy(Proxy::all(proxy.as_str()).map_err(invalid)?)
            .build()
            .map_err(invalid)?;

        tracing::debug!(proxy = %proxy, "Built proxied client");
        if self.proxied.len() >= self.proxy_capacity {
            self.evict_one();
        }
        Ok(self
            .proxied
            .entry(proxy.clone())
            .or_insert(client)
            .clone())
    }

    /// Drop an arbitrary cached proxied client. Its pooled connections close
    /// once in-flight requests holding a clone finish.
    fn evict_one(&self) {
        // The iterator's shard lock must be released before removing.
        let victim = self.proxied.iter().next().map(|e| e.key().clone());
        if let Some(url) = victim {
            self.proxied.remove(&url);
            tracing::debug!(proxy = %url, "Evicted proxied client");
        }
    }

    /// Number of distinct proxies a client has been built for.
    pub fn proxied_clients(&self) -> usize {
        self.proxied.len()
    }
}

fn client_builder(ja3: &Ja3, connect_timeout: Duration) -> ClientBuilder {
    let mut builder = Client::builder().connect_timeout(connect_timeout);

    // rustls only speaks TLS 1.2+; older fingerprints go through the platform stack.
    if ja3.is_legacy() {
        builder = builder.use_native_tls().min_tls_version(ja3.min_tls_version());
        if !ja3.offers_tls13() {
            builder = builder.max_tls_version(ja3.min_tls_version());
        }
    } else {
        builder = builder.use_rustls_tls().min_tls_version(ja3.min_tls_version());
        builder = builder.max_tls_version(if ja3.offers_tls13() {
            Version::TLS_1_3
        } else {
            Version::TLS_1_2
        });
    }

    if !ja3.offers_alpn() {
        builder = builder.http1_only();
    }

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(ja3: &str) -> Transport {
        Transport::new(ja3.parse().unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_direct_client() {
        let t = transport("771,4865-4866,0-16-43,29-23,0");
        assert!(t.client(None).is_ok());
        assert_eq!(t.proxied_clients(), 0);
    }

    #[test]
    fn test_proxied_clients_are_reused() {
        let t = transport("771,4865,0-43,29,0");
        let proxy: Url = "http://127.0.0.1:3128".parse().unwrap();
        let other: Url = "socks5://127.0.0.1:1080".parse().unwrap();

        t.client(Some(&proxy)).unwrap();
        t.client(Some(&proxy)).unwrap();
        assert_eq!(t.proxied_clients(), 1);

        t.client(Some(&other)).unwrap();
        assert_eq!(t.proxied_clients(), 2);
    }

    #[test]
    fn test_rotating_credentials_stay_bounded() {
        let mut t = transport("771,4865,0-43,29,0");
        t.proxy_capacity = 4;

        for i in 0..20 {
            let proxy: Url = format!("http://user-session{}:pw@127.0.0.1:3128", i)
                .parse()
                .unwrap();
            t.client(Some(&proxy)).unwrap();
            assert!(t.proxied_clients() <= 4);
        }

        // The most recent proxy is cached and reused.
        let last: Url = "http://user-session19:pw@127.0.0.1:3128".parse().unwrap();
        let before = t.proxied_clients();
        t.client(Some(&last)).unwrap();
        assert_eq!(t.proxied_clients(), before);
    }
}
