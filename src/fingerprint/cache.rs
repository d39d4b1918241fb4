//! Process-wide fingerprint profile cache.
//!
//! # Responsibilities
//! - Resolve fingerprint identifiers (alias, raw JA3, or empty for default)
//! - Build each transport at most once, even under concurrent first use
//! - Keep resolved transports for the lifetime of the process

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::config::FingerprintConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::fingerprint::ja3::Ja3;
use crate::fingerprint::transport::Transport;

/// Builds a transport capability from a fingerprint identifier.
pub trait ProfileBuilder: Send + Sync {
    fn build(&self, id: &str) -> BridgeResult<Transport>;
}

/// Default builder: resolves aliases and parses JA3 strings.
#[derive(Debug, Clone)]
pub struct Ja3ProfileBuilder {
    aliases: HashMap<String, String>,
    default: Option<String>,
    connect_timeout: Duration,
}

impl Ja3ProfileBuilder {
    pub fn new(config: &FingerprintConfig, connect_timeout: Duration) -> Self {
        Self {
            aliases: config.profiles.clone(),
            default: config.default.clone(),
            connect_timeout,
        }
    }

    /// Resolve an identifier to the JA3 string it stands for.
    fn descriptor<'a>(&'a self, id: &'a str) -> BridgeResult<&'a str> {
        let id = if id.is_empty() {
            self.default
                .as_deref()
                .ok_or_else(|| BridgeError::UnknownFingerprint("<empty>".to_string()))?
        } else {
            id
        };
        Ok(self.aliases.get(id).map(String::as_str).unwrap_or(id))
    }
}

impl ProfileBuilder for Ja3ProfileBuilder {
    fn build(&self, id: &str) -> BridgeResult<Transport> {
        let descriptor = self.descriptor(id)?;
        let ja3: Ja3 = descriptor
            .parse()
            .map_err(|e| BridgeError::UnknownFingerprint(format!("{}: {}", id, e)))?;
        Transport::new(ja3, self.connect_timeout)
    }
}

/// Single-flight cache of transports keyed by fingerprint identifier.
pub struct ProfileCache {
    builder: Arc<dyn ProfileBuilder>,
    profiles: DashMap<String, Arc<OnceCell<Arc<Transport>>>>,
}

impl ProfileCache {
    pub fn new(builder: Arc<dyn ProfileBuilder>) -> Self {
        Self {
            builder,
            profiles: DashMap::new(),
        }
    }

    /// Resolve a fingerprint identifier to its transport.
    ///
    /// Concurrent callers for the same identifier wait on a single build.
    /// A failed build is not cached.
    pub async fn resolve(&self, id: &str) -> BridgeResult<Arc<Transport>> {
        let cell = self.profiles.entry(id.to_string()).or_default().clone();

        let result = cell
            .get_or_try_init(|| async {
                let transport = self.builder.build(id)?;
                tracing::info!(fingerprint = %transport.ja3(), "Fingerprint profile built");
                Ok::<_, BridgeError>(Arc::new(transport))
            })
            .await
            .map(Arc::clone);

        if result.is_err() {
            self.profiles.remove_if(id, |_, cell| !cell.initialized());
        }
        result
    }

    /// Number of identifiers with a built transport.
    pub fn len(&self) -> usize {
        self.profiles.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCache")
            .field("profiles", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const JA3: &str = "771,4865-4866-4867,0-10-11-16-43,29-23,0";

    struct CountingBuilder {
        inner: Ja3ProfileBuilder,
        builds: AtomicUsize,
    }

    impl ProfileBuilder for CountingBuilder {
        fn build(&self, id: &str) -> BridgeResult<Transport> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.inner.build(id)
        }
    }

    fn counting(config: FingerprintConfig) -> Arc<CountingBuilder> {
        Arc::new(CountingBuilder {
            inner: Ja3ProfileBuilder::new(&config, Duration::from_secs(5)),
            builds: AtomicUsize::new(0),
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolve_builds_once() {
        let builder = counting(FingerprintConfig::default());
        let cache = Arc::new(ProfileCache::new(builder.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.resolve(JA3).await.unwrap() })
            })
            .collect();

        let mut transports = Vec::new();
        for task in tasks {
            transports.push(task.await.unwrap());
        }

        assert_eq!(builder.builds.load(Ordering::SeqCst), 1);
        assert!(transports.iter().all(|t| Arc::ptr_eq(t, &transports[0])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_fingerprint_not_cached() {
        let builder = counting(FingerprintConfig::default());
        let cache = ProfileCache::new(builder.clone());

        let err = cache.resolve("firefox").await.unwrap_err();
        assert!(matches!(err, BridgeError::UnknownFingerprint(_)));
        assert!(cache.resolve("firefox").await.is_err());

        assert_eq!(builder.builds.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_alias_and_default() {
        let mut config = FingerprintConfig::default();
        config.profiles.insert("chrome".into(), JA3.into());
        config.default = Some("chrome".into());
        let cache = ProfileCache::new(counting(config));

        let by_alias = cache.resolve("chrome").await.unwrap();
        assert_eq!(by_alias.ja3().to_string(), JA3);

        let by_default = cache.resolve("").await.unwrap();
        assert_eq!(by_default.ja3(), by_alias.ja3());
    }

    #[tokio::test]
    async fn test_empty_without_default() {
        let cache = ProfileCache::new(counting(FingerprintConfig::default()));
        let err = cache.resolve("").await.unwrap_err();
        assert!(matches!(err, BridgeError::UnknownFingerprint(_)));
    }
}
