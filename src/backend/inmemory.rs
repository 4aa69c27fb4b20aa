//! In-process cache driver.
//!
//! Meant for tests and local development. Records expire lazily: an expired
//! record is dropped the next time it is touched. There is no eviction.
//!
//! URI: `memory://<store>[/<namespace>][?codec=json|postcard]`. Instances
//! created by the same registry with the same `<store>` name share data,
//! which makes namespace isolation observable without a server.

use crate::cache::{Cache, Expiration, TimeToLive};
use crate::context::Context;
use crate::descriptor::ConnectionDescriptor;
use crate::error::{Error, Result};
use crate::key::Namespace;
use crate::registry::DriverRegistry;
use crate::serialization::Codec;
use crate::value::CacheValue;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const SCHEME: &str = "memory";

const DEFAULT_STORE: &str = "default";

#[derive(Clone, Debug)]
struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Shared key/value store behind one or more [`InMemoryCache`] instances.
///
/// Keys are full backend keys (namespace already applied).
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: String, bytes: Vec<u8>, expiration: Expiration) {
        // A deadline past the clock's range is treated as no deadline.
        let expires_at = expiration
            .as_secs()
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
        self.entries.insert(key, Entry { bytes, expires_at });
    }

    /// Live entry for `key`, removing it first if it has expired.
    fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.entries.get(key).map(|e| e.value().clone())?;
        if entry.is_expired(now) {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        Some(entry)
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Number of unexpired records.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process [`Cache`] bound to one store and one namespace.
///
/// # Example
///
/// ```
/// use cache_facade::backend::{InMemoryCache, InMemoryStore};
/// use cache_facade::{CacheExt, Context};
///
/// # async fn example() -> cache_facade::Result<()> {
/// let store = InMemoryStore::new();
/// let cache = InMemoryCache::new(store.clone(), "app:");
///
/// cache.set(&Context::background(), "visits", 1, 0).await?;
/// assert_eq!(store.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryCache {
    store: InMemoryStore,
    namespace: Namespace,
    codec: Codec,
    closed: AtomicBool,
}

impl InMemoryCache {
    pub fn new(store: InMemoryStore, namespace: impl Into<Namespace>) -> Self {
        InMemoryCache {
            store,
            namespace: namespace.into(),
            codec: Codec::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Set the structured-value codec.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    fn ready(&self, ctx: &Context) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        ctx.check()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn set_value(
        &self,
        ctx: &Context,
        key: &str,
        value: CacheValue,
        expiration: Expiration,
    ) -> Result<()> {
        self.ready(ctx)?;
        let full_key = self.namespace.apply(key);
        debug!("✓ Memory SET {} ({:?})", full_key, expiration);
        self.store.put(full_key, value.into_bytes(), expiration);
        Ok(())
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        self.ready(ctx)?;
        let full_key = self.namespace.apply(key);
        match self.store.live(&full_key) {
            Some(entry) => {
                debug!("✓ Memory GET {} -> HIT", full_key);
                Ok(entry.bytes)
            }
            None => {
                debug!("✓ Memory GET {} -> MISS", full_key);
                Err(Error::NotFound(key.to_string()))
            }
        }
    }

    async fn exists(&self, ctx: &Context, key: &str) -> Result<bool> {
        self.ready(ctx)?;
        Ok(self.store.live(&self.namespace.apply(key)).is_some())
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        self.ready(ctx)?;
        let full_key = self.namespace.apply(key);
        self.store.remove(&full_key);
        debug!("✓ Memory DELETE {}", full_key);
        Ok(())
    }

    async fn remaining_time(&self, ctx: &Context, key: &str) -> Result<TimeToLive> {
        self.ready(ctx)?;
        let ttl = match self.store.live(&self.namespace.apply(key)) {
            None => TimeToLive::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => TimeToLive::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                // Round to the nearest second, as Redis TTL does.
                let left = at.saturating_duration_since(Instant::now());
                TimeToLive::Seconds(left.as_secs() + u64::from(left.subsec_millis() >= 500))
            }
        };
        Ok(ttl)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("✓ Memory cache '{}' closed", self.namespace);
        }
        Ok(())
    }

    fn scheme(&self) -> &str {
        SCHEME
    }

    fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    fn codec(&self) -> Codec {
        self.codec
    }
}

/// Install the `memory` driver.
///
/// Stores are keyed by the URI host and live as long as the registry does.
pub fn register(registry: &DriverRegistry) {
    let stores: Arc<DashMap<String, InMemoryStore>> = Arc::new(DashMap::new());

    registry.register(SCHEME, move |descriptor: ConnectionDescriptor| {
        let stores = stores.clone();
        async move {
            let codec = descriptor.codec()?;
            let name = descriptor.host().unwrap_or(DEFAULT_STORE).to_string();
            let store = stores.entry(name.clone()).or_default().clone();

            info!(
                "✓ Memory cache initialized (store: {}, namespace: '{}', codec: {})",
                name,
                descriptor.namespace(),
                codec
            );

            let cache = InMemoryCache::new(store, descriptor.namespace().clone()).with_codec(codec);
            Ok::<_, Error>(Box::new(cache) as Box<dyn Cache>)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Named {
        name: String,
    }

    fn cache() -> InMemoryCache {
        InMemoryCache::new(InMemoryStore::new(), "test:")
    }

    #[tokio::test]
    async fn test_scalar_and_object_scenario() {
        let cache = cache();
        let ctx = Context::background();

        cache.set(&ctx, "user:1", 42, 60).await.expect("Failed to set");
        assert_eq!(cache.get_int(&ctx, "user:1").await.expect("Failed to get"), 42);

        let obj = Named {
            name: "x".to_string(),
        };
        cache
            .set_object(&ctx, "obj:1", &obj, 60)
            .await
            .expect("Failed to set");
        let target: Named = cache.get_object(&ctx, "obj:1").await.expect("Failed to get");
        assert_eq!(target.name, "x");

        cache.delete(&ctx, "missing").await.expect("Delete must be idempotent");
    }

    #[tokio::test]
    async fn test_namespace_is_applied_to_store_keys() {
        let cache = cache();
        let ctx = Context::background();

        cache.set(&ctx, "k", "v", 0).await.expect("Failed to set");
        assert!(cache.store().entries.contains_key("test:k"));
        assert!(!cache.store().entries.contains_key("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_and_remaining_time() {
        let cache = cache();
        let ctx = Context::background();

        cache.set(&ctx, "k", "v", 3).await.expect("Failed to set");
        assert_eq!(
            cache.remaining_time(&ctx, "k").await.expect("Failed ttl"),
            TimeToLive::Seconds(3)
        );

        tokio::time::advance(Duration::from_millis(1600)).await;
        assert_eq!(
            cache.remaining_time(&ctx, "k").await.expect("Failed ttl"),
            TimeToLive::Seconds(1)
        );
        assert!(cache.exists(&ctx, "k").await.expect("Failed exists"));

        tokio::time::advance(Duration::from_millis(1400)).await;
        assert!(!cache.exists(&ctx, "k").await.expect("Failed exists"));
        assert!(matches!(
            cache.get(&ctx, "k").await,
            Err(Error::NotFound(k)) if k == "k"
        ));
        assert_eq!(
            cache.remaining_time(&ctx, "k").await.expect("Failed ttl"),
            TimeToLive::Missing
        );
        assert!(cache.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_very_large_expiration() {
        let cache = cache();
        let ctx = Context::background();

        cache
            .set(&ctx, "far", 1, 100_000_000_000_000_000_i64)
            .await
            .expect("Failed to set");
        assert_eq!(
            cache.remaining_time(&ctx, "far").await.expect("Failed ttl"),
            TimeToLive::Seconds(100_000_000_000_000_000)
        );

        cache.set(&ctx, "max", 1, i64::MAX).await.expect("Failed to set");
        assert_eq!(cache.get_int(&ctx, "max").await.expect("Failed to get"), 1);
        assert_eq!(
            cache.remaining_time(&ctx, "max").await.expect("Failed ttl"),
            TimeToLive::Persistent
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_positive_expiration_never_expires() {
        let cache = cache();
        let ctx = Context::background();

        cache.set(&ctx, "zero", 1, 0).await.expect("Failed to set");
        cache.set(&ctx, "negative", 1, -10).await.expect("Failed to set");

        tokio::time::advance(Duration::from_secs(86_400)).await;

        for key in ["zero", "negative"] {
            assert_eq!(
                cache.remaining_time(&ctx, key).await.expect("Failed ttl"),
                TimeToLive::Persistent
            );
            assert_eq!(cache.get_int(&ctx, key).await.expect("Failed to get"), 1);
        }
    }

    #[tokio::test]
    async fn test_overwrite_resets_expiration() {
        let cache = cache();
        let ctx = Context::background();

        cache.set(&ctx, "k", 1, 60).await.expect("Failed to set");
        cache.set(&ctx, "k", 2, 0).await.expect("Failed to set");

        assert_eq!(
            cache.remaining_time(&ctx, "k").await.expect("Failed ttl"),
            TimeToLive::Persistent
        );
        assert_eq!(cache.get_int(&ctx, "k").await.expect("Failed to get"), 2);
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let cache = cache();
        let ctx = Context::background();

        cache.set(&ctx, "k", 1, 0).await.expect("Failed to set");
        cache.close().await.expect("Failed to close");
        cache.close().await.expect("Second close must be a no-op");

        assert!(matches!(cache.get(&ctx, "k").await, Err(Error::Closed)));
        assert!(matches!(cache.exists(&ctx, "k").await, Err(Error::Closed)));
        assert!(matches!(cache.delete(&ctx, "k").await, Err(Error::Closed)));
        assert!(matches!(
            cache.set(&ctx, "k", 2, 0).await,
            Err(Error::Closed)
        ));
        assert!(matches!(
            cache.remaining_time(&ctx, "k").await,
            Err(Error::Closed)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_context_is_rejected() {
        let cache = cache();
        let ctx = Context::background();
        ctx.cancel();

        assert!(matches!(
            cache.set(&ctx, "k", 1, 0).await,
            Err(Error::Canceled)
        ));
        assert!(matches!(cache.exists(&ctx, "k").await, Err(Error::Canceled)));
    }

    #[tokio::test]
    async fn test_postcard_codec() {
        let cache = cache().with_codec(Codec::Postcard);
        let ctx = Context::background();

        let obj = Named {
            name: "binary".to_string(),
        };
        cache
            .set_object(&ctx, "obj", &obj, 0)
            .await
            .expect("Failed to set");

        let back: Named = cache.get_object(&ctx, "obj").await.expect("Failed to get");
        assert_eq!(back, obj);
    }

    #[tokio::test]
    async fn test_registered_driver_shares_store_by_host() {
        let registry = DriverRegistry::new();
        register(&registry);
        let ctx = Context::background();

        let a = registry.new_cache("memory://shared/a").await.expect("Failed to create");
        let a_again = registry.new_cache("memory://shared/a").await.expect("Failed to create");
        let other = registry.new_cache("memory://other/a").await.expect("Failed to create");

        a.set(&ctx, "k", "v", 0).await.expect("Failed to set");
        assert_eq!(a_again.get_string(&ctx, "k").await.expect("Failed to get"), "v");
        assert!(!other.exists(&ctx, "k").await.expect("Failed exists"));
        assert_eq!(a.scheme(), "memory");
        assert_eq!(a.namespace(), "a");
    }

    #[tokio::test]
    async fn test_invalid_codec_option_fails_construction() {
        let registry = DriverRegistry::new();
        register(&registry);

        match registry.new_cache("memory://local?codec=xml").await {
            Err(Error::BackendInit { source, .. }) => {
                assert!(matches!(*source, Error::InvalidUri(_)))
            }
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected construction to fail"),
        }
    }
}
