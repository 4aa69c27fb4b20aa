//! Driver registry: resolves a connection URI to a live cache instance.

use crate::cache::Cache;
use crate::descriptor::ConnectionDescriptor;
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

/// Future returned by a driver constructor.
pub type DriverFuture = BoxFuture<'static, Result<Box<dyn Cache>>>;

/// Type-erased driver constructor.
pub type DriverConstructor = Arc<dyn Fn(ConnectionDescriptor) -> DriverFuture + Send + Sync>;

/// Maps URI schemes to driver constructors.
///
/// The registry is an ordinary value owned by the application, built during
/// initialization and shared (by reference or `Arc`) with whatever creates
/// cache instances. Registration takes a write lock, so it is safe to
/// register from several threads, but the usual pattern is to register
/// everything up front.
///
/// Registering a scheme twice replaces the earlier constructor. Entries are
/// never removed.
///
/// # Example
///
/// ```
/// use cache_facade::{Context, CacheExt, DriverRegistry};
///
/// # async fn example() -> cache_facade::Result<()> {
/// let registry = DriverRegistry::with_builtin_drivers();
/// let cache = registry.new_cache("memory://local/sessions:").await?;
///
/// let ctx = Context::background();
/// cache.set(&ctx, "abc", "alice", 300).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, DriverConstructor>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every driver compiled into this crate.
    ///
    /// - `memory` (feature `inmemory`)
    /// - `redis` (feature `redis`)
    pub fn with_builtin_drivers() -> Self {
        let registry = Self::new();
        #[cfg(feature = "inmemory")]
        crate::backend::inmemory::register(&registry);
        #[cfg(feature = "redis")]
        crate::backend::redis::register(&registry);
        registry
    }

    /// Register a constructor for `scheme`. The last registration wins.
    ///
    /// Schemes are matched case-insensitively.
    pub fn register<F, Fut>(&self, scheme: &str, constructor: F)
    where
        F: Fn(ConnectionDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Box<dyn Cache>>> + Send + 'static,
    {
        let scheme = scheme.to_ascii_lowercase();
        let constructor: DriverConstructor =
            Arc::new(move |descriptor| constructor(descriptor).boxed());

        let previous = self
            .drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scheme.clone(), constructor);

        if previous.is_some() {
            warn!("⚠ Cache driver '{}' re-registered, previous constructor replaced", scheme);
        } else {
            info!("✓ Cache driver '{}' registered", scheme);
        }
    }

    /// Whether a constructor is registered for `scheme`.
    pub fn is_registered(&self, scheme: &str) -> bool {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        schemes.sort();
        schemes
    }

    /// Parse `uri`, pick the driver for its scheme and build a connected
    /// cache instance.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUri`: the URI is malformed
    /// - `Error::UnsupportedScheme`: no driver is registered for the scheme
    /// - `Error::BackendInit`: the driver constructor failed; `source` holds
    ///   the constructor's error unchanged
    pub async fn new_cache(&self, uri: &str) -> Result<Box<dyn Cache>> {
        let descriptor = ConnectionDescriptor::parse(uri)?;
        let scheme = descriptor.scheme().to_string();

        // Clone the constructor out so the lock is not held across the await.
        let constructor = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scheme)
            .cloned()
            .ok_or_else(|| Error::UnsupportedScheme(scheme.clone()))?;

        debug!("» Creating '{}' cache for {}", scheme, descriptor.redacted());

        constructor(descriptor)
            .await
            .map_err(|source| Error::BackendInit {
                scheme,
                source: Box::new(source),
            })
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
