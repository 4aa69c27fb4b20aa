//! The cache contract every driver implements.

use crate::context::Context;
use crate::error::Result;
use crate::serialization::Codec;
use crate::value::{self, CacheValue};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;

/// How long a record lives after `set`.
///
/// Expirations are whole seconds. Zero or negative seconds mean the record
/// never expires; there is no "expire immediately" write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    #[default]
    Never,
    Seconds(u64),
}

impl Expiration {
    /// Build from signed seconds; `secs <= 0` yields `Never`.
    pub fn from_secs(secs: i64) -> Self {
        if secs <= 0 {
            Expiration::Never
        } else {
            Expiration::Seconds(secs as u64)
        }
    }

    /// Whole seconds to pass to the backend, or `None` for no expiry.
    pub fn as_secs(&self) -> Option<u64> {
        match *self {
            Expiration::Seconds(0) | Expiration::Never => None,
            Expiration::Seconds(secs) => Some(secs),
        }
    }
}

impl From<i64> for Expiration {
    fn from(secs: i64) -> Self {
        Expiration::from_secs(secs)
    }
}

impl From<i32> for Expiration {
    fn from(secs: i32) -> Self {
        Expiration::from_secs(secs as i64)
    }
}

impl From<u64> for Expiration {
    fn from(secs: u64) -> Self {
        if secs == 0 {
            Expiration::Never
        } else {
            Expiration::Seconds(secs)
        }
    }
}

impl From<Duration> for Expiration {
    /// Sub-second remainders round up to the next whole second.
    fn from(ttl: Duration) -> Self {
        let secs = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
        if secs == 0 {
            Expiration::Never
        } else {
            Expiration::Seconds(secs)
        }
    }
}

impl From<Option<Duration>> for Expiration {
    fn from(ttl: Option<Duration>) -> Self {
        ttl.map(Expiration::from).unwrap_or_default()
    }
}

/// Remaining lifetime of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeToLive {
    /// No record under this key.
    Missing,
    /// Record exists and never expires.
    Persistent,
    /// Record expires in this many whole seconds.
    Seconds(u64),
}

impl TimeToLive {
    pub fn as_duration(&self) -> Option<Duration> {
        match *self {
            TimeToLive::Seconds(secs) => Some(Duration::from_secs(secs)),
            _ => None,
        }
    }
}

/// Operations every cache driver supports.
///
/// Keys are caller keys; implementations prefix them with their namespace
/// before talking to the backend. Every operation runs under a [`Context`]
/// and returns `Error::Canceled` or `Error::DeadlineExceeded` when the
/// context fires first. After [`close`](Cache::close) every operation fails
/// with `Error::Closed`.
///
/// The trait is object safe: the registry hands out `Box<dyn Cache>`. Typed
/// helpers live on [`CacheExt`].
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store a value.
    ///
    /// # Errors
    /// - `Error::Closed`: instance closed
    /// - `Error::Backend`: backend rejected the write or is unreachable
    async fn set_value(
        &self,
        ctx: &Context,
        key: &str,
        value: CacheValue,
        expiration: Expiration,
    ) -> Result<()>;

    /// Raw stored bytes.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the key is absent or expired
    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>>;

    /// Whether the key is present and not expired.
    ///
    /// Backend failures are returned as errors, never as `false`.
    async fn exists(&self, ctx: &Context, key: &str) -> Result<bool>;

    /// Remove a key. Removing a missing key succeeds.
    async fn delete(&self, ctx: &Context, key: &str) -> Result<()>;

    /// Remaining lifetime of a key.
    async fn remaining_time(&self, ctx: &Context, key: &str) -> Result<TimeToLive>;

    /// Release the backend connection. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    /// Driver scheme this instance was built for.
    fn scheme(&self) -> &str;

    /// Key prefix applied by this instance.
    fn namespace(&self) -> &str;

    /// Codec used for structured values.
    fn codec(&self) -> Codec;
}

/// Typed reads and writes on top of [`Cache`].
///
/// Implemented for every `Cache`, including `dyn Cache`.
///
/// # Example
///
/// ```
/// # use cache_facade::{CacheExt, Context, DriverRegistry};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Serialize, Deserialize)] struct User { name: String }
/// # async fn example() -> cache_facade::Result<()> {
/// let registry = DriverRegistry::with_builtin_drivers();
/// let cache = registry.new_cache("memory://local/app:").await?;
/// let ctx = Context::background();
///
/// cache.set(&ctx, "user:1", 42, 60).await?;
/// assert_eq!(cache.get_int(&ctx, "user:1").await?, 42);
///
/// cache.set_object(&ctx, "obj:1", &User { name: "x".into() }, 60).await?;
/// let user: User = cache.get_object(&ctx, "obj:1").await?;
/// assert_eq!(user.name, "x");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CacheExt: Cache {
    /// Store a scalar (text, bool, number or bytes) in native form.
    async fn set<V, E>(&self, ctx: &Context, key: &str, value: V, expiration: E) -> Result<()>
    where
        V: Into<CacheValue> + Send,
        E: Into<Expiration> + Send,
    {
        self.set_value(ctx, key, value.into(), expiration.into())
            .await
    }

    /// Encode a structured value with the instance codec and store it.
    ///
    /// # Errors
    /// Returns `Error::Encode` if the value cannot be serialized
    async fn set_object<T, E>(
        &self,
        ctx: &Context,
        key: &str,
        value: &T,
        expiration: E,
    ) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
        E: Into<Expiration> + Send,
    {
        let bytes = self.codec().encode(value)?;
        self.set_value(ctx, key, CacheValue::Structured(bytes), expiration.into())
            .await
    }

    /// Fetch and decode a structured value.
    ///
    /// # Errors
    /// - `Error::NotFound`: key absent or expired
    /// - `Error::Decode`: stored bytes are not a valid `T`
    async fn get_object<T>(&self, ctx: &Context, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let bytes = self.get(ctx, key).await?;
        self.codec().decode(&bytes)
    }

    /// # Errors
    /// `Error::NotFound`, or `Error::TypeMismatch` if the value is not UTF-8
    async fn get_string(&self, ctx: &Context, key: &str) -> Result<String> {
        let bytes = self.get(ctx, key).await?;
        value::parse_string(key, bytes)
    }

    /// # Errors
    /// `Error::NotFound`, or `Error::TypeMismatch` if the value is not an integer
    async fn get_int(&self, ctx: &Context, key: &str) -> Result<i64> {
        let bytes = self.get(ctx, key).await?;
        value::parse_int(key, &bytes)
    }

    /// # Errors
    /// `Error::NotFound`, or `Error::TypeMismatch` if the value is not a number
    async fn get_float(&self, ctx: &Context, key: &str) -> Result<f64> {
        let bytes = self.get(ctx, key).await?;
        value::parse_float(key, &bytes)
    }

    /// # Errors
    /// `Error::NotFound`, or `Error::TypeMismatch` unless the value is
    /// `1`, `0`, `true` or `false`
    async fn get_bool(&self, ctx: &Context, key: &str) -> Result<bool> {
        let bytes = self.get(ctx, key).await?;
        value::parse_bool(key, &bytes)
    }

    /// Return the cached structured value, or compute, store and return it.
    ///
    /// Only `NotFound` triggers `load`; every other read error is returned.
    async fn get_or_set_object<T, E, F, Fut>(
        &self,
        ctx: &Context,
        key: &str,
        expiration: E,
        load: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Into<Expiration> + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        match self.get_object::<T>(ctx, key).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        debug!("Cache miss for {}, loading value", key);
        let value = load().await?;
        self.set_object(ctx, key, &value, expiration).await?;
        Ok(value)
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

#[async_trait]
impl<C: Cache + ?Sized> Cache for Box<C> {
    async fn set_value(
        &self,
        ctx: &Context,
        key: &str,
        value: CacheValue,
        expiration: Expiration,
    ) -> Result<()> {
        (**self).set_value(ctx, key, value, expiration).await
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        (**self).get(ctx, key).await
    }

    async fn exists(&self, ctx: &Context, key: &str) -> Result<bool> {
        (**self).exists(ctx, key).await
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        (**self).delete(ctx, key).await
    }

    async fn remaining_time(&self, ctx: &Context, key: &str) -> Result<TimeToLive> {
        (**self).remaining_time(ctx, key).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }

    fn scheme(&self) -> &str {
        (**self).scheme()
    }

    fn namespace(&self) -> &str {
        (**self).namespace()
    }

    fn codec(&self) -> Codec {
        (**self).codec()
    }
}
