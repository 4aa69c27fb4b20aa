//! Cache drivers.
//!
//! Each driver implements [`Cache`](crate::cache::Cache) for one backend and
//! exposes a `register` function that installs its constructor in a
//! [`DriverRegistry`](crate::registry::DriverRegistry).
//!
//! | Scheme     | Feature    | Backend                               |
//! |------------|------------|---------------------------------------|
//! | `memory`   | `inmemory` | in-process store shared per host name |
//! | `redis`    | `redis`    | Redis via `deadpool-redis`            |

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::{InMemoryCache, InMemoryStore};

#[cfg(feature = "redis")]
pub use self::redis::{RedisCache, RedisConfig};
