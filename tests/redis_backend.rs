//! Redis driver tests. Need a running server:
//!
//! ```text
//! REDIS_URL=redis://localhost:6379 cargo test --features redis -- --ignored
//! ```

#![cfg(feature = "redis")]

use cache_facade::{Cache, CacheExt, Context, DriverRegistry, Error, TimeToLive};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Named {
    name: String,
}

fn base_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Fresh namespace per test so runs do not interfere.
async fn open(suffix: &str) -> Box<dyn Cache> {
    let _ = env_logger::builder().is_test(true).try_init();
    let ns = format!("cache-facade-test:{}:{}:", uuid::Uuid::now_v7(), suffix);
    DriverRegistry::with_builtin_drivers()
        .new_cache(&format!("{}/{}", base_url(), ns))
        .await
        .expect("Failed to connect to Redis")
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_scenario() {
    let cache = open("scenario").await;
    let ctx = Context::background();

    cache.set(&ctx, "user:1", 42, 60).await.expect("Failed to set");
    assert_eq!(cache.get_int(&ctx, "user:1").await.expect("Failed to get"), 42);

    cache
        .set_object(&ctx, "obj:1", &Named { name: "x".to_string() }, 60)
        .await
        .expect("Failed to set");
    let target: Named = cache.get_object(&ctx, "obj:1").await.expect("Failed to get");
    assert_eq!(target.name, "x");

    cache.delete(&ctx, "missing").await.expect("Delete must succeed");
    cache.close().await.expect("Failed to close");
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_ttl_and_exists() {
    let cache = open("ttl").await;
    let ctx = Context::background();

    cache.set(&ctx, "short", "v", 30).await.expect("Failed to set");
    cache.set(&ctx, "forever", "v", 0).await.expect("Failed to set");

    assert!(cache.exists(&ctx, "short").await.expect("Failed exists"));
    match cache.remaining_time(&ctx, "short").await.expect("Failed ttl") {
        TimeToLive::Seconds(secs) => assert!(secs > 0 && secs <= 30),
        other => panic!("Unexpected ttl: {:?}", other),
    }
    assert_eq!(
        cache.remaining_time(&ctx, "forever").await.expect("Failed ttl"),
        TimeToLive::Persistent
    );
    assert_eq!(
        cache.remaining_time(&ctx, "absent").await.expect("Failed ttl"),
        TimeToLive::Missing
    );

    cache.delete(&ctx, "short").await.expect("Failed to delete");
    cache.delete(&ctx, "forever").await.expect("Failed to delete");
    assert!(!cache.exists(&ctx, "short").await.expect("Failed exists"));
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_expiry() {
    let cache = open("expiry").await;
    let ctx = Context::background();

    cache.set(&ctx, "k", "v", 1).await.expect("Failed to set");
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    assert!(matches!(cache.get(&ctx, "k").await, Err(Error::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_namespace_isolation() {
    let a = open("a").await;
    let b = open("b").await;
    let ctx = Context::background();

    a.set(&ctx, "same", "from-a", 60).await.expect("Failed to set");
    assert!(matches!(b.get(&ctx, "same").await, Err(Error::NotFound(_))));

    a.delete(&ctx, "same").await.expect("Failed to delete");
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_closed_instance() {
    let cache = open("closed").await;
    let ctx = Context::background();

    cache.close().await.expect("Failed to close");
    assert!(matches!(cache.get(&ctx, "k").await, Err(Error::Closed)));
}
