//! Basic usage of the cache facade.
//!
//! Runs against the in-process driver by default. Pass a URI to use another
//! backend, e.g. `cargo run --example basic_usage --features redis -- redis://localhost/demo:`.

use cache_facade::{error::Result, CacheExt, Context, DriverRegistry, TimeToLive};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Serialize, Deserialize, Debug)]
struct Employment {
    id: String,
    employer_name: String,
    salary: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Cache Facade - Basic Example ===\n");

    // 1. Build the driver registry during initialization
    let registry = DriverRegistry::with_builtin_drivers();
    println!("1. Registered drivers: {:?}\n", registry.schemes());

    // 2. Resolve a URI to a connected cache
    let uri = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "memory://demo/employment:".to_string());
    let cache = registry.new_cache(&uri).await?;
    println!("2. Connected ({} driver, namespace '{}')\n", cache.scheme(), cache.namespace());

    let ctx = Context::background().with_timeout(Duration::from_secs(2));

    // 3. Scalars
    cache.set(&ctx, "visits", 42, 60).await?;
    cache.set(&ctx, "rate", 0.75, 60).await?;
    println!(
        "3. visits = {}, rate = {}\n",
        cache.get_int(&ctx, "visits").await?,
        cache.get_float(&ctx, "rate").await?
    );

    // 4. Structured values
    let employment = Employment {
        id: "emp_001".to_string(),
        employer_name: "Acme Corp".to_string(),
        salary: 75000.0,
    };
    cache.set_object(&ctx, "emp_001", &employment, 300).await?;
    let loaded: Employment = cache.get_object(&ctx, "emp_001").await?;
    println!("4. Loaded {:?}\n", loaded);

    // 5. Remaining time
    match cache.remaining_time(&ctx, "emp_001").await? {
        TimeToLive::Seconds(secs) => println!("5. emp_001 expires in {}s\n", secs),
        TimeToLive::Persistent => println!("5. emp_001 never expires\n"),
        TimeToLive::Missing => println!("5. emp_001 is gone\n"),
    }

    // 6. Delete is idempotent
    cache.delete(&ctx, "emp_001").await?;
    cache.delete(&ctx, "emp_001").await?;
    println!(
        "6. emp_001 exists after delete: {}\n",
        cache.exists(&ctx, "emp_001").await?
    );

    cache.close().await?;
    println!("=== Example Complete ===\n");

    Ok(())
}
