//! Acquire, extend, and release a lock through Redis.
//!
//! Requires a running server; set `REDIS_URL` to point elsewhere:
//! `cargo run -p kvlock --example redis_lock`

use std::time::Duration;

use kvlock::{LockOptions, RedisLockProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

    println!("Connecting to {redis_url}...");
    let provider = RedisLockProvider::builder()
        .url(redis_url)
        .options(
            LockOptions::default()
                .ttl(Duration::from_secs(5))
                .blocking_timeout(Duration::from_secs(2)),
        )
        .build()
        .await?;

    let lock = provider.create_lock("example:report");
    println!("Acquiring {}...", lock.key());

    if lock.acquire().await? {
        println!("Acquired with token {:?}", lock.token());

        // Simulate work that outgrows the first lease.
        tokio::time::sleep(Duration::from_millis(500)).await;
        if lock.extend(Duration::from_secs(5)).await? {
            println!("Extended the lease to finish up");
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        lock.release().await?;
        println!("Released");
    } else {
        println!("Lock is held elsewhere, giving up");
    }

    Ok(())
}
