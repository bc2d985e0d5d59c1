//! Several workers competing for the same lock.
//!
//! Each worker blocks until it gets its turn, holds the lock briefly, then
//! hands it off: `cargo run -p kvlock --example contended_workers`

use std::time::Duration;

use kvlock::{LockOptions, RedisLockProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

    let provider = RedisLockProvider::builder()
        .url(redis_url)
        .options(
            LockOptions::default()
                .ttl(Duration::from_secs(5))
                .blocking_timeout(Duration::from_secs(10))
                .sleep_interval(Duration::from_millis(50)),
        )
        .build()
        .await?;

    let mut workers = Vec::new();
    for worker in 0..4 {
        let lock = provider.create_lock("example:shared-job");
        workers.push(tokio::spawn(async move {
            if lock.acquire().await? {
                println!("worker {worker}: acquired, working...");
                tokio::time::sleep(Duration::from_millis(200)).await;
                lock.release().await?;
                println!("worker {worker}: done");
            } else {
                println!("worker {worker}: gave up waiting");
            }
            Ok::<_, kvlock::LockError>(())
        }));
    }

    for worker in workers {
        worker.await??;
    }
    Ok(())
}
