//! # Cache Async Demo
//!
//! Shows `cache-async`'s `CacheAsync` wrapper: blocking cache operations
//! driven from async tasks, a deadline that gives up on one caller while the
//! load keeps running for the others, and graceful shutdown.
//!
//! ## Running
//!
//! ```bash
//! cargo run -p cache-demo --bin async_coalescing --release
//! ```

use cache_async::{AsyncCacheConfig, CacheAsync};
use cache_core::{Cache, CacheConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cache: Cache<&'static str, String> =
        Cache::new(CacheConfig::new().with_maximum_size(100)).expect("valid cache configuration");
    let handle = Arc::new(CacheAsync::new(cache, AsyncCacheConfig::new()));

    handle.put_async("greeting", "hello".to_string()).await.unwrap();
    println!("greeting => {:?}", handle.get_async("greeting").await.unwrap());

    println!("\nracing a slow loader against a short deadline...");
    let slow = handle.clone();
    let slow_result = slow
        .get_or_load_async(
            "slow-key",
            || {
                std::thread::sleep(Duration::from_millis(200));
                Ok("slow-value".to_string())
            },
            Some(Duration::from_millis(20)),
        )
        .await;
    println!("caller with 20ms deadline observed: {slow_result:?}");

    // The loader is still running on the blocking threadpool; a second
    // caller for the same key without a deadline rides the same load.
    let patient = handle.clone();
    let patient_result = patient.get_or_load_async("slow-key", || unreachable!("coalesced"), None).await;
    println!("patient caller observed: {patient_result:?}");

    println!("\n8 tasks racing get_or_load_async for one missing key...");
    let invocations = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handle = handle.clone();
        let invocations = Arc::clone(&invocations);
        tasks.push(tokio::spawn(async move {
            handle
                .get_or_load_async(
                    "coalesced-key",
                    move || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(50));
                        Ok("coalesced-value".to_string())
                    },
                    None,
                )
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    println!("loader invoked {} time(s) for 8 tasks", invocations.load(Ordering::SeqCst));

    println!("\nshutting down...");
    handle.shutdown().await;
    match handle.put_async("late", "too late".to_string()).await {
        Ok(()) => unreachable!("handle should reject calls after shutdown"),
        Err(e) => println!("post-shutdown call rejected as expected: {e}"),
    }
}
