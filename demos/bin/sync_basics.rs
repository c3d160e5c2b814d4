//! # Cache Core Demo
//!
//! End-to-end walkthrough of `cache-core`'s synchronous surface: basic
//! put/get, a custom `CacheEventListener`, `expire_after_write`, and
//! `get_or_load` coalescing across concurrent callers.
//!
//! ## Running
//!
//! ```bash
//! cargo run -p cache-demo --bin sync_basics --release
//! ```

use cache_core::{Cache, CacheConfig, CacheEventListener, PolicyKind, RemovalCause};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct LoggingListener {
    evictions: AtomicUsize,
}

impl CacheEventListener<String, u64> for LoggingListener {
    fn on_put(&self, key: &String, value: &u64) {
        tracing::info!(%key, value, "put");
    }

    fn on_remove(&self, key: &String, value: &u64, cause: RemovalCause) {
        if matches!(cause, RemovalCause::Evicted(_)) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        tracing::info!(%key, value, ?cause, "removed");
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let listener = Arc::new(LoggingListener { evictions: AtomicUsize::new(0) });

    let cache: Cache<String, u64> = Cache::new(
        CacheConfig::new()
            .with_maximum_size(1_000)
            .with_eviction_policy(PolicyKind::WindowTinyLfu)
            .with_expire_after_write(Duration::from_secs(30))
            .with_maintenance_interval(Duration::from_millis(50))
            .with_listener(listener.clone()),
    )
    .expect("valid cache configuration");

    cache.put("alice".to_string(), 1).unwrap();
    cache.put("bob".to_string(), 2).unwrap();
    println!("alice => {:?}", cache.get(&"alice".to_string()));
    println!("carol => {:?}", cache.get(&"carol".to_string()));

    println!("\nfilling past capacity to trigger eviction...");
    for i in 0..5_000u64 {
        cache.put(format!("key-{i}"), i).unwrap();
    }
    thread::sleep(Duration::from_millis(200));
    println!("size after fill: {}", cache.size());
    println!("evictions observed by listener: {}", listener.evictions.load(Ordering::Relaxed));

    println!("\nconcurrent get_or_load on a single missing key...");
    let cache = Arc::new(cache);
    let invocations = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let invocations = Arc::clone(&invocations);
            thread::spawn(move || {
                cache.get_or_load(&"expensive".to_string(), || {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Ok(42)
                })
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }
    println!(
        "loader invoked {} time(s) for 8 concurrent callers",
        invocations.load(Ordering::SeqCst)
    );

    let stats = cache.stats();
    println!(
        "\nfinal stats: hits={} misses={} hit_rate={:.2} loads={} evictions={}",
        stats.hit_count(),
        stats.miss_count(),
        stats.hit_rate(),
        stats.load_count(),
        stats.eviction_count(),
    );
}
