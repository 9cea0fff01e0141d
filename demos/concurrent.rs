//! Example demonstrating concurrent operations on the store.
//!
//! Multiple threads write disjoint key ranges, read them back, and a few
//! contend on one shared key; per-bucket rwlocks keep the disjoint traffic
//! out of each other's way.

use kivi::{KeyStore, StoreConfig};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const THREADS: usize = 8;
const KEYS_PER_THREAD: usize = 10_000;

fn main() {
    println!("=== Concurrent KeyStore Demo ===\n");

    let store = Arc::new(
        KeyStore::new(StoreConfig {
            track_counters: true,
            ..StoreConfig::new(4096, 1.0, true)
        })
        .expect("valid config"),
    );

    // Disjoint writes from every thread.
    println!("Writing from {} threads...", THREADS);
    let start = Instant::now();
    let mut handles = Vec::new();
    for thread_id in 0..THREADS {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..KEYS_PER_THREAD {
                let key = format!("K{}", thread_id * KEYS_PER_THREAD + i);
                store.set(&key, &thread_id.to_le_bytes()).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    let duration = start.elapsed();
    let total = THREADS * KEYS_PER_THREAD;
    println!(
        "Wrote {} keys in {:?} ({:.0} ops/sec)",
        total,
        duration,
        total as f64 / duration.as_secs_f64()
    );
    println!("Store holds {} keys\n", store.len());

    // Concurrent read-back of every range.
    println!("Reading from {} threads...", THREADS);
    let start = Instant::now();
    let mut handles = Vec::new();
    for thread_id in 0..THREADS {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..KEYS_PER_THREAD {
                let key = format!("K{}", thread_id * KEYS_PER_THREAD + i);
                let value = store.get(&key).unwrap();
                assert_eq!(value, thread_id.to_le_bytes());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    let duration = start.elapsed();
    println!(
        "Read {} keys in {:?} ({:.0} ops/sec)\n",
        total,
        duration,
        total as f64 / duration.as_secs_f64()
    );

    let table = store.table_stats();
    println!(
        "Distribution: {} non-empty buckets, max {} keys/bucket, avg {:.2}, stddev {:.2}",
        table.nonempty_buckets,
        table.max_keys_in_bucket,
        table.avg_keys_per_nonempty_bucket,
        table.stddev_keys_per_bucket
    );
    let collisions = store.collision_stats();
    println!(
        "Collisions: {:.1}% of buckets, worst chain {}",
        collisions.collision_percent,
        collisions.highest_collision_in_bucket + 1
    );

    if let Some(counters) = store.counters() {
        println!(
            "Counters: {} inserts, {} gets ({} failed)",
            counters.total_inserts, counters.total_gets, counters.failed_gets
        );
    }
}
