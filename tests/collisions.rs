//! Collision behavior under pinned seeds: keys that land in the same bucket
//! by construction must coexist, resolve by key bytes, and unlink cleanly.

use kivi::{KeyStore, StoreConfig, StoreError};

const SEED: u32 = 0x9747_b28c;

fn pinned(bucket_count: u32, factor: f64, concurrent: bool) -> KeyStore {
    KeyStore::new(StoreConfig {
        hash_seed: Some(SEED),
        ..StoreConfig::new(bucket_count, factor, concurrent)
    })
    .unwrap()
}

/// Two keys share a bucket iff inserting both into a fresh store leaves
/// exactly one non-empty bucket. Observes placement without reaching into
/// internals; the pinned seed makes it reproducible.
fn share_bucket(a: &str, b: &str, bucket_count: u32) -> bool {
    let probe = pinned(bucket_count, 0.0, true);
    probe.set(a, b"x").unwrap();
    probe.set(b, b"x").unwrap();
    probe.table_stats().nonempty_buckets == 1
}

#[test]
fn test_constructed_collision_in_two_buckets() {
    // With B = 2, half of all keys land in either bucket; scan until a
    // partner provably shares keyA's bucket.
    let base = "keyA";
    let partner = (0..256)
        .map(|i| format!("keyB-{}", i))
        .find(|candidate| share_bucket(base, candidate, 2))
        .expect("half of all keys share the bucket");

    let store = pinned(2, 0.5, true);
    store.set(base, b"first").unwrap();
    store.set(&partner, b"second").unwrap();
    assert_eq!(store.get(base).unwrap(), b"first");
    assert_eq!(store.get(&partner).unwrap(), b"second");

    // Deleting one colliding key leaves the other reachable.
    store.delete(base).unwrap();
    assert_eq!(store.get(base), Err(StoreError::NotFound));
    assert_eq!(store.get(&partner).unwrap(), b"second");
}

#[test]
fn test_single_bucket_chain_workout() {
    // B = 1: every key collides. This exercises long chains: head, middle,
    // and tail removal, plus updates deep in the chain.
    let store = pinned(1, 1.0, false);

    for i in 0..100u32 {
        store
            .set(&format!("chain-{}", i), format!("v{}", i).as_bytes())
            .unwrap();
    }
    assert_eq!(store.len(), 100);
    assert_eq!(store.collision_stats().highest_collision_in_bucket, 99);

    // Update a key buried mid-chain.
    store.set("chain-50", b"updated").unwrap();
    assert_eq!(store.get("chain-50").unwrap(), b"updated");
    assert_eq!(store.len(), 100);

    // Remove from both ends and the middle.
    store.delete("chain-0").unwrap();
    store.delete("chain-99").unwrap();
    store.delete("chain-42").unwrap();
    assert_eq!(store.len(), 97);
    assert_eq!(store.get("chain-42"), Err(StoreError::NotFound));
    assert_eq!(store.get("chain-41").unwrap(), b"v41");
    assert_eq!(store.get("chain-43").unwrap(), b"v43");

    // Drain completely and refill.
    for i in 0..100u32 {
        let _ = store.delete(&format!("chain-{}", i));
    }
    assert!(store.is_empty());
    store.set("fresh", b"v").unwrap();
    assert_eq!(store.get("fresh").unwrap(), b"v");
}

#[test]
fn test_colliding_keys_update_independently() {
    let base = "anchor";
    let partner = (0..256)
        .map(|i| format!("partner-{}", i))
        .find(|candidate| share_bucket(base, candidate, 2))
        .expect("half of all keys share the bucket");

    let store = pinned(2, 0.5, false);
    store.set(base, b"a1").unwrap();
    store.set(&partner, b"b1").unwrap();

    store.set(base, b"a2-longer").unwrap();
    assert_eq!(store.get(base).unwrap(), b"a2-longer");
    assert_eq!(store.get(&partner).unwrap(), b"b1");

    store.set(&partner, b"b2").unwrap();
    assert_eq!(store.get(base).unwrap(), b"a2-longer");
    assert_eq!(store.get(&partner).unwrap(), b"b2");
}

#[test]
fn test_pinned_seed_reproduces_placement() {
    let build = || pinned(16, 0.5, true);

    let first = build();
    let second = build();
    for i in 0..64u32 {
        let key = format!("key-{}", i);
        first.set(&key, b"v").unwrap();
        second.set(&key, b"v").unwrap();
    }

    // Identical seeds and keys give identical distributions.
    assert_eq!(first.table_stats(), second.table_stats());
    assert_eq!(first.collision_stats(), second.collision_stats());
}
