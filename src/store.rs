//! The store façade: bucket array, seed, pools, and the point operations.

use std::alloc::Layout;

use kivi_pool::{BlockPool, PoolStats};
use tracing::debug;

use crate::bucket::{Bucket, UpsertOutcome};
use crate::chain::ChainNode;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::hash::{bucket_index, murmur3_32};
use crate::stats::{self, CollisionStats, CounterSnapshot, OpCounters, OpKind, TableStats};

/// An embedded, thread-safe key–value store.
///
/// Values are arbitrary byte strings keyed by non-empty text. The store is
/// a fixed power-of-two array of buckets, each a collision chain under its
/// own reader–writer lock; chain nodes are carved from a slab pool sized at
/// construction. See the crate docs for the locking discipline.
///
/// A `KeyStore` is an explicitly constructed value: share it behind an
/// [`Arc`](std::sync::Arc) (or a borrow) rather than through globals.
/// Dropping it tears down every bucket and returns all chain nodes to the
/// pool before the pools themselves go away.
pub struct KeyStore {
    buckets: Box<[Bucket]>,
    mask: u32,
    seed: u32,
    concurrent: bool,
    node_pool: BlockPool,
    /// Reserved for the ordered-tree container; carried at zero capacity.
    tree_pool: BlockPool,
    counters: Option<OpCounters>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("buckets", &self.buckets.len())
            .field("mask", &self.mask)
            .field("seed", &self.seed)
            .field("concurrent", &self.concurrent)
            .finish()
    }
}

impl KeyStore {
    /// Builds a store from `config`.
    ///
    /// Validates the bucket count (power of two, at least 1) and the
    /// pre-allocation factor (`[0.0, 1.0]`), creates the node pools, and
    /// creates the bucket array, initializing every bucket container
    /// eagerly when `config.concurrent` is set so no initialization race
    /// exists under load.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;

        let node_pool = BlockPool::new(Layout::new::<ChainNode>(), config.chain_pool_capacity())?;
        // Tree containers are reserved; their pool exists at zero capacity
        // so teardown and stats treat both pools uniformly.
        let tree_pool = BlockPool::new(Layout::new::<ChainNode>(), 0)?;

        let buckets: Box<[Bucket]> = (0..config.bucket_count).map(|_| Bucket::new()).collect();
        if config.concurrent {
            for bucket in buckets.iter() {
                bucket.init_container();
            }
        }

        let seed = config.hash_seed.unwrap_or_else(rand::random);

        debug!(
            buckets = config.bucket_count,
            pool_blocks = node_pool.capacity(),
            concurrent = config.concurrent,
            "key store created"
        );

        Ok(Self {
            buckets,
            mask: config.bucket_count - 1,
            seed,
            concurrent: config.concurrent,
            node_pool,
            tree_pool,
            counters: config.track_counters.then(OpCounters::new),
        })
    }

    /// Inserts `value` under `key`, overwriting in place if the key exists.
    ///
    /// Keys must be non-empty; values must be non-empty. A same-length
    /// overwrite reuses the existing buffer.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if value.is_empty() {
            return Err(StoreError::InvalidArgument("value must be non-empty"));
        }
        let (hash, bucket) = self.route(key)?;
        let result = bucket.upsert(key, hash, value, &self.node_pool, self.concurrent);

        if let Some(counters) = &self.counters {
            match &result {
                Ok(UpsertOutcome::Inserted) => counters.record(OpKind::Insert, None),
                Ok(UpsertOutcome::Updated) => counters.record(OpKind::Update, None),
                Err(error) => counters.record(OpKind::Insert, Some(error)),
            }
        }
        result.map(|_| ())
    }

    /// Copies out the value stored under `key`.
    ///
    /// The returned buffer is freshly allocated and owned by the caller.
    /// Missing keys are [`StoreError::NotFound`].
    pub fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let (hash, bucket) = self.route(key)?;
        let result = bucket.find_copy(hash, key);

        if let Some(counters) = &self.counters {
            counters.record(OpKind::Get, result.as_ref().err());
        }
        result
    }

    /// Removes `key` and destroys its entry. Missing keys are
    /// [`StoreError::NotFound`].
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let (hash, bucket) = self.route(key)?;
        let result = bucket.remove(hash, key, &self.node_pool);

        if let Some(counters) = &self.counters {
            counters.record(OpKind::Delete, result.as_ref().err());
        }
        result
    }

    /// Destroys every entry while leaving the store fully usable.
    /// Idempotent; buckets stay initialized.
    pub fn clear(&self) {
        for bucket in self.buckets.iter() {
            bucket.clear(&self.node_pool);
        }
    }

    /// Live key count. O(buckets): sums every bucket under its read lock.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.len() as usize).sum()
    }

    /// Whether no keys are stored. O(buckets), same as [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.len() == 0)
    }

    /// Number of buckets the store was built with.
    pub fn bucket_count(&self) -> u32 {
        self.mask + 1
    }

    /// The seed the keyed hash runs with. Stable for the store's lifetime;
    /// pin it via [`StoreConfig::hash_seed`] for reproducible placement.
    pub fn hash_seed(&self) -> u32 {
        self.seed
    }

    /// Operation counters, if the store was configured to track them.
    pub fn counters(&self) -> Option<CounterSnapshot> {
        self.counters.as_ref().map(OpCounters::snapshot)
    }

    /// Distribution of live keys over the bucket array.
    pub fn table_stats(&self) -> TableStats {
        stats::table_stats(&self.buckets)
    }

    /// Hash-collision pressure over the bucket array.
    pub fn collision_stats(&self) -> CollisionStats {
        stats::collision_stats(&self.buckets)
    }

    /// Block accounting for the chain-node pool.
    pub fn pool_stats(&self) -> PoolStats {
        self.node_pool.stats()
    }

    /// Block accounting for the reserved tree-node pool.
    pub fn tree_pool_stats(&self) -> PoolStats {
        self.tree_pool.stats()
    }

    /// Validates the key, hashes it, and resolves the owning bucket.
    fn route(&self, key: &str) -> Result<(u32, &Bucket), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key must be non-empty"));
        }
        let hash = murmur3_32(key.as_bytes(), self.seed);
        let index = bucket_index(hash, self.mask);
        Ok((hash, &self.buckets[index]))
    }
}

impl Drop for KeyStore {
    fn drop(&mut self) {
        // Buckets first: teardown walks every chain and returns its nodes
        // to the pool, which must still be alive at that point.
        for bucket in self.buckets.iter() {
            bucket.teardown(&self.node_pool);
        }
        debug!(buckets = self.buckets.len(), "key store torn down");
    }
}
