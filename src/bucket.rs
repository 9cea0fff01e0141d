//! One bucket slot: a reader–writer lock over a tagged container.
//!
//! The rwlock protects chain *structure* (head, links, live count); the
//! per-entry mutex inside [`Entry`](crate::entry::Entry) protects value
//! *payload*. Lock order is total and never reversed:
//!
//! ```text
//! bucket rwlock  ->  entry mutex  ->  pool mutex
//! ```
//!
//! Writers (`upsert`, `remove`) take the rwlock exclusively; readers
//! (`find_copy`) share it, each serializing only on the mutex of the entry
//! they touch. A bucket never acquires another bucket's lock, so operations
//! on distinct buckets are fully disjoint.
//!
//! A slot starts uninitialized (no container). Concurrent stores initialize
//! every container eagerly at construction, removing the initialization race
//! from the hot path; single-threaded stores initialize lazily on first
//! write, under the slot's own write lock. Teardown is the only transition
//! back.

use parking_lot::RwLock;

use kivi_pool::BlockPool;

use crate::chain::Chain;
use crate::entry::Entry;
use crate::error::StoreError;

/// The container variants a bucket can carry. Exactly one is implemented;
/// operations answer an unknown tag with
/// [`StoreError::UnsupportedContainer`] instead of trusting its shape.
pub(crate) enum Container {
    Chain(Chain),
    /// Reserved for an ordered-tree container.
    #[allow(dead_code)]
    Tree,
}

struct BucketState {
    /// `None` until the bucket is initialized.
    container: Option<Container>,
    /// Live entries in this bucket.
    len: u32,
}

/// Whether an upsert created the key or overwrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertOutcome {
    Inserted,
    Updated,
}

pub(crate) struct Bucket {
    state: RwLock<BucketState>,
}

// SAFETY: the chain (raw-pointer structure) is only reached through the
// rwlock, and entries synchronize their own payload; see the module docs
// for the lock order.
unsafe impl Send for Bucket {}
unsafe impl Sync for Bucket {}

impl Bucket {
    pub(crate) const fn new() -> Self {
        Self {
            state: RwLock::new(BucketState {
                container: None,
                len: 0,
            }),
        }
    }

    /// Eagerly installs an empty chain container. Idempotent.
    pub(crate) fn init_container(&self) {
        let mut state = self.state.write();
        if state.container.is_none() {
            state.container = Some(Container::Chain(Chain::new()));
        }
    }

    /// Insert-or-update under the write lock.
    ///
    /// A missing container is initialized in place (the lazy path). On any
    /// failure after allocation the new entry is dropped and the chain and
    /// count stay untouched.
    pub(crate) fn upsert(
        &self,
        key: &str,
        key_hash: u32,
        value: &[u8],
        pool: &BlockPool,
        concurrent: bool,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let container = state
            .container
            .get_or_insert_with(|| Container::Chain(Chain::new()));

        match container {
            Container::Chain(chain) => {
                if let Some(entry) = chain.find(key_hash, key) {
                    // SAFETY: write lock held; the entry takes its own
                    // mutex around the byte copy.
                    unsafe { entry.update(value) };
                    return Ok(UpsertOutcome::Updated);
                }

                let entry = Box::new(Entry::new(key, key_hash, value, concurrent));
                chain.push_front(key_hash, entry, pool)?;
                state.len += 1;
                Ok(UpsertOutcome::Inserted)
            }
            Container::Tree => Err(StoreError::UnsupportedContainer),
        }
    }

    /// Copies out the value for `(hash, key)` under the read lock.
    ///
    /// An uninitialized bucket reports [`StoreError::NotFound`]: nothing was
    /// ever written here.
    pub(crate) fn find_copy(&self, key_hash: u32, key: &str) -> Result<Vec<u8>, StoreError> {
        let guard = self.state.read();
        let container = guard.container.as_ref().ok_or(StoreError::NotFound)?;

        match container {
            Container::Chain(chain) => {
                let entry = chain.find(key_hash, key).ok_or(StoreError::NotFound)?;
                // SAFETY: read lock held; mutation requires the write lock,
                // which our hold excludes.
                Ok(unsafe { entry.read() })
            }
            Container::Tree => Err(StoreError::UnsupportedContainer),
        }
    }

    /// Unlinks and destroys the entry for `(hash, key)` under the write
    /// lock, returning its chain node to the pool.
    pub(crate) fn remove(
        &self,
        key_hash: u32,
        key: &str,
        pool: &BlockPool,
    ) -> Result<(), StoreError> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let container = state.container.as_mut().ok_or(StoreError::NotFound)?;

        match container {
            Container::Chain(chain) => {
                let entry = chain.remove(key_hash, key, pool).ok_or(StoreError::NotFound)?;
                state.len -= 1;
                drop(entry);
                Ok(())
            }
            Container::Tree => Err(StoreError::UnsupportedContainer),
        }
    }

    /// Destroys every entry but keeps the container installed, so the
    /// bucket stays initialized. Idempotent.
    pub(crate) fn clear(&self, pool: &BlockPool) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if let Some(Container::Chain(chain)) = state.container.as_mut() {
            chain.clear(pool);
            state.len = 0;
        }
    }

    /// Destroys every entry and uninitializes the bucket. Idempotent; used
    /// only during store teardown.
    pub(crate) fn teardown(&self, pool: &BlockPool) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if let Some(container) = state.container.take() {
            if let Container::Chain(mut chain) = container {
                chain.clear(pool);
                debug_assert!(chain.is_empty());
            }
            state.len = 0;
        }
    }

    /// Live entry count.
    pub(crate) fn len(&self) -> u32 {
        self.state.read().len
    }

    /// Entry count, or `None` while uninitialized. One read-lock hold.
    pub(crate) fn initialized_len(&self) -> Option<u32> {
        let guard = self.state.read();
        guard.container.as_ref().map(|_| guard.len)
    }

    #[cfg(test)]
    fn install_tree_container(&self) {
        self.state.write().container = Some(Container::Tree);
    }
}
