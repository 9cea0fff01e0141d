//! Embedded, thread-safe, bucketed hash key–value store.
//!
//! `kivi` maps non-empty text keys to arbitrary binary values inside a
//! single host process. The design is a fixed power-of-two array of
//! buckets, each holding a collision chain behind its own reader–writer
//! lock; chain nodes are carved from a fixed-capacity slab pool
//! ([`kivi-pool`](kivi_pool)) so delete-heavy churn stays off the general
//! allocator.
//!
//! # Architecture
//!
//! - **Hashing**: keyed MurmurHash3-32; the bucket index is `hash & (B-1)`.
//! - **Buckets**: one rwlock per bucket. Writers (`set`, `delete`) take it
//!   exclusively, readers (`get`) share it; operations on distinct buckets
//!   never contend.
//! - **Entries**: one owning record per key. Key bytes and the stored hash
//!   are immutable; value bytes sit behind an optional per-entry mutex
//!   (present iff the store is concurrent) taken inside the bucket lock.
//! - **Pools**: chain nodes come from a slab sized
//!   `ceil(buckets x pre_allocation_factor)`, with LIFO reuse and a heap
//!   fallback on exhaustion. A second pool slot is reserved for an
//!   ordered-tree container variant.
//!
//! Lock order is total: bucket rwlock, then entry mutex, then pool mutex.
//! No path acquires two bucket locks, so per-key operations are
//! linearizable and cross-key operations are deliberately unordered.
//!
//! # Example
//!
//! ```
//! use kivi::{KeyStore, StoreConfig};
//!
//! let store = KeyStore::new(StoreConfig::new(64, 0.5, true))?;
//! store.set("greeting", b"hello")?;
//! assert_eq!(store.get("greeting")?, b"hello");
//! store.delete("greeting")?;
//! assert!(store.get("greeting").is_err());
//! # Ok::<(), kivi::StoreError>(())
//! ```
//!
//! # Concurrency
//!
//! Construct one store and share it (typically behind an
//! [`Arc`](std::sync::Arc)) across any number of threads. With
//! `concurrent` set, every bucket is initialized at construction, so the
//! hot path never races on initialization. With it clear, buckets
//! initialize lazily on first write and entries skip their value mutex;
//! operations remain memory-safe either way because all structural access
//! goes through the bucket locks.

#![warn(missing_docs)]

mod bucket;
mod chain;
mod config;
mod entry;
mod error;
mod hash;
mod stats;
mod store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use stats::{CollisionStats, CounterSnapshot, TableStats};
pub use store::KeyStore;

pub use kivi_pool::PoolStats;
