//! Operation counters and bucket-distribution statistics.
//!
//! Counters are plain relaxed atomics bumped once per operation, and only
//! when the store was configured with `track_counters`; a store without
//! counters pays nothing. Distribution statistics are computed on demand by
//! walking the bucket array, taking each bucket's read lock in turn; the
//! result is per-bucket consistent, not a global snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::bucket::Bucket;
use crate::error::StoreError;

/// Histogram slots for error codes `-1..=-99`, indexed by `-code`.
const ERROR_CODE_SLOTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpKind {
    Insert,
    Update,
    Get,
    Delete,
}

/// Per-operation totals and failures plus an error-code histogram.
pub(crate) struct OpCounters {
    total_inserts: AtomicU64,
    failed_inserts: AtomicU64,
    total_updates: AtomicU64,
    failed_updates: AtomicU64,
    total_gets: AtomicU64,
    failed_gets: AtomicU64,
    total_deletes: AtomicU64,
    failed_deletes: AtomicU64,
    error_codes: [AtomicU64; ERROR_CODE_SLOTS],
}

impl OpCounters {
    pub(crate) fn new() -> Self {
        Self {
            total_inserts: AtomicU64::new(0),
            failed_inserts: AtomicU64::new(0),
            total_updates: AtomicU64::new(0),
            failed_updates: AtomicU64::new(0),
            total_gets: AtomicU64::new(0),
            failed_gets: AtomicU64::new(0),
            total_deletes: AtomicU64::new(0),
            failed_deletes: AtomicU64::new(0),
            error_codes: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Bumps the totals for `op`, the failure counter when `error` is set,
    /// and the histogram slot for the error's code.
    pub(crate) fn record(&self, op: OpKind, error: Option<&StoreError>) {
        let (total, failed) = match op {
            OpKind::Insert => (&self.total_inserts, &self.failed_inserts),
            OpKind::Update => (&self.total_updates, &self.failed_updates),
            OpKind::Get => (&self.total_gets, &self.failed_gets),
            OpKind::Delete => (&self.total_deletes, &self.failed_deletes),
        };
        total.fetch_add(1, Ordering::Relaxed);

        if let Some(error) = error {
            failed.fetch_add(1, Ordering::Relaxed);
            let slot = -error.code();
            if (1..ERROR_CODE_SLOTS as i32).contains(&slot) {
                self.error_codes[slot as usize].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        let mut error_codes = [0u64; ERROR_CODE_SLOTS];
        for (slot, counter) in error_codes.iter_mut().zip(self.error_codes.iter()) {
            *slot = counter.load(Ordering::Relaxed);
        }
        CounterSnapshot {
            total_inserts: self.total_inserts.load(Ordering::Relaxed),
            failed_inserts: self.failed_inserts.load(Ordering::Relaxed),
            total_updates: self.total_updates.load(Ordering::Relaxed),
            failed_updates: self.failed_updates.load(Ordering::Relaxed),
            total_gets: self.total_gets.load(Ordering::Relaxed),
            failed_gets: self.failed_gets.load(Ordering::Relaxed),
            total_deletes: self.total_deletes.load(Ordering::Relaxed),
            failed_deletes: self.failed_deletes.load(Ordering::Relaxed),
            error_codes,
        }
    }
}

/// A point-in-time copy of a store's operation counters.
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    /// Successful and failed insertions of new keys.
    pub total_inserts: u64,
    /// Insertions that returned an error.
    pub failed_inserts: u64,
    /// In-place overwrites of existing keys.
    pub total_updates: u64,
    /// Overwrites that returned an error.
    pub failed_updates: u64,
    /// Lookups, including misses.
    pub total_gets: u64,
    /// Lookups that returned an error (misses included).
    pub failed_gets: u64,
    /// Deletions, including misses.
    pub total_deletes: u64,
    /// Deletions that returned an error (misses included).
    pub failed_deletes: u64,
    error_codes: [u64; ERROR_CODE_SLOTS],
}

impl CounterSnapshot {
    /// How often an operation failed with the given negative error code.
    pub fn errors_with_code(&self, code: i32) -> u64 {
        let slot = -code;
        if (1..ERROR_CODE_SLOTS as i32).contains(&slot) {
            self.error_codes[slot as usize]
        } else {
            0
        }
    }
}

/// Distribution of live keys over the bucket array.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TableStats {
    /// Live keys across all buckets.
    pub total_keys: u64,
    /// Buckets whose container has been initialized.
    pub initialized_buckets: u32,
    /// Initialized buckets holding at least one key.
    pub nonempty_buckets: u32,
    /// Initialized buckets holding no keys.
    pub empty_buckets: u32,
    /// Largest key count in any bucket.
    pub max_keys_in_bucket: u32,
    /// Smallest key count among non-empty buckets (0 when none).
    pub min_keys_in_bucket: u32,
    /// Mean keys per non-empty bucket.
    pub avg_keys_per_nonempty_bucket: f64,
    /// Median keys per non-empty bucket.
    pub median_keys_per_bucket: f64,
    /// Standard deviation of keys per non-empty bucket.
    pub stddev_keys_per_bucket: f64,
    /// Share of initialized buckets that are empty, in percent.
    pub empty_bucket_percent: f64,
}

/// Hash-collision pressure over the bucket array. A bucket with `n > 1`
/// keys contributes `n - 1` collisions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollisionStats {
    /// Buckets holding more than one key.
    pub collision_buckets: u32,
    /// Share of all bucket slots that hold collisions, in percent.
    pub collision_percent: f64,
    /// Collision count of the worst bucket.
    pub highest_collision_in_bucket: u32,
    /// Mean collisions per collision bucket.
    pub avg_collisions_per_collision_bucket: f64,
}

pub(crate) fn table_stats(buckets: &[Bucket]) -> TableStats {
    let mut counts: Vec<u32> = Vec::new();
    let mut initialized = 0u32;

    for bucket in buckets {
        if let Some(len) = bucket.initialized_len() {
            initialized += 1;
            if len > 0 {
                counts.push(len);
            }
        }
    }

    let nonempty = counts.len() as u32;
    let total_keys: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    let avg = if nonempty > 0 {
        total_keys as f64 / f64::from(nonempty)
    } else {
        0.0
    };

    let stddev = if nonempty > 0 {
        let sum_sq: f64 = counts
            .iter()
            .map(|&c| {
                let diff = f64::from(c) - avg;
                diff * diff
            })
            .sum();
        (sum_sq / f64::from(nonempty)).sqrt()
    } else {
        0.0
    };

    counts.sort_unstable();
    let median = match counts.len() {
        0 => 0.0,
        n if n % 2 == 0 => f64::from(counts[n / 2 - 1] + counts[n / 2]) / 2.0,
        n => f64::from(counts[n / 2]),
    };

    TableStats {
        total_keys,
        initialized_buckets: initialized,
        nonempty_buckets: nonempty,
        empty_buckets: initialized - nonempty,
        max_keys_in_bucket: counts.last().copied().unwrap_or(0),
        min_keys_in_bucket: counts.first().copied().unwrap_or(0),
        avg_keys_per_nonempty_bucket: avg,
        median_keys_per_bucket: median,
        stddev_keys_per_bucket: stddev,
        empty_bucket_percent: if initialized > 0 {
            f64::from(initialized - nonempty) / f64::from(initialized) * 100.0
        } else {
            0.0
        },
    }
}

pub(crate) fn collision_stats(buckets: &[Bucket]) -> CollisionStats {
    let mut collision_buckets = 0u32;
    let mut highest = 0u32;
    let mut sum_collisions = 0u64;

    for bucket in buckets {
        let len = bucket.len();
        if len > 1 {
            let collisions = len - 1;
            collision_buckets += 1;
            sum_collisions += u64::from(collisions);
            highest = highest.max(collisions);
        }
    }

    CollisionStats {
        collision_buckets,
        collision_percent: if buckets.is_empty() {
            0.0
        } else {
            f64::from(collision_buckets) / buckets.len() as f64 * 100.0
        },
        highest_collision_in_bucket: highest,
        avg_collisions_per_collision_bucket: if collision_buckets > 0 {
            sum_collisions as f64 / f64::from(collision_buckets)
        } else {
            0.0
        },
    }
}
