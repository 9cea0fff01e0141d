use crate::error::StoreError;

/// Construction-time configuration for a [`KeyStore`](crate::KeyStore).
///
/// All fields are fixed for the lifetime of the store. The bucket count must
/// be a power of two so index derivation stays a mask; the pre-allocation
/// factor sizes the chain-node pool as `ceil(bucket_count * factor)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    /// Number of buckets. Power of two, at least 1.
    pub bucket_count: u32,
    /// Fraction of `bucket_count` pre-allocated as chain-node pool blocks,
    /// in `[0.0, 1.0]`. Zero disables pre-allocation entirely.
    pub pre_allocation_factor: f64,
    /// Whether the store will be used from multiple threads. When set,
    /// buckets are initialized eagerly and entries carry a value mutex;
    /// when clear, buckets initialize lazily on first write.
    pub concurrent: bool,
    /// Pins the hash seed instead of sampling one. Pinned seeds make bucket
    /// placement reproducible across runs.
    pub hash_seed: Option<u32>,
    /// Enables the per-operation atomic counters. Off by default; the hot
    /// path pays nothing when disabled.
    pub track_counters: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket_count: 1024,
            pre_allocation_factor: 0.5,
            concurrent: true,
            hash_seed: None,
            track_counters: false,
        }
    }
}

impl StoreConfig {
    /// Convenience constructor for the three load-bearing knobs; the seed
    /// stays sampled and counters stay off.
    pub fn new(bucket_count: u32, pre_allocation_factor: f64, concurrent: bool) -> Self {
        Self {
            bucket_count,
            pre_allocation_factor,
            concurrent,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.bucket_count == 0 {
            return Err(StoreError::InvalidArgument("bucket count must be at least 1"));
        }
        if !self.bucket_count.is_power_of_two() {
            return Err(StoreError::InvalidConfig("bucket count must be a power of two"));
        }
        // The negated comparison rejects NaN along with out-of-range values.
        if !(0.0..=1.0).contains(&self.pre_allocation_factor) {
            return Err(StoreError::InvalidArgument(
                "pre-allocation factor must lie in [0.0, 1.0]",
            ));
        }
        Ok(())
    }

    /// Chain-node pool capacity: `ceil(bucket_count * factor)`.
    pub(crate) fn chain_pool_capacity(&self) -> usize {
        (f64::from(self.bucket_count) * self.pre_allocation_factor).ceil() as usize
    }
}
