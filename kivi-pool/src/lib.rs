//! Fixed-capacity slab block pools with LIFO free-list reuse.
//!
//! A [`BlockPool`] carves one contiguous slab into equal-sized blocks and
//! hands them out in O(1):
//!
//! 1. Returned blocks are reused LIFO from a free-list stack.
//! 2. While the slab has untouched blocks, a bump pointer hands out the next
//!    slot.
//! 3. Once the slab is exhausted, allocation falls back to the general
//!    allocator, one block at a time.
//!
//! Blocks handed back via [`BlockPool::dealloc`] are returned to the slab's
//! free list only if they actually lie inside the slab at a block-aligned
//! offset; anything else is released to the general allocator. Callers of
//! `dealloc` therefore never need to remember where a block came from.
//!
//! # Concurrency
//!
//! The free list and bump pointer sit behind one small mutex. The slab
//! geometry is fixed at construction and read without locking. A pool can be
//! shared across threads freely; callers typically invoke it from inside
//! their own critical sections, so the pool mutex is innermost in any lock
//! order.
//!
//! # Example
//!
//! ```
//! use std::alloc::Layout;
//! use kivi_pool::BlockPool;
//!
//! let pool = BlockPool::new(Layout::new::<[u64; 4]>(), 64).unwrap();
//! let block = pool.alloc().unwrap();
//! assert!(pool.owns(block));
//! unsafe { pool.dealloc(block) };
//! ```

#![warn(missing_docs)]

use std::alloc::{alloc, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;

use parking_lot::Mutex;
use tracing::debug;

/// Errors surfaced by pool construction and allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The block layout has zero size.
    ZeroSizeBlock,
    /// The slab size overflows `usize`.
    CapacityOverflow,
    /// The general allocator returned nothing.
    AllocFailed,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::ZeroSizeBlock => write!(f, "block layout has zero size"),
            PoolError::CapacityOverflow => write!(f, "slab size overflows usize"),
            PoolError::AllocFailed => write!(f, "allocation failed"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Point-in-time snapshot of a pool's block accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Size of one block in bytes (including alignment padding).
    pub block_size: usize,
    /// Total number of slab blocks.
    pub capacity: usize,
    /// Slab blocks never yet handed out (bump pointer headroom).
    pub available: usize,
    /// Returned slab blocks waiting on the free list.
    pub reusable: usize,
}

/// The contiguous backing region. Geometry is immutable after construction.
struct Slab {
    base: NonNull<u8>,
    layout: Layout,
    capacity: usize,
}

impl Drop for Slab {
    fn drop(&mut self) {
        // SAFETY: `base` was produced by `alloc(self.layout)` in
        // `Slab::create` and is released exactly once, here.
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}

impl Slab {
    fn create(block: Layout, capacity: usize) -> Result<Self, PoolError> {
        let size = block
            .size()
            .checked_mul(capacity)
            .ok_or(PoolError::CapacityOverflow)?;
        let layout =
            Layout::from_size_align(size, block.align()).map_err(|_| PoolError::CapacityOverflow)?;

        // SAFETY: `layout` has non-zero size (block size and capacity are
        // both non-zero when this is called).
        let base = NonNull::new(unsafe { alloc(layout) }).ok_or(PoolError::AllocFailed)?;

        Ok(Self {
            base,
            layout,
            capacity,
        })
    }

    #[inline]
    fn contains(&self, ptr: NonNull<u8>, block_size: usize) -> bool {
        let addr = ptr.as_ptr() as usize;
        let start = self.base.as_ptr() as usize;
        let end = start + self.layout.size();
        addr >= start && addr < end && (addr - start) % block_size == 0
    }
}

/// Mutable allocation state: the LIFO free list and the bump cursor.
struct FreeState {
    /// Returned slab blocks, popped LIFO before the bump pointer advances.
    free: Vec<NonNull<u8>>,
    /// Number of slab blocks handed out so far. Only ever advances.
    bump: usize,
}

/// A fixed-capacity pool of identically-sized blocks.
///
/// Construction with capacity 0 yields a *disabled* pool: every `alloc` is a
/// general-allocator call and every `dealloc` a general-allocator release.
/// This is the pre-allocation-factor-zero configuration.
pub struct BlockPool {
    /// Per-block layout, padded to its own alignment so slab slots tile.
    block: Layout,
    slab: Option<Slab>,
    state: Mutex<FreeState>,
}

// SAFETY: the slab geometry is immutable after construction; the free list
// and bump cursor are guarded by `state`. Blocks are raw memory whose
// ownership transfers through alloc/dealloc.
unsafe impl Send for BlockPool {}
unsafe impl Sync for BlockPool {}

impl BlockPool {
    /// Creates a pool of `capacity` blocks, each laid out as `block`.
    ///
    /// Capacity 0 creates a disabled pool (no slab, pure fallback). A failed
    /// slab allocation is reported as [`PoolError::AllocFailed`]; no pool
    /// exists in that case, so later allocations cannot observe a
    /// half-initialized slab.
    pub fn new(block: Layout, capacity: usize) -> Result<Self, PoolError> {
        if block.size() == 0 {
            return Err(PoolError::ZeroSizeBlock);
        }
        let block = block.pad_to_align();

        let slab = if capacity == 0 {
            None
        } else {
            let slab = Slab::create(block, capacity)?;
            debug!(
                blocks = capacity,
                block_size = block.size(),
                bytes = block.size() * capacity,
                "slab created"
            );
            Some(slab)
        };

        Ok(Self {
            block,
            slab,
            state: Mutex::new(FreeState {
                free: Vec::with_capacity(capacity),
                bump: 0,
            }),
        })
    }

    /// Size of one block in bytes, alignment padding included.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block.size()
    }

    /// Total number of slab blocks. 0 for a disabled pool.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slab.as_ref().map_or(0, |s| s.capacity)
    }

    /// Whether `ptr` is a block of this pool's slab.
    ///
    /// True iff the address lies inside the slab and sits at a multiple of
    /// the block size from the slab start. Heap-fallback blocks are not
    /// owned.
    #[inline]
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.slab
            .as_ref()
            .is_some_and(|s| s.contains(ptr, self.block.size()))
    }

    /// Allocates one block.
    ///
    /// Order: free-list LIFO pop, then the slab bump pointer, then the
    /// general allocator. Fails only if the general allocator does.
    pub fn alloc(&self) -> Result<NonNull<u8>, PoolError> {
        {
            let mut state = self.state.lock();
            if let Some(ptr) = state.free.pop() {
                return Ok(ptr);
            }
            if let Some(slab) = &self.slab {
                if state.bump < slab.capacity {
                    let offset = state.bump * self.block.size();
                    state.bump += 1;
                    // SAFETY: `offset` addresses block `bump` of the slab,
                    // which spans `capacity` blocks; `bump < capacity` holds.
                    let ptr = unsafe { NonNull::new_unchecked(slab.base.as_ptr().add(offset)) };
                    return Ok(ptr);
                }
            }
        }

        // SAFETY: `self.block` has non-zero size, checked at construction.
        NonNull::new(unsafe { alloc(self.block) }).ok_or(PoolError::AllocFailed)
    }

    /// Returns a block to the pool.
    ///
    /// Slab blocks go back on the free list; anything else is released to
    /// the general allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`alloc`](Self::alloc) on this pool
    /// and must not be used, or deallocated, again.
    pub unsafe fn dealloc(&self, ptr: NonNull<u8>) {
        if self.owns(ptr) {
            let mut state = self.state.lock();
            // The slab holds `capacity` distinct blocks, so an in-bounds
            // free list cannot overflow unless a block is returned twice.
            debug_assert!(state.free.len() < self.capacity());
            state.free.push(ptr);
            return;
        }

        // SAFETY: a block not owned by the slab came from the heap-fallback
        // arm of `alloc`, which used `self.block` as its layout.
        unsafe { dealloc(ptr.as_ptr(), self.block) };
    }

    /// Snapshot of the pool's block accounting.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            block_size: self.block.size(),
            capacity: self.capacity(),
            available: self.capacity() - state.bump,
            reusable: state.free.len(),
        }
    }
}

impl fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("BlockPool")
            .field("block_size", &stats.block_size)
            .field("capacity", &stats.capacity)
            .field("available", &stats.available)
            .field("reusable", &stats.reusable)
            .finish()
    }
}
