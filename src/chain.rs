//! Singly-linked collision chain with pool-backed nodes.
//!
//! Each node stores the hash computed at insertion next to the owned
//! [`Entry`], so a traversal compares integers first and touches key bytes
//! only on a hash match. Node storage comes from the store's chain-node
//! [`BlockPool`]; the chain itself owns the nodes but not their backing
//! blocks, which is why every structural operation takes the pool.
//!
//! All methods assume the caller holds the owning bucket's lock in the mode
//! the operation requires; the chain performs no synchronization of its own.

use std::ptr::{self, NonNull};

use kivi_pool::BlockPool;

use crate::entry::Entry;
use crate::error::StoreError;

pub(crate) struct ChainNode {
    /// Hash stored at insertion; checked before the entry's key bytes.
    hash: u32,
    entry: Box<Entry>,
    next: *mut ChainNode,
}

pub(crate) struct Chain {
    head: *mut ChainNode,
}

impl Chain {
    pub(crate) const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Prepends a node referencing `entry`. O(1).
    ///
    /// On allocation failure the entry is dropped before the error returns,
    /// leaving the chain exactly as it was.
    pub(crate) fn push_front(
        &mut self,
        hash: u32,
        entry: Box<Entry>,
        pool: &BlockPool,
    ) -> Result<(), StoreError> {
        debug_assert_eq!(hash, entry.key_hash());
        let block = pool.alloc()?.cast::<ChainNode>();
        // SAFETY: the pool was built over the ChainNode layout, so `block`
        // is properly sized and aligned, and it is exclusively ours.
        unsafe {
            block.as_ptr().write(ChainNode {
                hash,
                entry,
                next: self.head,
            });
        }
        self.head = block.as_ptr();
        Ok(())
    }

    /// Linear scan for `(hash, key)`. The stored hash is compared before
    /// any key bytes.
    pub(crate) fn find(&self, key_hash: u32, key: &str) -> Option<&Entry> {
        let mut current = self.head;
        while !current.is_null() {
            // SAFETY: nodes are owned by this chain and stay alive until
            // unlinked, which requires the same exclusive access the caller
            // already holds for mutation paths.
            let node = unsafe { &*current };
            if node.hash == key_hash && node.entry.matches(key_hash, key) {
                return Some(&node.entry);
            }
            current = node.next;
        }
        None
    }

    /// Unlinks the first node matching `(hash, key)` and returns its entry.
    /// The node's block goes back to the pool.
    pub(crate) fn remove(
        &mut self,
        key_hash: u32,
        key: &str,
        pool: &BlockPool,
    ) -> Option<Box<Entry>> {
        let mut previous: *mut ChainNode = ptr::null_mut();
        let mut current = self.head;

        while !current.is_null() {
            // SAFETY: see `find`; additionally we hold `&mut self`.
            let node = unsafe { &*current };
            let next = node.next;

            if node.hash == key_hash && node.entry.matches(key_hash, key) {
                if previous.is_null() {
                    self.head = next;
                } else {
                    // SAFETY: `previous` was a live node on this chain one
                    // step ago and nothing has unlinked it.
                    unsafe { (*previous).next = next };
                }
                // SAFETY: `current` is unlinked and exclusively ours; the
                // read moves the node out so its block can be recycled.
                let node = unsafe { current.read() };
                // SAFETY: the block came from `pool.alloc` in `push_front`.
                unsafe { pool.dealloc(NonNull::new_unchecked(current.cast())) };
                return Some(node.entry);
            }

            previous = current;
            current = next;
        }
        None
    }

    /// Destroys every node and entry, leaving the chain empty.
    pub(crate) fn clear(&mut self, pool: &BlockPool) {
        let mut current = self.head;
        self.head = ptr::null_mut();
        while !current.is_null() {
            // SAFETY: exclusive access via `&mut self`; each node is moved
            // out exactly once and its block returned to the pool it came
            // from.
            let node = unsafe { current.read() };
            unsafe { pool.dealloc(NonNull::new_unchecked(current.cast())) };
            current = node.next;
        }
    }
}

// SAFETY: the chain is a plain linked structure; thread-safety comes from
// the bucket lock that guards every access to it.
unsafe impl Send for Chain {}
unsafe impl Sync for Chain {}

impl Drop for Chain {
    fn drop(&mut self) {
        // The bucket clears the chain through the pool before dropping it;
        // a non-empty chain here would leak its nodes.
        debug_assert!(self.head.is_null(), "chain dropped while non-empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::alloc::Layout;

    fn node_pool(capacity: usize) -> BlockPool {
        BlockPool::new(Layout::new::<ChainNode>(), capacity).unwrap()
    }

    fn entry(key: &str, hash: u32, value: &[u8]) -> Box<Entry> {
        Box::new(Entry::new(key, hash, value, false))
    }

    #[test]
    fn test_push_then_find() {
        let pool = node_pool(8);
        let mut chain = Chain::new();
        assert!(chain.is_empty());

        chain.push_front(1, entry("a", 1, b"va"), &pool).unwrap();
        chain.push_front(2, entry("b", 2, b"vb"), &pool).unwrap();

        assert_eq!(chain.find(1, "a").unwrap().key(), "a");
        assert_eq!(chain.find(2, "b").unwrap().key(), "b");
        assert!(chain.find(3, "c").is_none());
        assert!(chain.find(1, "b").is_none());

        chain.clear(&pool);
    }

    #[test]
    fn test_hash_collision_resolved_by_key_bytes() {
        let pool = node_pool(8);
        let mut chain = Chain::new();
        chain.push_front(9, entry("first", 9, b"1"), &pool).unwrap();
        chain.push_front(9, entry("second", 9, b"2"), &pool).unwrap();

        assert_eq!(chain.find(9, "first").unwrap().key(), "first");
        assert_eq!(chain.find(9, "second").unwrap().key(), "second");
        assert!(chain.find(9, "third").is_none());

        chain.clear(&pool);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let pool = node_pool(8);
        let mut chain = Chain::new();
        for (i, key) in ["x", "y", "z"].iter().enumerate() {
            chain
                .push_front(i as u32, entry(key, i as u32, b"v"), &pool)
                .unwrap();
        }
        // Chain order is z, y, x.

        // Middle.
        assert_eq!(chain.remove(1, "y", &pool).unwrap().key(), "y");
        assert!(chain.find(1, "y").is_none());
        // Head.
        assert_eq!(chain.remove(2, "z", &pool).unwrap().key(), "z");
        // Tail (now also head).
        assert_eq!(chain.remove(0, "x", &pool).unwrap().key(), "x");
        assert!(chain.is_empty());

        assert!(chain.remove(0, "x", &pool).is_none());
    }

    #[test]
    fn test_removed_blocks_are_reused() {
        let pool = node_pool(4);
        let mut chain = Chain::new();
        chain.push_front(1, entry("a", 1, b"v"), &pool).unwrap();
        chain.remove(1, "a", &pool).unwrap();

        // The freed block sits on the pool's free list and serves the next
        // insertion before the bump pointer advances.
        let available_before = pool.stats().available;
        assert_eq!(pool.stats().reusable, 1);
        chain.push_front(2, entry("b", 2, b"v"), &pool).unwrap();
        assert_eq!(pool.stats().reusable, 0);
        assert_eq!(pool.stats().available, available_before);

        chain.clear(&pool);
    }

    #[test]
    fn test_clear_returns_all_blocks() {
        let pool = node_pool(16);
        let mut chain = Chain::new();
        for i in 0..10u32 {
            let key = format!("key-{}", i);
            chain.push_front(i, entry(&key, i, b"v"), &pool).unwrap();
        }
        chain.clear(&pool);
        assert!(chain.is_empty());
        assert_eq!(pool.stats().reusable, 10);
    }

    #[test]
    fn test_exhausted_pool_still_inserts() {
        let pool = node_pool(1);
        let mut chain = Chain::new();
        chain.push_front(1, entry("a", 1, b"v"), &pool).unwrap();
        // Second node comes from the heap fallback.
        chain.push_front(2, entry("b", 2, b"v"), &pool).unwrap();
        assert_eq!(chain.find(2, "b").unwrap().key(), "b");
        chain.clear(&pool);
    }
}
