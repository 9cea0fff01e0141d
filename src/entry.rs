//! The owning record for a single key.
//!
//! An [`Entry`] owns its key bytes, the 32-bit hash stored at insertion, and
//! the value buffer. Key and hash never change after construction, which is
//! what makes lock-free comparison during chain traversal sound; only the
//! value bytes mutate, and only under the locking discipline below.
//!
//! # Locking discipline
//!
//! Value bytes live in an [`UnsafeCell`] guarded externally:
//!
//! - mutation requires the owning bucket's rwlock in **write** mode;
//! - reads require the rwlock in read or write mode;
//! - the optional per-entry mutex (present iff the store is concurrent) is
//!   taken inside either of those, serializing byte access among readers of
//!   the same entry.
//!
//! The `unsafe fn`s on this type encode that contract.

use std::cell::UnsafeCell;

use parking_lot::Mutex;

pub(crate) struct Entry {
    key: Box<str>,
    key_hash: u32,
    value: UnsafeCell<Vec<u8>>,
    /// Present iff the store is concurrent.
    value_lock: Option<Mutex<()>>,
}

// SAFETY: the value cell is only accessed under the owning bucket's rwlock
// (write mode for mutation), with the per-entry mutex serializing shared
// readers. All other fields are immutable after construction.
unsafe impl Sync for Entry {}

impl Entry {
    /// Builds an entry owning copies of `key` and `value`. The value mutex
    /// is created iff `concurrent` is set.
    pub(crate) fn new(key: &str, key_hash: u32, value: &[u8], concurrent: bool) -> Self {
        Self {
            key: Box::from(key),
            key_hash,
            value: UnsafeCell::new(value.to_vec()),
            value_lock: concurrent.then(|| Mutex::new(())),
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub(crate) fn key_hash(&self) -> u32 {
        self.key_hash
    }

    /// Hash-first key comparison: the byte compare only runs when the
    /// stored hashes already agree.
    #[inline]
    pub(crate) fn matches(&self, key_hash: u32, key: &str) -> bool {
        self.key_hash == key_hash && self.key() == key
    }

    /// Replaces the value bytes.
    ///
    /// Empty input drops the buffer outright; same-length input overwrites
    /// in place without reallocating; anything else replaces the buffer.
    ///
    /// # Safety
    ///
    /// The caller must hold the owning bucket's rwlock in write mode.
    pub(crate) unsafe fn update(&self, new_value: &[u8]) {
        let _guard = self.value_lock.as_ref().map(|m| m.lock());
        // SAFETY: exclusive access per this function's contract; the mutex
        // above additionally serializes against same-entry readers.
        let value = unsafe { &mut *self.value.get() };
        if new_value.is_empty() {
            *value = Vec::new();
        } else if new_value.len() == value.len() {
            value.copy_from_slice(new_value);
        } else {
            *value = new_value.to_vec();
        }
    }

    /// Copies the current value into a fresh buffer owned by the caller.
    /// A zero-length value comes back as an empty buffer.
    ///
    /// # Safety
    ///
    /// The caller must hold the owning bucket's rwlock (either mode).
    pub(crate) unsafe fn read(&self) -> Vec<u8> {
        let _guard = self.value_lock.as_ref().map(|m| m.lock());
        // SAFETY: no mutation can run concurrently; mutation requires the
        // bucket write lock, which excludes the caller's hold.
        unsafe { (*self.value.get()).clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The tests hold no bucket lock; single-threaded exclusive access
    // satisfies the unsafe contracts trivially.

    #[test]
    fn test_construction_copies_key_and_value() {
        let key = String::from("alpha");
        let value = vec![1u8, 2, 3];
        let entry = Entry::new(&key, 77, &value, false);
        drop((key, value));

        assert_eq!(entry.key(), "alpha");
        assert_eq!(entry.key_hash(), 77);
        assert_eq!(unsafe { entry.read() }, [1, 2, 3]);
    }

    #[test]
    fn test_matches_requires_hash_and_key() {
        let entry = Entry::new("alpha", 77, b"x", false);
        assert!(entry.matches(77, "alpha"));
        assert!(!entry.matches(78, "alpha"));
        // Same hash, different key: the collision case the byte compare
        // exists for.
        assert!(!entry.matches(77, "beta"));
    }

    #[test]
    fn test_same_length_update_is_in_place() {
        let entry = Entry::new("k", 1, b"abcd", false);
        let before = unsafe { (*entry.value.get()).as_ptr() };
        unsafe { entry.update(b"wxyz") };
        let after = unsafe { (*entry.value.get()).as_ptr() };
        assert_eq!(before, after);
        assert_eq!(unsafe { entry.read() }, b"wxyz");
    }

    #[test]
    fn test_resizing_update_replaces_buffer() {
        let entry = Entry::new("k", 1, b"short", false);
        unsafe { entry.update(b"muchlongerdata") };
        assert_eq!(unsafe { entry.read() }, b"muchlongerdata");
        unsafe { entry.update(b"s") };
        assert_eq!(unsafe { entry.read() }, b"s");
    }

    #[test]
    fn test_empty_update_drops_buffer() {
        let entry = Entry::new("k", 1, b"payload", false);
        unsafe { entry.update(b"") };
        let value = unsafe { entry.read() };
        assert!(value.is_empty());
        // The backing buffer is gone, not just truncated.
        assert_eq!(unsafe { (*entry.value.get()).capacity() }, 0);
    }

    #[test]
    fn test_read_returns_independent_copy() {
        let entry = Entry::new("k", 1, b"stable", false);
        let mut copy = unsafe { entry.read() };
        copy[0] = b'X';
        assert_eq!(unsafe { entry.read() }, b"stable");
    }

    #[test]
    fn test_concurrent_flag_controls_value_lock() {
        assert!(Entry::new("k", 1, b"v", true).value_lock.is_some());
        assert!(Entry::new("k", 1, b"v", false).value_lock.is_none());
    }

    #[test]
    fn test_binary_value_with_interior_nul() {
        let bytes = [0x00, 0xff, 0x7e, 0x42, 0x00, 0x10];
        let entry = Entry::new("bin", 5, &bytes, true);
        assert_eq!(unsafe { entry.read() }, bytes);
    }
}
