//! Keyed MurmurHash3 (x86 32-bit) and bucket index derivation.
//!
//! The hasher is a total function: every byte string, including the empty
//! one, hashes to a defined value. Argument validation (empty keys) happens
//! at the store façade before any hashing. Bucket counts are powers of two,
//! so index derivation is a single mask.

/// MurmurHash3 x86_32 block mix constants.
const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Round multiplier and addend applied after each mixed block.
const M: u32 = 5;
const N: u32 = 0xe654_6b64;

/// Finalization multipliers.
const F1: u32 = 0x85eb_ca6b;
const F2: u32 = 0xc2b2_ae35;

/// Mixes one 4-byte block into the running state.
#[inline(always)]
fn mix(mut k: u32) -> u32 {
    k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k.wrapping_mul(C2)
}

/// Computes the keyed 32-bit MurmurHash3 of `data`.
///
/// Blocks are consumed as 4-byte little-endian words; the remaining tail
/// bytes are folded in before finalization, and the byte length participates
/// in the finalization xor.
pub(crate) fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;

    let mut blocks = data.chunks_exact(4);
    for block in blocks.by_ref() {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        hash ^= mix(k);
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(M).wrapping_add(N);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, &byte) in tail.iter().enumerate() {
            k ^= u32::from(byte) << (8 * i);
        }
        hash ^= mix(k);
    }

    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(F1);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(F2);
    hash ^= hash >> 16;
    hash
}

/// Derives a bucket index from a hash. `mask` is `bucket_count - 1` for a
/// power-of-two bucket count.
#[inline(always)]
pub(crate) fn bucket_index(hash: u32, mask: u32) -> usize {
    (hash & mask) as usize
}
