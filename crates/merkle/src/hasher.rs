//! Leaf and node hashing.
//!
//! Leaves and internal nodes are hashed with different primitives so an
//! internal node can never be replayed as a leaf (or the other way round):
//! leaves go through SHA-256, nodes through Keccak-256.

use alloy_primitives::{B256, U256};
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// Width of one encoded integer in a leaf preimage.
pub const WORD_BYTES: usize = 32;

/// Encode an `(item_id, price)` pair into its leaf hash.
///
/// The preimage is always 64 bytes: both integers as 32-byte big-endian words.
pub fn encode_leaf(item_id: U256, price: U256) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(item_id.to_be_bytes::<WORD_BYTES>());
    hasher.update(price.to_be_bytes::<WORD_BYTES>());
    B256::from_slice(&hasher.finalize())
}

/// Placeholder used to pad odd-sized layers: the leaf of `(0, 0)`.
pub fn fill_leaf() -> B256 {
    encode_leaf(U256::ZERO, U256::ZERO)
}

/// Keccak256 hasher for internal nodes
#[derive(Debug, Clone, Copy)]
pub struct Keccak256Hasher;

impl Keccak256Hasher {
    /// Hash two children in sorted order, so `hash_pair(a, b) == hash_pair(b, a)`.
    pub fn hash_pair(a: &B256, b: &B256) -> B256 {
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = Keccak::v256();
        hasher.update(left.as_slice());
        hasher.update(right.as_slice());
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        B256::from(output)
    }
}
