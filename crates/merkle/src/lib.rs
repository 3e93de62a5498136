//! Merkle multiproofs over a storefront catalog
//!
//! A catalog of `(item_id, price)` pairs is committed to one 32-byte root.
//! Buyers prove that the items they want are part of the catalog with a
//! multiproof: the claimed leaves plus a short list of sibling hashes and one
//! flag per combination step.
//!
//! - Leaves are `sha256(be32(item_id) || be32(price))`.
//! - Internal nodes are `keccak256` of their two children in sorted order, so
//!   proofs carry no left/right information.
//! - Odd layers are padded with the fill leaf, the leaf of `(0, 0)`.

mod error;
mod hasher;
mod proof;
mod tree;
mod verify;

pub use alloy_primitives::{B256, U256};
pub use error::MerkleError;
pub use hasher::{encode_leaf, fill_leaf, Keccak256Hasher};
pub use proof::MultiProof;
pub use tree::MerkleTree;
pub use verify::{
    process_multi_proof, verify, verify_detailed, verify_with_limits, ShapeError, VerifierLimits,
    VerifyError, DEFAULT_MAX_DEPTH,
};
