//! Error types

use alloy_primitives::U256;
use thiserror::Error;

/// Failures while building a tree or generating a proof.
///
/// These are caller bugs: the input catalog or the claimed subset is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// A tree needs at least one item.
    #[error("cannot build a Merkle tree over an empty catalog")]
    EmptyCatalog,
    /// Parallel id/price inputs disagree in length.
    #[error("length mismatch: {ids} item ids but {prices} prices")]
    LengthMismatch {
        /// Number of item ids supplied
        ids: usize,
        /// Number of prices supplied
        prices: usize,
    },
    /// Item id zero is reserved for the fill leaf.
    #[error("item id 0 is reserved")]
    ReservedItemId,
    /// The same item id appears twice in one catalog.
    #[error("duplicate item id {item_id}")]
    DuplicateItem {
        /// The repeated id
        item_id: U256,
    },
    /// A proof was requested for nothing.
    #[error("no items claimed")]
    EmptyClaim,
    /// A claimed pair has no leaf in the tree.
    #[error("item {item_id} at price {price} is not in the catalog")]
    NonMemberClaim {
        /// Claimed id
        item_id: U256,
        /// Claimed price
        price: U256,
    },
}
