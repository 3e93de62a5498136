//! Catalog Merkle tree

use alloy_primitives::{B256, U256};
use tracing::debug;

use crate::error::MerkleError;
use crate::hasher::{encode_leaf, fill_leaf, Keccak256Hasher};

/// Complete binary Merkle tree over a sorted leaf layer.
///
/// `layers[0]` holds the sorted leaves (padded with the fill leaf when odd),
/// every following layer is the pairwise sorted hash of the one below, and the
/// last layer holds only the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    /// All layers, leaves first
    layers: Vec<Vec<B256>>,
    /// Number of real leaves in `layers[0]`
    leaf_count: usize,
}

impl MerkleTree {
    /// Build a tree from parallel id and price slices.
    pub fn from_parallel(item_ids: &[U256], prices: &[U256]) -> Result<Self, MerkleError> {
        if item_ids.len() != prices.len() {
            return Err(MerkleError::LengthMismatch { ids: item_ids.len(), prices: prices.len() });
        }
        let items: Vec<_> = item_ids.iter().copied().zip(prices.iter().copied()).collect();
        Self::build(&items)
    }

    /// Build a tree over `(item_id, price)` pairs, in any order.
    pub fn build(items: &[(U256, U256)]) -> Result<Self, MerkleError> {
        validate_catalog(items)?;

        let mut leaves: Vec<B256> =
            items.iter().map(|(item_id, price)| encode_leaf(*item_id, *price)).collect();
        leaves.sort_unstable();

        let tree = Self::from_sorted_leaves(leaves);
        debug!(
            target: "merkle",
            leaves = tree.leaf_count,
            depth = tree.depth(),
            root = %tree.root(),
            "Built catalog tree"
        );
        Ok(tree)
    }

    fn from_sorted_leaves(leaves: Vec<B256>) -> Self {
        let leaf_count = leaves.len();
        let fill = fill_leaf();
        let mut layers = Vec::new();
        let mut layer = leaves;

        // The leaf layer is always combined once, so a lone leaf still pairs
        // with the fill leaf.
        loop {
            if layer.len() % 2 == 1 {
                layer.push(fill);
            }
            let parents: Vec<B256> = layer
                .chunks_exact(2)
                .map(|pair| Keccak256Hasher::hash_pair(&pair[0], &pair[1]))
                .collect();
            layers.push(layer);
            if parents.len() == 1 {
                layers.push(parents);
                break;
            }
            layer = parents;
        }

        Self { layers, leaf_count }
    }

    /// Get the root hash
    pub fn root(&self) -> B256 {
        // Construction always ends with a one-node layer.
        self.layers[self.layers.len() - 1][0]
    }

    /// Sorted leaves, without padding.
    pub fn leaves(&self) -> &[B256] {
        &self.layers[0][..self.leaf_count]
    }

    /// Number of catalog items committed.
    pub const fn len(&self) -> usize {
        self.leaf_count
    }

    /// Always false: empty catalogs are rejected at construction.
    pub const fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Number of hashing levels between the leaves and the root.
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// All layers, leaves first; odd layers include their fill leaf.
    pub fn layers(&self) -> &[Vec<B256>] {
        &self.layers
    }

    /// Position of a leaf in the sorted leaf layer.
    pub fn position(&self, leaf: &B256) -> Option<usize> {
        self.leaves().binary_search(leaf).ok()
    }

    /// Whether `(item_id, price)` is committed by this tree.
    pub fn contains(&self, item_id: U256, price: U256) -> bool {
        self.position(&encode_leaf(item_id, price)).is_some()
    }
}

/// Reject empty catalogs, the reserved id and repeated ids before any hashing.
fn validate_catalog(items: &[(U256, U256)]) -> Result<(), MerkleError> {
    if items.is_empty() {
        return Err(MerkleError::EmptyCatalog);
    }
    let mut ids: Vec<U256> = Vec::with_capacity(items.len());
    for (item_id, _) in items {
        if item_id.is_zero() {
            return Err(MerkleError::ReservedItemId);
        }
        ids.push(*item_id);
    }
    ids.sort_unstable();
    if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(MerkleError::DuplicateItem { item_id: pair[0] });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: u64) -> Vec<(U256, U256)> {
        (1..=n).map(|i| (U256::from(i), U256::from(i * 1_000))).collect()
    }

    #[test]
    fn test_single_item_pairs_with_fill_leaf() {
        let tree = MerkleTree::build(&items(1)).unwrap();
        let leaf = encode_leaf(U256::from(1u64), U256::from(1_000u64));
        assert_eq!(tree.root(), Keccak256Hasher::hash_pair(&leaf, &fill_leaf()));
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_two_items() {
        let tree = MerkleTree::build(&items(2)).unwrap();
        let a = encode_leaf(U256::from(1u64), U256::from(1_000u64));
        let b = encode_leaf(U256::from(2u64), U256::from(2_000u64));
        assert_eq!(tree.root(), Keccak256Hasher::hash_pair(&a, &b));
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_odd_layers_are_padded() {
        let tree = MerkleTree::build(&items(5)).unwrap();
        let sizes: Vec<usize> = tree.layers().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![6, 4, 2, 1]);
        assert_eq!(tree.layers()[0][5], fill_leaf());
        assert_eq!(tree.layers()[1][3], fill_leaf());
        assert_eq!(tree.leaves().len(), 5);
    }

    #[test]
    fn test_root_is_order_independent() {
        let forward = items(10);
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut shuffled = forward.clone();
        shuffled.swap(0, 7);
        shuffled.swap(3, 9);

        let root = MerkleTree::build(&forward).unwrap().root();
        assert_eq!(MerkleTree::build(&reversed).unwrap().root(), root);
        assert_eq!(MerkleTree::build(&shuffled).unwrap().root(), root);
    }

    #[test]
    fn test_leaves_are_sorted() {
        let tree = MerkleTree::build(&items(9)).unwrap();
        assert!(tree.leaves().windows(2).all(|w| w[0] < w[1]));
        assert!(tree.contains(U256::from(4u64), U256::from(4_000u64)));
        assert!(!tree.contains(U256::from(4u64), U256::from(4_001u64)));
    }

    #[test]
    fn test_rejects_empty_catalog() {
        assert_eq!(MerkleTree::build(&[]), Err(MerkleError::EmptyCatalog));
    }

    #[test]
    fn test_rejects_zero_item_id() {
        let mut catalog = items(3);
        catalog.push((U256::ZERO, U256::from(5u64)));
        assert_eq!(MerkleTree::build(&catalog), Err(MerkleError::ReservedItemId));
    }

    #[test]
    fn test_rejects_duplicate_item_id() {
        let mut catalog = items(3);
        catalog.push((U256::from(2u64), U256::from(7u64)));
        assert_eq!(
            MerkleTree::build(&catalog),
            Err(MerkleError::DuplicateItem { item_id: U256::from(2u64) })
        );
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let ids = [U256::from(1u64), U256::from(2u64)];
        let prices = [U256::from(1u64)];
        assert_eq!(
            MerkleTree::from_parallel(&ids, &prices),
            Err(MerkleError::LengthMismatch { ids: 2, prices: 1 })
        );
    }
}
