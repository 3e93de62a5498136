//! Catalog management

use std::collections::HashMap;
use std::path::Path;

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use storefront_merkle::{MerkleError, MerkleTree, MultiProof};
use thiserror::Error;
use tracing::info;

use crate::types::CatalogItem;

/// Catalog loading or proving failure
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    /// Catalog file is not valid JSON for a catalog
    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
    /// Empty, duplicate or reserved entries, or a non-member claim
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    /// No entry with this id
    #[error("unknown item id {item_id}")]
    UnknownItem {
        /// Requested id
        item_id: U256,
    },
}

/// On-disk catalog layout
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// All entries
    pub items: Vec<CatalogItem>,
}

/// A validated catalog together with its Merkle tree
#[derive(Clone, Debug)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    prices: HashMap<U256, U256>,
    tree: MerkleTree,
}

impl Catalog {
    /// Build a catalog; empty, zero-id and duplicate-id inputs are rejected.
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let pairs: Vec<_> = items.iter().map(CatalogItem::pair).collect();
        let tree = MerkleTree::build(&pairs)?;
        let prices = items.iter().map(|item| (item.item_id, item.price)).collect();
        Ok(Self { items, prices, tree })
    }

    /// Build from parallel id and price slices of equal length.
    pub fn from_parallel(item_ids: &[U256], prices: &[U256]) -> Result<Self, CatalogError> {
        if item_ids.len() != prices.len() {
            return Err(MerkleError::LengthMismatch { ids: item_ids.len(), prices: prices.len() }
                .into());
        }
        let items = item_ids
            .iter()
            .zip(prices)
            .map(|(item_id, price)| CatalogItem::new(*item_id, *price))
            .collect();
        Self::new(items)
    }

    /// Parse a JSON catalog document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.items)
    }

    /// Load a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let catalog = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            target: "catalog",
            ?path,
            items = catalog.len(),
            root = %catalog.root(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Root committing to every entry
    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    /// Entries in the order they were supplied
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Underlying tree
    pub const fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false: empty catalogs are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Listed price of an item
    pub fn price_of(&self, item_id: &U256) -> Option<U256> {
        self.prices.get(item_id).copied()
    }

    /// Generate a multiproof for explicit `(item_id, price)` claims.
    pub fn prove(&self, claimed: &[CatalogItem]) -> Result<MultiProof, CatalogError> {
        let pairs: Vec<_> = claimed.iter().map(CatalogItem::pair).collect();
        Ok(self.tree.multi_proof(&pairs)?)
    }

    /// Look up the listed prices of `item_ids` and prove them.
    pub fn prove_ids(
        &self,
        item_ids: &[U256],
    ) -> Result<(Vec<CatalogItem>, MultiProof), CatalogError> {
        let claimed = item_ids
            .iter()
            .map(|item_id| {
                self.price_of(item_id)
                    .map(|price| CatalogItem::new(*item_id, price))
                    .ok_or(CatalogError::UnknownItem { item_id: *item_id })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let proof = self.prove(&claimed)?;
        Ok((claimed, proof))
    }

    /// Serialize back to the on-disk layout.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let file = CatalogFile { items: self.items.clone() };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}
