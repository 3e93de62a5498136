//! Multiproof generation

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MerkleError;
use crate::hasher::encode_leaf;
use crate::tree::MerkleTree;

/// Proof that a set of leaves belongs to one root.
///
/// `proof_flags[i]` tells the verifier whether step `i` combines two already
/// known nodes (`true`) or one known node with the next entry of `proof`
/// (`false`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiProof {
    /// Sibling hashes, in the order the verifier consumes them
    pub proof: Vec<B256>,
    /// One flag per combination step
    pub proof_flags: Vec<bool>,
}

impl MultiProof {
    /// Create a proof from its raw parts
    pub const fn new(proof: Vec<B256>, proof_flags: Vec<bool>) -> Self {
        Self { proof, proof_flags }
    }

    /// Number of hashes a verifier performs for this proof.
    pub fn steps(&self) -> usize {
        self.proof_flags.len()
    }
}

impl MerkleTree {
    /// Generate a multiproof for `claimed`, given in any order.
    ///
    /// Repeated pairs are proven once. Every pair must be a leaf of this tree.
    pub fn multi_proof(&self, claimed: &[(U256, U256)]) -> Result<MultiProof, MerkleError> {
        if claimed.is_empty() {
            return Err(MerkleError::EmptyClaim);
        }

        let mut indices = Vec::with_capacity(claimed.len());
        for &(item_id, price) in claimed {
            let index = self
                .position(&encode_leaf(item_id, price))
                .ok_or(MerkleError::NonMemberClaim { item_id, price })?;
            indices.push(index);
        }
        indices.sort_unstable();
        indices.dedup();
        let claimed_leaves = indices.len();

        let mut proof = Vec::new();
        let mut proof_flags = Vec::new();

        // Walk every layer below the root. `indices` stays sorted, which is the
        // order the verifier's queue yields known nodes in.
        for layer in &self.layers()[..self.depth()] {
            let mut parents = Vec::with_capacity(indices.len());
            let mut i = 0;
            while i < indices.len() {
                let index = indices[i];
                let sibling = index ^ 1;
                if indices.get(i + 1) == Some(&sibling) {
                    proof_flags.push(true);
                    i += 2;
                } else {
                    proof_flags.push(false);
                    proof.push(layer[sibling]);
                    i += 1;
                }
                parents.push(index / 2);
            }
            indices = parents;
        }

        debug!(
            target: "merkle",
            claimed = claimed_leaves,
            proof = proof.len(),
            flags = proof_flags.len(),
            "Generated multiproof"
        );
        Ok(MultiProof { proof, proof_flags })
    }
}
