//! Multiproof verification
//!
//! Proofs and flags are attacker-controlled. Their shape is checked against
//! the claimed leaves and the configured depth bound before any hashing, and
//! the walk itself uses explicit cursors so a malformed flag sequence can only
//! end in an error, never in a panic or unbounded work.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::hasher::{encode_leaf, Keccak256Hasher};
use crate::proof::MultiProof;

/// Default bound on tree depth accepted by verifiers (2^32 items).
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Size bounds for untrusted proofs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierLimits {
    /// Deepest catalog tree a proof may describe
    pub max_depth: usize,
}

impl VerifierLimits {
    /// Limits for catalogs up to `max_depth` levels deep
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Largest number of distinct leaves a proof may claim.
    pub fn max_leaves(&self) -> usize {
        u32::try_from(self.max_depth)
            .ok()
            .and_then(|depth| 1usize.checked_shl(depth))
            .unwrap_or(usize::MAX)
    }

    /// Longest `proof` or `proof_flags` accepted for `leaves` claimed leaves.
    pub const fn max_steps(&self, leaves: usize) -> usize {
        leaves.saturating_mul(self.max_depth)
    }
}

impl Default for VerifierLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

/// Structural problems found in a proof, before or during the walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// Nothing was claimed.
    #[error("no leaves claimed")]
    NoLeaves,
    /// A claimed pair uses the reserved item id.
    #[error("claimed item id 0 is reserved")]
    ReservedItemId,
    /// More leaves than a tree of the configured depth can hold.
    #[error("{leaves} leaves claimed, at most {max} allowed")]
    TooManyLeaves {
        /// Distinct leaves claimed
        leaves: usize,
        /// Configured bound
        max: usize,
    },
    /// Proof or flags longer than the configured depth allows.
    #[error("proof of {proof} hashes and {flags} flags exceeds bound {max}")]
    TooLong {
        /// Supplied sibling hashes
        proof: usize,
        /// Supplied flags
        flags: usize,
        /// Configured bound
        max: usize,
    },
    /// Flags do not match `leaves + proof - 1`.
    #[error("expected {expected} proof flags, got {flags}")]
    FlagCountMismatch {
        /// Supplied flags
        flags: usize,
        /// Required flags
        expected: usize,
    },
    /// The known-node queue ran dry.
    #[error("no known node left at step {step}")]
    QueueUnderflow {
        /// Failing step
        step: usize,
    },
    /// The sibling list ran dry.
    #[error("proof exhausted at step {step}")]
    ProofExhausted {
        /// Failing step
        step: usize,
    },
    /// Sibling hashes left over after the walk.
    #[error("{unused} proof hashes left unused")]
    UnusedProof {
        /// Leftover entries
        unused: usize,
    },
}

/// Why a proof did not verify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The proof is structurally invalid.
    #[error("malformed proof: {0}")]
    MalformedProofShape(#[from] ShapeError),
    /// The walk completed but produced a different root.
    #[error("recomputed root {computed} does not match committed root {expected}")]
    RootMismatch {
        /// Root recomputed from the proof
        computed: B256,
        /// Root the caller committed to
        expected: B256,
    },
}

/// Verify `claimed` against `root` with the default limits.
pub fn verify(root: &B256, claimed: &[(U256, U256)], proof: &MultiProof) -> bool {
    verify_with_limits(root, claimed, proof, &VerifierLimits::default())
}

/// Verify `claimed` against `root`, returning `false` on any failure.
pub fn verify_with_limits(
    root: &B256,
    claimed: &[(U256, U256)],
    proof: &MultiProof,
    limits: &VerifierLimits,
) -> bool {
    match verify_detailed(root, claimed, proof, limits) {
        Ok(()) => true,
        Err(e) => {
            debug!(target: "merkle", error = %e, "Multiproof rejected");
            false
        }
    }
}

/// Verify `claimed` against `root`, keeping the rejection reason.
pub fn verify_detailed(
    root: &B256,
    claimed: &[(U256, U256)],
    proof: &MultiProof,
    limits: &VerifierLimits,
) -> Result<(), VerifyError> {
    let leaves = claimed_leaves(claimed, limits)?;
    let computed = process_multi_proof(&leaves, &proof.proof, &proof.proof_flags, limits)?;
    if computed == *root {
        Ok(())
    } else {
        Err(VerifyError::RootMismatch { computed, expected: *root })
    }
}

/// Encode, sort and de-duplicate claimed pairs into the walk's leaf order.
fn claimed_leaves(
    claimed: &[(U256, U256)],
    limits: &VerifierLimits,
) -> Result<Vec<B256>, ShapeError> {
    if claimed.is_empty() {
        return Err(ShapeError::NoLeaves);
    }
    let max = limits.max_leaves();
    if claimed.len() > max {
        return Err(ShapeError::TooManyLeaves { leaves: claimed.len(), max });
    }
    if claimed.iter().any(|(item_id, _)| item_id.is_zero()) {
        return Err(ShapeError::ReservedItemId);
    }

    let mut leaves: Vec<B256> =
        claimed.iter().map(|(item_id, price)| encode_leaf(*item_id, *price)).collect();
    leaves.sort_unstable();
    leaves.dedup();
    Ok(leaves)
}

/// Replay the queue walk over sorted `leaves` and return the candidate root.
pub fn process_multi_proof(
    leaves: &[B256],
    proof: &[B256],
    proof_flags: &[bool],
    limits: &VerifierLimits,
) -> Result<B256, ShapeError> {
    if leaves.is_empty() {
        return Err(ShapeError::NoLeaves);
    }
    let max = limits.max_steps(leaves.len());
    if proof.len() > max || proof_flags.len() > max {
        return Err(ShapeError::TooLong { proof: proof.len(), flags: proof_flags.len(), max });
    }
    // Every step consumes two inputs and yields one node; exactly one remains.
    let expected = leaves.len() + proof.len() - 1;
    if proof_flags.len() != expected || expected == 0 {
        return Err(ShapeError::FlagCountMismatch { flags: proof_flags.len(), expected });
    }

    let mut queue = KnownQueue::new(leaves, proof_flags.len());
    let mut proof_pos = 0usize;

    for (step, &flag) in proof_flags.iter().enumerate() {
        let a = queue.pop().ok_or(ShapeError::QueueUnderflow { step })?;
        let b = if flag {
            queue.pop().ok_or(ShapeError::QueueUnderflow { step })?
        } else {
            let sibling = proof.get(proof_pos).ok_or(ShapeError::ProofExhausted { step })?;
            proof_pos += 1;
            *sibling
        };
        queue.push(Keccak256Hasher::hash_pair(&a, &b));
    }

    if proof_pos != proof.len() {
        return Err(ShapeError::UnusedProof { unused: proof.len() - proof_pos });
    }
    queue.last().ok_or(ShapeError::QueueUnderflow { step: proof_flags.len() })
}

/// FIFO over the claimed leaves followed by every computed parent.
struct KnownQueue<'a> {
    leaves: &'a [B256],
    leaf_pos: usize,
    hashes: Vec<B256>,
    hash_pos: usize,
}

impl<'a> KnownQueue<'a> {
    fn new(leaves: &'a [B256], steps: usize) -> Self {
        Self { leaves, leaf_pos: 0, hashes: Vec::with_capacity(steps), hash_pos: 0 }
    }

    fn pop(&mut self) -> Option<B256> {
        if let Some(leaf) = self.leaves.get(self.leaf_pos) {
            self.leaf_pos += 1;
            return Some(*leaf);
        }
        let hash = self.hashes.get(self.hash_pos)?;
        self.hash_pos += 1;
        Some(*hash)
    }

    fn push(&mut self, hash: B256) {
        self.hashes.push(hash);
    }

    fn last(&self) -> Option<B256> {
        self.hashes.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MerkleTree;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn items(n: u64) -> Vec<(U256, U256)> {
        (1..=n).map(|i| (U256::from(i), U256::from(i * 7 + 3))).collect()
    }

    fn setup(n: u64, picks: &[usize]) -> (MerkleTree, Vec<(U256, U256)>, MultiProof) {
        let catalog = items(n);
        let tree = MerkleTree::build(&catalog).unwrap();
        let claimed: Vec<_> = picks.iter().map(|&i| catalog[i]).collect();
        let proof = tree.multi_proof(&claimed).unwrap();
        (tree, claimed, proof)
    }

    #[test]
    fn test_round_trip_random_subsets() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=40u64 {
            let catalog = items(n);
            let tree = MerkleTree::build(&catalog).unwrap();
            for _ in 0..8 {
                let k = rng.gen_range(1..=catalog.len());
                let claimed: Vec<_> = catalog.choose_multiple(&mut rng, k).copied().collect();
                let proof = tree.multi_proof(&claimed).unwrap();
                assert!(verify(&tree.root(), &claimed, &proof), "n={n} k={k}");
            }
        }
    }

    #[test]
    fn test_claim_order_is_irrelevant_to_verifier() {
        let (tree, mut claimed, proof) = setup(9, &[1, 4, 8]);
        claimed.reverse();
        assert!(verify(&tree.root(), &claimed, &proof));
    }

    #[test]
    fn test_tampered_price_fails() {
        let (tree, mut claimed, proof) = setup(10, &[2, 5]);
        claimed[0].1 += U256::from(1u64);
        assert!(!verify(&tree.root(), &claimed, &proof));
    }

    #[test]
    fn test_tampered_item_id_fails() {
        let (tree, mut claimed, proof) = setup(10, &[2, 5]);
        claimed[1].0 = U256::from(99u64);
        assert!(!verify(&tree.root(), &claimed, &proof));
    }

    #[test]
    fn test_every_proof_byte_matters() {
        let (tree, claimed, proof) = setup(12, &[0, 6]);
        for i in 0..proof.proof.len() {
            for byte in [0usize, 17, 31] {
                let mut tampered = proof.clone();
                tampered.proof[i].0[byte] ^= 0x01;
                assert!(!verify(&tree.root(), &claimed, &tampered));
            }
        }
    }

    #[test]
    fn test_every_flag_matters() {
        let (tree, claimed, proof) = setup(16, &[0, 1, 5, 9, 14]);
        for i in 0..proof.proof_flags.len() {
            let mut tampered = proof.clone();
            tampered.proof_flags[i] = !tampered.proof_flags[i];
            assert!(!verify(&tree.root(), &claimed, &tampered), "flag {i}");
        }
    }

    #[test]
    fn test_wrong_root_fails() {
        let (tree, claimed, proof) = setup(8, &[3]);
        let other: Vec<_> = items(8).into_iter().map(|(id, p)| (id, p + U256::from(1u64))).collect();
        let other_root = MerkleTree::build(&other).unwrap().root();
        assert_ne!(other_root, tree.root());
        assert!(!verify(&other_root, &claimed, &proof));
    }

    #[test]
    fn test_truncated_proof_fails_with_shape_error() {
        let (tree, claimed, mut proof) = setup(8, &[3]);
        proof.proof.pop();
        let err = verify_detailed(&tree.root(), &claimed, &proof, &VerifierLimits::default());
        assert!(matches!(err, Err(VerifyError::MalformedProofShape(ShapeError::FlagCountMismatch { .. }))));
    }

    #[test]
    fn test_padded_proof_fails_with_shape_error() {
        let (tree, claimed, mut proof) = setup(8, &[3]);
        proof.proof.push(B256::repeat_byte(9));
        let err = verify_detailed(&tree.root(), &claimed, &proof, &VerifierLimits::default());
        assert!(matches!(err, Err(VerifyError::MalformedProofShape(ShapeError::FlagCountMismatch { .. }))));
    }

    #[test]
    fn test_padded_proof_and_flags_fails() {
        let (tree, claimed, mut proof) = setup(8, &[3]);
        proof.proof.push(B256::repeat_byte(9));
        proof.proof_flags.push(false);
        assert!(!verify(&tree.root(), &claimed, &proof));
    }

    #[test]
    fn test_all_true_flags_underflow() {
        let leaves = vec![B256::repeat_byte(1)];
        let proof = vec![B256::repeat_byte(2), B256::repeat_byte(3)];
        let flags = vec![true, true];
        assert_eq!(
            process_multi_proof(&leaves, &proof, &flags, &VerifierLimits::default()),
            Err(ShapeError::QueueUnderflow { step: 0 })
        );
    }

    #[test]
    fn test_all_false_flags_leave_proof_unused() {
        let leaves = vec![B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(3)];
        let proof = vec![B256::repeat_byte(4)];
        let flags = vec![false, false, false];
        assert_eq!(
            process_multi_proof(&leaves, &proof, &flags, &VerifierLimits::default()),
            Err(ShapeError::ProofExhausted { step: 1 })
        );
    }

    #[test]
    fn test_empty_flags_rejected() {
        let leaves = vec![B256::repeat_byte(1)];
        assert_eq!(
            process_multi_proof(&leaves, &[], &[], &VerifierLimits::default()),
            Err(ShapeError::FlagCountMismatch { flags: 0, expected: 0 })
        );
    }

    #[test]
    fn test_empty_claim_rejected() {
        let (tree, _, proof) = setup(4, &[0]);
        let err = verify_detailed(&tree.root(), &[], &proof, &VerifierLimits::default());
        assert_eq!(err, Err(VerifyError::MalformedProofShape(ShapeError::NoLeaves)));
    }

    #[test]
    fn test_fill_leaf_claim_rejected() {
        // The fill leaf sits in the tree of any odd catalog.
        let catalog = items(3);
        let tree = MerkleTree::build(&catalog).unwrap();
        let proof = tree.multi_proof(&catalog).unwrap();
        let mut claimed = catalog.clone();
        claimed.push((U256::ZERO, U256::ZERO));
        let err = verify_detailed(&tree.root(), &claimed, &proof, &VerifierLimits::default());
        assert_eq!(err, Err(VerifyError::MalformedProofShape(ShapeError::ReservedItemId)));
    }

    #[test]
    fn test_oversized_proof_rejected_before_hashing() {
        let leaves = vec![B256::repeat_byte(1)];
        let limits = VerifierLimits::new(4);
        let proof = vec![B256::repeat_byte(2); 5];
        let flags = vec![false; 5];
        assert_eq!(
            process_multi_proof(&leaves, &proof, &flags, &limits),
            Err(ShapeError::TooLong { proof: 5, flags: 5, max: 4 })
        );
    }

    #[test]
    fn test_deep_tree_rejected_by_tight_limits() {
        let (tree, claimed, proof) = setup(64, &[10]);
        assert_eq!(tree.depth(), 6);
        assert!(verify_with_limits(&tree.root(), &claimed, &proof, &VerifierLimits::new(6)));
        assert!(!verify_with_limits(&tree.root(), &claimed, &proof, &VerifierLimits::new(5)));
    }

    #[test]
    fn test_too_many_leaves_rejected() {
        let claimed = items(5);
        let err = verify_detailed(&B256::ZERO, &claimed, &MultiProof::default(), &VerifierLimits::new(2));
        assert_eq!(err, Err(VerifyError::MalformedProofShape(ShapeError::TooManyLeaves { leaves: 5, max: 4 })));
    }

    #[test]
    fn test_proof_size_grows_logarithmically() {
        let mut sizes = Vec::new();
        for n in [16u64, 256, 4096] {
            let catalog = items(n);
            let tree = MerkleTree::build(&catalog).unwrap();
            let claimed = [catalog[1], catalog[(n / 2) as usize]];
            let proof = tree.multi_proof(&claimed).unwrap();
            assert!(verify(&tree.root(), &claimed, &proof));
            sizes.push(proof.proof.len() + proof.proof_flags.len());
        }
        // Two claims, depth 4 / 8 / 12: at most 2 * depth siblings and flags each.
        assert!(sizes[0] <= 16);
        assert!(sizes[1] <= 32);
        assert!(sizes[2] <= 48);
    }

    #[test]
    fn test_verification_is_repeatable() {
        let (tree, claimed, proof) = setup(7, &[0, 6]);
        let first = verify(&tree.root(), &claimed, &proof);
        let second = verify(&tree.root(), &claimed, &proof);
        assert!(first && second);
    }

    #[test]
    fn test_max_leaves_saturates() {
        assert_eq!(VerifierLimits::new(3).max_leaves(), 8);
        assert_eq!(VerifierLimits::new(200).max_leaves(), usize::MAX);
    }
}
