//! Purchase authorization
//!
//! A purchase is authorized when its `(item_id, price)` pairs verify against
//! the committed root and the payment equals `sum(price * amount)` exactly.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use storefront_merkle::{verify_detailed, MultiProof, VerifierLimits, VerifyError};
use thiserror::Error;

use crate::types::PurchaseItem;

/// Why a purchase was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Parallel id/price/amount sequences disagree in length.
    #[error("length mismatch: {ids} ids, {prices} prices, {amounts} amounts")]
    LengthMismatch {
        /// Item ids supplied
        ids: usize,
        /// Prices supplied
        prices: usize,
        /// Amounts supplied
        amounts: usize,
    },
    /// Nothing to buy.
    #[error("empty purchase request")]
    EmptyRequest,
    /// Item id 0 is never for sale.
    #[error("item id 0 is reserved")]
    ReservedItemId,
    /// No catalog root has been committed.
    #[error("no catalog committed")]
    NoCatalog,
    /// The claimed items do not verify against the committed root.
    #[error("invalid proof: {0}")]
    InvalidProof(#[from] VerifyError),
    /// Payment differs from the total owed.
    #[error("invalid amount: expected {expected}, paid {paid}")]
    InvalidAmount {
        /// Total owed
        expected: U256,
        /// Amount paid
        paid: U256,
    },
    /// `sum(price * amount)` does not fit in 256 bits.
    #[error("purchase total overflows")]
    AmountOverflow,
}

impl Rejection {
    /// Stable short code for logs and RPC responses
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::EmptyRequest => "empty_request",
            Self::ReservedItemId => "reserved_item_id",
            Self::NoCatalog => "no_catalog",
            Self::InvalidProof(VerifyError::MalformedProofShape(_)) => "malformed_proof_shape",
            Self::InvalidProof(VerifyError::RootMismatch { .. }) => "invalid_proof",
            Self::InvalidAmount { .. } | Self::AmountOverflow => "invalid_amount",
        }
    }
}

/// A checked batch of purchase lines
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseRequest {
    items: Vec<PurchaseItem>,
}

impl PurchaseRequest {
    /// Create a request; rejects empty batches and the reserved id.
    pub fn new(items: Vec<PurchaseItem>) -> Result<Self, Rejection> {
        if items.is_empty() {
            return Err(Rejection::EmptyRequest);
        }
        if items.iter().any(|item| item.item_id.is_zero()) {
            return Err(Rejection::ReservedItemId);
        }
        Ok(Self { items })
    }

    /// Create a request from the three parallel sequences of the wire format.
    pub fn from_parallel(
        item_ids: &[U256],
        prices: &[U256],
        amounts: &[U256],
    ) -> Result<Self, Rejection> {
        if item_ids.len() != prices.len() || item_ids.len() != amounts.len() {
            return Err(Rejection::LengthMismatch {
                ids: item_ids.len(),
                prices: prices.len(),
                amounts: amounts.len(),
            });
        }
        let items = item_ids
            .iter()
            .zip(prices)
            .zip(amounts)
            .map(|((item_id, price), amount)| PurchaseItem::new(*item_id, *price, *amount))
            .collect();
        Self::new(items)
    }

    /// Purchase lines as supplied
    pub fn items(&self) -> &[PurchaseItem] {
        &self.items
    }

    /// Distinct `(item_id, price)` pairs to prove, sorted.
    pub fn claimed_pairs(&self) -> Vec<(U256, U256)> {
        let mut pairs: Vec<_> = self.items.iter().map(PurchaseItem::pair).collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    /// `sum(price * amount)` over every line, overflow-checked.
    pub fn total(&self) -> Result<U256, Rejection> {
        self.items.iter().try_fold(U256::ZERO, |total, item| {
            item.price
                .checked_mul(item.amount)
                .and_then(|line| total.checked_add(line))
                .ok_or(Rejection::AmountOverflow)
        })
    }
}

/// A purchase the caller may now settle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Root the items were proven against
    pub root: B256,
    /// Amount owed and paid
    #[serde(with = "crate::types::wire_u256")]
    pub total: U256,
    /// Authorized lines
    pub items: Vec<PurchaseItem>,
}

/// Decide whether `request` may be settled for `paid` against `root`.
///
/// Pure: the proof is checked first, then the payment.
pub fn authorize(
    root: &B256,
    request: &PurchaseRequest,
    proof: &MultiProof,
    paid: U256,
    limits: &VerifierLimits,
) -> Result<Authorization, Rejection> {
    verify_detailed(root, &request.claimed_pairs(), proof, limits)?;

    let total = request.total()?;
    if total != paid {
        return Err(Rejection::InvalidAmount { expected: total, paid });
    }

    Ok(Authorization { root: *root, total, items: request.items.clone() })
}
