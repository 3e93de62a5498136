//! Storefront facade: the committed root plus verifier limits.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use storefront_merkle::{verify_detailed, MultiProof, VerifierLimits};
use tracing::{info, warn};

use crate::purchase::{authorize, Authorization, PurchaseRequest, Rejection};
use crate::registry::{Commitment, RegistryError, RootRegistry};
use crate::types::CatalogItem;

/// Authorization tagged with the root version it was checked against
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Version of the committed root
    pub version: u64,
    /// The authorized purchase
    #[serde(flatten)]
    pub authorization: Authorization,
}

/// Storefront state shared by every request
#[derive(Debug)]
pub struct Storefront {
    registry: RootRegistry,
    limits: VerifierLimits,
}

impl Storefront {
    /// Create a storefront over `registry`
    pub const fn new(registry: RootRegistry, limits: VerifierLimits) -> Self {
        Self { registry, limits }
    }

    /// Root registry
    pub const fn registry(&self) -> &RootRegistry {
        &self.registry
    }

    /// Proof size bounds
    pub const fn limits(&self) -> &VerifierLimits {
        &self.limits
    }

    /// Current commitment
    pub fn commitment(&self) -> Option<Commitment> {
        self.registry.current()
    }

    /// Replace the catalog root; only the owner may do this.
    pub fn set_root(&self, caller: Address, root: B256) -> Result<Commitment, RegistryError> {
        self.registry.replace_root(caller, root)
    }

    /// Check catalog membership of `claimed` against the committed root.
    pub fn verify(&self, claimed: &[CatalogItem], proof: &MultiProof) -> Result<Commitment, Rejection> {
        let commitment = self.registry.current().ok_or(Rejection::NoCatalog)?;
        let pairs: Vec<_> = claimed.iter().map(CatalogItem::pair).collect();
        verify_detailed(&commitment.root, &pairs, proof, &self.limits)?;
        Ok(commitment)
    }

    /// Authorize a purchase against one snapshot of the committed root.
    pub fn purchase(
        &self,
        request: &PurchaseRequest,
        proof: &MultiProof,
        paid: U256,
    ) -> Result<Receipt, Rejection> {
        let commitment = self.registry.current().ok_or(Rejection::NoCatalog)?;

        match authorize(&commitment.root, request, proof, paid, &self.limits) {
            Ok(authorization) => {
                info!(
                    target: "storefront",
                    version = commitment.version,
                    lines = authorization.items.len(),
                    total = %authorization.total,
                    "Purchase authorized"
                );
                Ok(Receipt { version: commitment.version, authorization })
            }
            Err(rejection) => {
                warn!(
                    target: "storefront",
                    version = commitment.version,
                    code = rejection.code(),
                    error = %rejection,
                    "Purchase rejected"
                );
                Err(rejection)
            }
        }
    }
}
