//! Committed catalog root
//!
//! The root is the only shared mutable state. It has one writer (the catalog
//! owner) and any number of readers. A replacement swaps the whole
//! [`Commitment`] under the write lock, so a reader always sees either the old
//! root or the new one.

use std::sync::{PoisonError, RwLock};

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Root plus a counter bumped on every replacement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Current catalog root
    pub root: B256,
    /// Starts at 1 for the first committed root
    pub version: u64,
}

/// Root update failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Only the owner may replace the root.
    #[error("{caller} is not the catalog owner")]
    NotOwner {
        /// Rejected caller
        caller: Address,
    },
    /// The zero hash commits to nothing.
    #[error("refusing to commit the zero root")]
    EmptyRoot,
}

/// Single-writer slot holding the committed root
#[derive(Debug)]
pub struct RootRegistry {
    owner: Address,
    current: RwLock<Option<Commitment>>,
}

impl RootRegistry {
    /// Create a registry with no catalog committed yet
    pub const fn new(owner: Address) -> Self {
        Self { owner, current: RwLock::new(None) }
    }

    /// Create a registry with an initial root
    pub fn with_root(owner: Address, root: B256) -> Result<Self, RegistryError> {
        let registry = Self::new(owner);
        registry.replace_root(owner, root)?;
        Ok(registry)
    }

    /// Address allowed to replace the root
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Snapshot of the current commitment, if any.
    pub fn current(&self) -> Option<Commitment> {
        // The slot is only ever assigned whole; a poisoned lock still holds a
        // consistent value.
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the committed root wholesale.
    pub fn replace_root(&self, caller: Address, root: B256) -> Result<Commitment, RegistryError> {
        if caller != self.owner {
            warn!(target: "registry", %caller, "Rejected root update from non-owner");
            return Err(RegistryError::NotOwner { caller });
        }
        if root.is_zero() {
            return Err(RegistryError::EmptyRoot);
        }

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let version = slot.map_or(1, |c| c.version + 1);
        let commitment = Commitment { root, version };
        *slot = Some(commitment);
        drop(slot);

        info!(target: "registry", %root, version, "Catalog root replaced");
        Ok(commitment)
    }
}
