//! Storefront core logic
//!
//! This crate contains the catalog and purchase rules shared between:
//! - The storefront node (JSON-RPC service)
//! - The off-line `catalog` proof tool

pub mod catalog;
pub mod config;
pub mod purchase;
pub mod registry;
pub mod storefront;
pub mod types;

pub use catalog::{Catalog, CatalogError, CatalogFile};
pub use config::StorefrontConfig;
pub use purchase::{authorize, Authorization, PurchaseRequest, Rejection};
pub use registry::{Commitment, RegistryError, RootRegistry};
pub use storefront::{Receipt, Storefront};
pub use types::*;

pub use alloy_primitives::U256;
pub use storefront_merkle::{MultiProof, VerifierLimits, VerifyError};
