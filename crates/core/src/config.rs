//! Configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use storefront_merkle::{VerifierLimits, DEFAULT_MAX_DEPTH};
use tracing::warn;

/// Default JSON-RPC listen address
pub const DEFAULT_RPC_ADDR: &str = "0.0.0.0:8547";

/// Storefront configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// JSON-RPC listen address
    pub rpc_addr: String,
    /// Address allowed to replace the catalog root
    pub owner: Address,
    /// Catalog committed at start-up, if any
    pub catalog_path: Option<PathBuf>,
    /// Deepest catalog tree accepted in proofs
    pub max_depth: usize,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            rpc_addr: DEFAULT_RPC_ADDR.to_string(),
            owner: Address::ZERO,
            catalog_path: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl StorefrontConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key/value source; malformed values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            rpc_addr: lookup("STOREFRONT_RPC_ADDR").unwrap_or(defaults.rpc_addr),
            owner: parse_or("STOREFRONT_OWNER", lookup("STOREFRONT_OWNER"), defaults.owner),
            catalog_path: lookup("STOREFRONT_CATALOG").map(PathBuf::from),
            max_depth: parse_or("STOREFRONT_MAX_DEPTH", lookup("STOREFRONT_MAX_DEPTH"), defaults.max_depth),
        }
    }

    /// Verifier limits derived from `max_depth`
    pub const fn limits(&self) -> VerifierLimits {
        VerifierLimits::new(self.max_depth)
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(target: "config", key, value = %raw, "Ignoring malformed setting");
            default
        }),
        None => default,
    }
}
