//! Catalog tool
//!
//! Off-line root and proof generation for client tooling. Everything it
//! prints is untrusted input as far as the storefront is concerned.
//!
//! Usage:
//!   catalog root <catalog.json>
//!   catalog prove <catalog.json> <item-id>...
//!   catalog verify <root> <proof.json>

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use storefront_core::{parse_u256, Catalog, CatalogItem, MultiProof, B256, U256};
use storefront_core::{RootRegistry, Storefront, StorefrontConfig};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage:
  catalog root <catalog.json>
  catalog prove <catalog.json> <item-id>...
  catalog verify <root> <proof.json>";

/// Output of `catalog prove`, accepted back by `catalog verify`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofBundle {
    root: B256,
    items: Vec<CatalogItem>,
    #[serde(flatten)]
    proof: MultiProof,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args: Vec<String> = env::args().skip(1).collect();
    let output = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(args: &[String]) -> Result<serde_json::Value> {
    match args {
        [cmd, path] if cmd == "root" => {
            let catalog = Catalog::load(path)?;
            Ok(serde_json::json!({
                "root": catalog.root(),
                "items": catalog.len(),
                "depth": catalog.tree().depth(),
            }))
        }
        [cmd, path, ids @ ..] if cmd == "prove" && !ids.is_empty() => {
            let catalog = Catalog::load(path)?;
            let item_ids = ids
                .iter()
                .map(|id| parse_u256(id).with_context(|| format!("item id {id:?}")))
                .collect::<Result<Vec<U256>>>()?;
            let (items, proof) = catalog.prove_ids(&item_ids)?;
            debug!(claimed = items.len(), proof = proof.proof.len(), "Proof generated");
            Ok(serde_json::to_value(ProofBundle { root: catalog.root(), items, proof })?)
        }
        [cmd, root, path] if cmd == "verify" => {
            let root: B256 = root.parse().map_err(|e| anyhow!("root {root:?}: {e}"))?;
            let bundle: ProofBundle = serde_json::from_str(
                &fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
            )
            .with_context(|| format!("parsing {path}"))?;
            verify_bundle(root, &bundle)
        }
        _ => bail!(USAGE),
    }
}

/// Check a bundle the same way the storefront does, against an explicit root.
fn verify_bundle(root: B256, bundle: &ProofBundle) -> Result<serde_json::Value> {
    let config = StorefrontConfig::default();
    let registry = RootRegistry::with_root(config.owner, root)?;
    let storefront = Storefront::new(registry, config.limits());
    Ok(match storefront.verify(&bundle.items, &bundle.proof) {
        Ok(_) => serde_json::json!({"valid": true}),
        Err(rejection) => serde_json::json!({
            "valid": false,
            "code": rejection.code(),
            "error": rejection.to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_catalog() -> String {
        let path = env::temp_dir().join(format!("catalog-cli-{}.json", std::process::id()));
        let json = serde_json::json!({"items": [
            {"itemId": 1, "price": 100},
            {"itemId": 2, "price": 200},
            {"itemId": 3, "price": 300},
        ]});
        fs::write(&path, json.to_string()).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prove_then_verify() {
        let path = write_catalog();
        let root = run(&args(&["root", &path])).unwrap();
        let bundle = run(&args(&["prove", &path, "3", "0x1"])).unwrap();
        assert_eq!(root["root"], bundle["root"]);
        assert_eq!(root["items"], 3);

        let parsed: ProofBundle = serde_json::from_value(bundle).unwrap();
        let result = verify_bundle(parsed.root, &parsed).unwrap();
        assert_eq!(result["valid"], true);

        let result = verify_bundle(B256::repeat_byte(1), &parsed).unwrap();
        assert_eq!(result["valid"], false);
        assert_eq!(result["code"], "invalid_proof");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_usage_errors() {
        assert!(run(&args(&[])).is_err());
        assert!(run(&args(&["prove", "catalog.json"])).is_err());
        assert!(run(&args(&["verify", "not-a-root", "proof.json"])).is_err());
    }
}
