//! Storefront Node
//!
//! A JSON-RPC service that:
//! - Holds the committed catalog root (one owner may replace it)
//! - Generates multiproofs against the catalog it was given
//! - Verifies membership claims and authorizes purchases

use anyhow::{Context, Result};
use axum::{
    extract::State as AxumState,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};
use storefront_core::{
    wire_u256, Address, Catalog, CatalogItem, MultiProof, PurchaseRequest, RootRegistry,
    Storefront, StorefrontConfig, B256, U256,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Shared node state
struct NodeState {
    /// Committed root and purchase rules
    storefront: Storefront,
    /// Full catalog, kept only for proof generation
    catalog: RwLock<Option<Catalog>>,
}

impl NodeState {
    fn new(config: &StorefrontConfig) -> Result<Self> {
        let registry = RootRegistry::new(config.owner);
        let catalog = match &config.catalog_path {
            Some(path) => {
                let catalog = Catalog::load(path)
                    .with_context(|| format!("loading catalog {}", path.display()))?;
                registry.replace_root(config.owner, catalog.root())?;
                Some(catalog)
            }
            None => None,
        };
        Ok(Self {
            storefront: Storefront::new(registry, config.limits()),
            catalog: RwLock::new(catalog),
        })
    }
}

type SharedState = Arc<NodeState>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    info!("Starting storefront node...");

    let config = StorefrontConfig::from_env();
    info!("  Owner: {}", config.owner);
    info!("  Max tree depth: {}", config.max_depth);

    let rpc_addr = config.rpc_addr.clone();
    let state = Arc::new(NodeState::new(&config)?);
    if let Some(commitment) = state.storefront.commitment() {
        info!("  Catalog root: {} (version {})", commitment.root, commitment.version);
    }

    let app = router(state);

    info!("RPC server listening on {}", rpc_addr);
    let listener = tokio::net::TcpListener::bind(&rpc_addr)
        .await
        .with_context(|| format!("binding {rpc_addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/", post(rpc_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health() -> &'static str {
    "ok"
}

/// JSON-RPC request
#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Value,
}

/// JSON-RPC response
#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: String,
    result: Value,
    id: Value,
}

/// Input for store_setRoot
#[derive(Deserialize)]
struct SetRootInput {
    caller: Address,
    root: B256,
}

/// Input for store_setCatalog
#[derive(Deserialize)]
struct SetCatalogInput {
    caller: Address,
    items: Vec<CatalogItem>,
}

/// Input for store_getProof
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofInput {
    #[serde(with = "wire_u256::seq")]
    item_ids: Vec<U256>,
}

/// Input for store_verify
#[derive(Deserialize)]
struct VerifyInput {
    items: Vec<CatalogItem>,
    #[serde(flatten)]
    proof: MultiProof,
}

/// Input for store_purchase: the three parallel sequences plus proof and payment
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseInput {
    #[serde(with = "wire_u256::seq")]
    item_ids: Vec<U256>,
    #[serde(with = "wire_u256::seq")]
    prices: Vec<U256>,
    #[serde(with = "wire_u256::seq")]
    amounts: Vec<U256>,
    #[serde(flatten)]
    proof: MultiProof,
    #[serde(with = "wire_u256")]
    paid_amount: U256,
}

/// RPC handler
async fn rpc_handler(
    AxumState(state): AxumState<SharedState>,
    Json(req): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let result = dispatch(&state, &req.method, req.params);
    Json(RpcResponse { jsonrpc: "2.0".to_string(), result, id: req.id })
}

fn dispatch(state: &NodeState, method: &str, params: Option<Value>) -> Value {
    match method {
        "store_getRoot" => match state.storefront.commitment() {
            Some(commitment) => json!({
                "root": commitment.root,
                "version": commitment.version,
            }),
            None => Value::Null,
        },
        "store_setRoot" => handle_set_root(state, params),
        "store_setCatalog" => handle_set_catalog(state, params),
        "store_getProof" => handle_get_proof(state, params),
        "store_verify" => handle_verify(state, params),
        "store_purchase" => handle_purchase(state, params),
        _ => failure("unknown_method", format!("unknown method {method}")),
    }
}

/// Handle store_setRoot
fn handle_set_root(state: &NodeState, params: Option<Value>) -> Value {
    let input: SetRootInput = match parse_params(params) {
        Ok(input) => input,
        Err(e) => return e,
    };
    match state.storefront.set_root(input.caller, input.root) {
        Ok(commitment) => {
            // The held catalog no longer matches the committed root.
            *state.catalog.write().unwrap_or_else(PoisonError::into_inner) = None;
            json!({"success": true, "root": commitment.root, "version": commitment.version})
        }
        Err(e) => failure("unauthorized", e),
    }
}

/// Handle store_setCatalog: commit a whole new catalog and keep it for proofs
fn handle_set_catalog(state: &NodeState, params: Option<Value>) -> Value {
    let input: SetCatalogInput = match parse_params(params) {
        Ok(input) => input,
        Err(e) => return e,
    };
    let catalog = match Catalog::new(input.items) {
        Ok(catalog) => catalog,
        Err(e) => return failure("invalid_catalog", e),
    };

    let mut slot = state.catalog.write().unwrap_or_else(PoisonError::into_inner);
    match state.storefront.set_root(input.caller, catalog.root()) {
        Ok(commitment) => {
            info!(items = catalog.len(), version = commitment.version, "Catalog replaced");
            *slot = Some(catalog);
            json!({"success": true, "root": commitment.root, "version": commitment.version})
        }
        Err(e) => failure("unauthorized", e),
    }
}

/// Handle store_getProof
fn handle_get_proof(state: &NodeState, params: Option<Value>) -> Value {
    let input: ProofInput = match parse_params(params) {
        Ok(input) => input,
        Err(e) => return e,
    };
    let slot = state.catalog.read().unwrap_or_else(PoisonError::into_inner);
    let Some(catalog) = slot.as_ref() else {
        return failure("no_catalog", "no catalog loaded");
    };
    match catalog.prove_ids(&input.item_ids) {
        Ok((items, proof)) => json!({
            "success": true,
            "root": catalog.root(),
            "items": items,
            "proof": proof.proof,
            "proofFlags": proof.proof_flags,
        }),
        Err(e) => failure("non_member", e),
    }
}

/// Handle store_verify
fn handle_verify(state: &NodeState, params: Option<Value>) -> Value {
    let input: VerifyInput = match parse_params(params) {
        Ok(input) => input,
        Err(e) => return e,
    };
    match state.storefront.verify(&input.items, &input.proof) {
        Ok(commitment) => json!({"success": true, "valid": true, "version": commitment.version}),
        Err(rejection) => json!({
            "success": true,
            "valid": false,
            "code": rejection.code(),
            "error": rejection.to_string(),
        }),
    }
}

/// Handle store_purchase
fn handle_purchase(state: &NodeState, params: Option<Value>) -> Value {
    let input: PurchaseInput = match parse_params(params) {
        Ok(input) => input,
        Err(e) => return e,
    };
    let request = match PurchaseRequest::from_parallel(&input.item_ids, &input.prices, &input.amounts) {
        Ok(request) => request,
        Err(rejection) => return failure(rejection.code(), rejection),
    };
    match state.storefront.purchase(&request, &input.proof, input.paid_amount) {
        Ok(receipt) => json!({"success": true, "receipt": receipt}),
        Err(rejection) => failure(rejection.code(), rejection),
    }
}

/// Take the first positional parameter, or the params object itself.
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, Value> {
    let value = match params {
        Some(Value::Array(mut arr)) if !arr.is_empty() => arr.swap_remove(0),
        Some(value @ Value::Object(_)) => value,
        _ => return Err(failure("invalid_params", "no params")),
    };
    serde_json::from_value(value).map_err(|e| {
        warn!("Rejected malformed params: {}", e);
        failure("invalid_params", e)
    })
}

fn failure(code: &str, error: impl Display) -> Value {
    json!({"success": false, "code": code, "error": error.to_string()})
}
