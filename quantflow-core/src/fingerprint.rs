//! Deterministic strategy fingerprints.
//!
//! A fingerprint is a BLAKE3 hash over the canonical JSON of
//! (graph, parameter overrides). It identifies a compiled strategy for
//! result caching and reproducibility audits: same inputs, same hash, on any
//! platform.

use crate::domain::{Parameters, StrategyGraph};

/// Computes the BLAKE3 hex digest of (graph, parameters).
///
/// Parameters are a `BTreeMap`, so key order — and therefore the hash — is
/// deterministic.
pub fn strategy_fingerprint(graph: &StrategyGraph, parameters: &Parameters) -> String {
    let canonical = serde_json::json!({
        "graph": graph,
        "parameters": parameters,
    });
    let bytes = serde_json::to_vec(&canonical).expect("graph serialization cannot fail");
    blake3::hash(&bytes).to_hex().to_string()
}
