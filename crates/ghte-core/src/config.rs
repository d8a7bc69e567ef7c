//! Engine configuration — single source of the traversal's tunable knobs.
//!
//! An all-optional, `#[serde(default)]` struct so a partial JSON/YAML file
//! overlays cleanly onto the defaults below.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Strict depth bound on traversal. Root is depth 0.
    pub max_depth: u32,
    /// Relevance threshold T; inclusion requires score strictly greater than T.
    pub relevance_threshold: f64,
    /// Oracle calls are chunked to at most this many nodes per batch.
    pub max_batch_size: usize,
    /// Mandatory pause between chunks within a batch, milliseconds.
    pub chunk_delay_ms: u64,
    /// Model identifier passed to the oracle provider.
    pub oracle_model: String,
    /// Per-oracle-call timeout, milliseconds.
    pub oracle_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            relevance_threshold: 0.3,
            max_batch_size: 5,
            chunk_delay_ms: 1000,
            oracle_model: default_oracle_model(),
            oracle_timeout_ms: 30_000,
        }
    }
}

fn default_oracle_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

/// HTTP surface configuration for `ghte-gateway`. Kept separate from
/// `EngineConfig` since it governs transport, not traversal semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub bind: BindMode,
    /// If set, requests must carry `Authorization: Bearer <token>`.
    pub auth_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: 8787, bind: BindMode::default(), auth_token: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Loopback,
    #[default]
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }
}
