//! ghte-core — error taxonomy, data model, and configuration for the
//! Guided Hierarchical Traversal Engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BindMode, EngineConfig, GatewayConfig};
pub use error::{Error, OracleFailureKind, Result};
pub use types::*;
