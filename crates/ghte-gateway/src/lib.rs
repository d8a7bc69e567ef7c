//! ghte-gateway — the external interfaces (§6) for the Guided Hierarchical
//! Traversal Engine: an HTTP surface for starting a traversal and for
//! fetching/clearing the single-slot latest result. Stands in for the
//! out-of-scope screening-questionnaire UI and export/report generators at
//! their boundary only — their internals are never implemented here.

pub mod server;

pub use server::{serve, AppState, GatewayError};
