//! ghte-engine — the Guided Hierarchical Traversal Engine.
//!
//! Ingests a raw legal document into a normalised tree, runs a level-
//! synchronous BFS guided by an LLM oracle, and produces an ordered list of
//! relevant nodes together with a full decision log. See each submodule for
//! the component it implements; [`run`] wires them into one traversal.

pub mod context;
pub mod driver;
pub mod normalizer;
pub mod oracle;
pub mod reconciler;
pub mod report;
pub mod store;
pub mod synthesizer;
pub mod validator;

use ghte_core::{
    EngineConfig, LegalDocumentTree, Result, TraversalContext, TraversalResult,
};
use ghte_llm::provider::LlmProvider;
use oracle::OracleClient;
use std::sync::Arc;
use tracing::info;

/// Normalise and validate a raw document without spending any oracle calls.
/// Used by the CLI's `--dry-run` flag to sanity-check a document's shape.
pub fn dry_run(raw: &serde_json::Value) -> Result<LegalDocumentTree> {
    normalizer::normalize(raw)
}

/// Run one full traversal: normalise, validate, traverse level by level
/// under the oracle's guidance, then synthesise a final recommendation over
/// whatever was found relevant. Oracle and reconciliation failures degrade
/// to fallback decisions per §7 and never abort the run; only malformed or
/// structurally invalid documents do.
pub async fn run(
    raw_document: &serde_json::Value,
    case_info: serde_json::Value,
    config: EngineConfig,
    provider: Arc<dyn LlmProvider>,
) -> Result<TraversalResult> {
    let tree = normalizer::normalize(raw_document)?;
    info!(nodes = tree.len(), roots = tree.root_nodes.len(), "document normalised");

    let oracle = OracleClient::new(provider.clone(), config.clone());
    let mut context = TraversalContext::new(case_info.clone());

    let (relevant_nodes, relevant_count_by_depth) =
        driver::traverse(&tree, &oracle, &config, &mut context).await;

    info!(
        relevant = relevant_nodes.len(),
        decisions = context.decisions.len(),
        "traversal complete"
    );

    let synthesis = synthesizer::synthesize(&provider, &config, &case_info, &relevant_nodes).await;

    let statistics = store::compute_statistics(&context.decisions, &relevant_count_by_depth);

    Ok(TraversalResult {
        relevant_nodes,
        traversal_path: context.decisions,
        final_recommendation: synthesis.recommendation,
        document_nodes: tree.nodes,
        statistics,
    })
}
