//! Batch oracle client: turns a slice of nodes into a single schema-
//! constrained relevance call, chunked to keep prompts small and paced to
//! stay under rate limits. A chunk that fails outright still produces a
//! decision for every id it was asked about — a node is never silently
//! dropped just because the oracle call around it errored.

use crate::context::extract_context;
use crate::reconciler::reconcile;
use chrono::Utc;
use ghte_core::{EngineConfig, LegalNode, OracleFailureKind, TraversalDecision};
use ghte_llm::provider::{LlmError, LlmProvider};
use ghte_llm::types::{LlmContent, LlmMessage, LlmRequest, LlmTool, ToolChoice};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TOOL_NAME: &str = "evaluate_relevance";

pub struct OracleClient {
    provider: Arc<dyn LlmProvider>,
    config: EngineConfig,
}

impl OracleClient {
    pub fn new(provider: Arc<dyn LlmProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    /// Evaluate every node in `nodes`, chunked to `max_batch_size` at a time,
    /// with a mandatory pause between chunks. Returns exactly one decision
    /// per input node, in input order.
    pub async fn evaluate_batch(
        &self,
        nodes: &[&LegalNode],
        case_info: &Value,
        previously_relevant_titles: &[String],
        depth: u32,
    ) -> Vec<TraversalDecision> {
        let mut out = Vec::with_capacity(nodes.len());

        for (i, chunk) in nodes.chunks(self.config.max_batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.chunk_delay_ms)).await;
            }
            out.extend(
                self.evaluate_chunk(chunk, case_info, previously_relevant_titles, depth)
                    .await,
            );
        }

        out
    }

    async fn evaluate_chunk(
        &self,
        chunk: &[&LegalNode],
        case_info: &Value,
        previously_relevant_titles: &[String],
        depth: u32,
    ) -> Vec<TraversalDecision> {
        let requested_ids: Vec<String> = chunk.iter().map(|n| n.id.clone()).collect();

        match self.call_provider(chunk, case_info, previously_relevant_titles).await {
            Ok(entries) => self.reconcile_chunk(&requested_ids, entries, depth),
            Err(kind) => {
                warn!(?kind, chunk_size = chunk.len(), "oracle chunk failed, emitting fallback decisions");
                requested_ids
                    .into_iter()
                    .map(|id| fallback_decision(id, depth))
                    .collect()
            }
        }
    }

    async fn call_provider(
        &self,
        chunk: &[&LegalNode],
        case_info: &Value,
        previously_relevant_titles: &[String],
    ) -> Result<Vec<(String, Value)>, OracleFailureKind> {
        let prompt = build_prompt(chunk, case_info, previously_relevant_titles);
        let request = LlmRequest {
            model: self.config.oracle_model.clone(),
            messages: vec![LlmMessage {
                role: "user".to_string(),
                content: LlmContent::Text(prompt),
            }],
            tools: Some(vec![evaluation_tool()]),
            tool_choice: Some(ToolChoice::Tool { name: TOOL_NAME.to_string() }),
            ..Default::default()
        };

        let completion = tokio::time::timeout(
            Duration::from_millis(self.config.oracle_timeout_ms),
            self.provider.complete(request),
        )
        .await
        .map_err(|_| OracleFailureKind::Timeout)?
        .map_err(classify_llm_error)?;

        let input = completion.first_tool_input().ok_or(OracleFailureKind::Schema)?;
        parse_decisions(&input).ok_or(OracleFailureKind::Schema)
    }

    fn reconcile_chunk(
        &self,
        requested_ids: &[String],
        entries: Vec<(String, Value)>,
        depth: u32,
    ) -> Vec<TraversalDecision> {
        let received_ids: Vec<String> = entries.iter().map(|(id, _)| id.clone()).collect();
        let matched = reconcile(requested_ids, entries);
        let mut by_id: std::collections::HashMap<String, Value> = matched.into_iter().collect();

        requested_ids
            .iter()
            .map(|id| match by_id.remove(id) {
                Some(entry) => decision_from_value(id.clone(), entry, depth),
                None => {
                    warn!(
                        requested = ?requested_ids,
                        received = ?received_ids,
                        unmapped = %id,
                        "could not reconcile oracle response to requested node id"
                    );
                    unmappable_decision(id.clone(), depth)
                }
            })
            .collect()
    }
}

fn evaluation_tool() -> LlmTool {
    LlmTool {
        name: TOOL_NAME.to_string(),
        description: "Score each candidate document node for relevance to the case and decide whether its children are worth exploring.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "decisions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "nodeId": { "type": "string" },
                            "relevanceScore": { "type": "number", "minimum": 0, "maximum": 1 },
                            "shouldExploreChildren": { "type": "boolean" },
                            "reasoning": { "type": "string" }
                        },
                        "required": ["nodeId", "relevanceScore", "shouldExploreChildren", "reasoning"]
                    }
                }
            },
            "required": ["decisions"]
        }),
    }
}

fn build_prompt(chunk: &[&LegalNode], case_info: &Value, previously_relevant_titles: &[String]) -> String {
    let mut sections = vec![format!(
        "Case information:\n{}",
        serde_json::to_string_pretty(case_info).unwrap_or_default()
    )];

    if !previously_relevant_titles.is_empty() {
        sections.push(format!(
            "Previously found relevant (for continuity, do not re-score):\n- {}",
            previously_relevant_titles.join("\n- ")
        ));
    }

    let candidates: Vec<String> = chunk
        .iter()
        .map(|n| format!("[{}] {}", n.id, extract_context(n)))
        .collect();
    sections.push(format!("Candidate nodes:\n{}", candidates.join("\n")));
    sections.push(
        "For each candidate node, call evaluate_relevance with one decision per nodeId: \
         relevanceScore in [0,1] reflecting how relevant the node's own content is to the case, \
         and shouldExploreChildren reflecting whether its children are worth examining separately \
         from its own relevance."
            .to_string(),
    );

    sections.join("\n\n")
}

fn parse_decisions(input: &Value) -> Option<Vec<(String, Value)>> {
    let decisions = input.get("decisions")?.as_array()?;
    Some(
        decisions
            .iter()
            .filter_map(|d| d.get("nodeId")?.as_str().map(|id| (id.to_string(), d.clone())))
            .collect(),
    )
}

fn decision_from_value(requested_id: String, value: Value, depth: u32) -> TraversalDecision {
    let score = value.get("relevanceScore").and_then(Value::as_f64).unwrap_or(0.0);
    let explore = value
        .get("shouldExploreChildren")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    TraversalDecision {
        node_id: requested_id,
        depth,
        timestamp: Utc::now(),
        relevance_score: score.clamp(0.0, 1.0),
        visited: explore,
        reasoning,
    }
}

fn fallback_decision(node_id: String, depth: u32) -> TraversalDecision {
    TraversalDecision {
        node_id,
        depth,
        timestamp: Utc::now(),
        relevance_score: 0.0,
        visited: false,
        reasoning: "oracle unavailable for this node".to_string(),
    }
}

/// Distinct from `fallback_decision`: this id was not a chunk-wide oracle
/// failure, the oracle responded but the reconciler (§4.4) could not match
/// any of its entries back to this requested id. Spec §4.4/§7 mandate this
/// exact reasoning string (`UnmappableEvaluation`, not `OracleFailure`).
fn unmappable_decision(node_id: String, depth: u32) -> TraversalDecision {
    TraversalDecision {
        node_id,
        depth,
        timestamp: Utc::now(),
        relevance_score: 0.0,
        visited: false,
        reasoning: "Could not map to batch evaluation response".to_string(),
    }
}

pub(crate) fn classify_llm_error(err: LlmError) -> OracleFailureKind {
    match err {
        LlmError::RateLimited { .. } => OracleFailureKind::RateLimit,
        LlmError::TimedOut => OracleFailureKind::Timeout,
        LlmError::ContextOverflow(_) => OracleFailureKind::TokenOverflow,
        LlmError::InvalidResponse(_) | LlmError::StreamError(_) => OracleFailureKind::Schema,
        LlmError::RequestFailed(_)
        | LlmError::AuthFailed(_)
        | LlmError::Cancelled
        | LlmError::NetworkError(_) => OracleFailureKind::Other,
    }
}
