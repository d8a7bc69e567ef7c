//! Recommendation synthesiser (§4.8): one final oracle call over the
//! collected relevant nodes, producing the human-facing summary that goes
//! into `finalRecommendation`. Schema-constrained the same way the batch
//! oracle client is, via forced tool choice.

use ghte_core::{EngineConfig, OracleFailureKind, RelevantNode};
use ghte_llm::provider::LlmProvider;
use ghte_llm::types::{LlmContent, LlmMessage, LlmRequest, LlmTool, ToolChoice};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TOOL_NAME: &str = "synthesize_recommendation";
const FALLBACK_RECOMMENDATION: &str =
    "Unable to generate a recommendation: the oracle was unavailable for the final synthesis step.";

pub struct Synthesis {
    pub recommendation: String,
    pub confidence: f64,
    pub key_findings: Vec<String>,
    pub additional_info_needed: Vec<String>,
}

pub async fn synthesize(
    provider: &Arc<dyn LlmProvider>,
    config: &EngineConfig,
    case_info: &Value,
    relevant_nodes: &[RelevantNode],
) -> Synthesis {
    match try_synthesize(provider, config, case_info, relevant_nodes).await {
        Ok(result) => result,
        Err(kind) => {
            warn!(?kind, "recommendation synthesis failed, returning fallback recommendation");
            Synthesis {
                recommendation: FALLBACK_RECOMMENDATION.to_string(),
                confidence: 0.0,
                key_findings: Vec::new(),
                additional_info_needed: Vec::new(),
            }
        }
    }
}

async fn try_synthesize(
    provider: &Arc<dyn LlmProvider>,
    config: &EngineConfig,
    case_info: &Value,
    relevant_nodes: &[RelevantNode],
) -> Result<Synthesis, OracleFailureKind> {
    let prompt = build_prompt(case_info, relevant_nodes);
    let request = LlmRequest {
        model: config.oracle_model.clone(),
        messages: vec![LlmMessage { role: "user".to_string(), content: LlmContent::Text(prompt) }],
        tools: Some(vec![synthesis_tool()]),
        tool_choice: Some(ToolChoice::Tool { name: TOOL_NAME.to_string() }),
        ..Default::default()
    };

    let completion = tokio::time::timeout(
        Duration::from_millis(config.oracle_timeout_ms),
        provider.complete(request),
    )
    .await
    .map_err(|_| OracleFailureKind::Timeout)?
    .map_err(super::oracle::classify_llm_error)?;

    let input = completion.first_tool_input().ok_or(OracleFailureKind::Schema)?;
    parse_synthesis(&input).ok_or(OracleFailureKind::Schema)
}

fn synthesis_tool() -> LlmTool {
    LlmTool {
        name: TOOL_NAME.to_string(),
        description: "Summarise the collected relevant statute sections into a final recommendation for the case.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "recommendation": { "type": "string" },
                "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                "keyFindings": { "type": "array", "items": { "type": "string" } },
                "additionalInfoNeeded": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["recommendation", "confidence", "keyFindings"]
        }),
    }
}

fn build_prompt(case_info: &Value, relevant_nodes: &[RelevantNode]) -> String {
    let sections: Vec<String> = relevant_nodes
        .iter()
        .map(|n| format!("- [{}] {} (score {:.2}): {}", n.id, n.title, n.relevance_score, n.reasoning))
        .collect();

    format!(
        "Case information:\n{}\n\nRelevant statute sections found during traversal:\n{}\n\n\
         Call {TOOL_NAME} with a recommendation summarising how these sections bear on the case, \
         a confidence score, and the key findings that support it.",
        serde_json::to_string_pretty(case_info).unwrap_or_default(),
        if sections.is_empty() { "(none found)".to_string() } else { sections.join("\n") },
    )
}

fn parse_synthesis(input: &Value) -> Option<Synthesis> {
    let recommendation = input.get("recommendation")?.as_str()?.to_string();
    let confidence = input.get("confidence").and_then(Value::as_f64).unwrap_or(0.0).clamp(0.0, 1.0);
    let key_findings = input
        .get("keyFindings")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let additional_info_needed = input
        .get("additionalInfoNeeded")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    Some(Synthesis { recommendation, confidence, key_findings, additional_info_needed })
}
