//! End-to-end scenarios from spec §8, run against a scripted oracle stub —
//! no network calls, fully deterministic.

use async_trait::async_trait;
use ghte_core::EngineConfig;
use ghte_llm::provider::{LlmCompletion, LlmError, LlmProvider, LlmResult, LlmStream};
use ghte_llm::types::{AccumulatedToolCall, LlmContent, LlmRequest};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counts how many chunks it was asked to evaluate and, on the second
/// chunk, fails outright — used to exercise the batch-chunking and
/// partial-failure scenarios together.
struct ChunkCountingOracle {
    calls: AtomicUsize,
    call_times: std::sync::Mutex<Vec<Instant>>,
    fail_chunk: Option<usize>,
}

#[async_trait]
impl LlmProvider for ChunkCountingOracle {
    fn name(&self) -> &str {
        "chunk-counting"
    }
    fn models(&self) -> &[&str] {
        &["scripted"]
    }
    async fn complete_stream(
        &self,
        _request: LlmRequest,
        _cancel: Option<tokio_util::sync::CancellationToken>,
    ) -> LlmResult<LlmStream> {
        unreachable!()
    }

    async fn complete(&self, request: LlmRequest) -> LlmResult<LlmCompletion> {
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());

        if request.tools.as_ref().map(|t| t[0].name.as_str()) == Some("synthesize_recommendation") {
            let arguments = json!({ "recommendation": "ok", "confidence": 0.5, "keyFindings": [] }).to_string();
            return Ok(LlmCompletion {
                tool_calls: vec![AccumulatedToolCall { id: "s".into(), name: "synthesize_recommendation".into(), arguments }],
                ..Default::default()
            });
        }

        if self.fail_chunk == Some(call_index) {
            return Err(LlmError::RequestFailed("simulated chunk failure".into()));
        }

        let LlmContent::Text(prompt) = &request.messages[0].content else {
            return Err(LlmError::InvalidResponse("expected text".into()));
        };

        // Extract every "[id]" marker from the candidate list and score each 0.9/explore=false.
        let decisions: Vec<_> = prompt
            .split('[')
            .skip(1)
            .filter_map(|chunk| chunk.split(']').next())
            .map(|id| json!({ "nodeId": id, "relevanceScore": 0.9, "shouldExploreChildren": false, "reasoning": "ok" }))
            .collect();

        let arguments = json!({ "decisions": decisions }).to_string();
        Ok(LlmCompletion {
            tool_calls: vec![AccumulatedToolCall { id: "c".into(), name: "evaluate_relevance".into(), arguments }],
            ..Default::default()
        })
    }
}

fn flat_level_document(count: usize) -> serde_json::Value {
    let child_ids: Vec<String> = (0..count).map(|i| format!("n{i}")).collect();

    let mut nodes = serde_json::Map::new();
    nodes.insert("root".to_string(), json!({ "id": "root", "title": "Root", "level": 0, "children": child_ids }));
    for i in 0..count {
        nodes.insert(format!("n{i}"), json!({ "id": format!("n{i}"), "title": format!("Node {i}"), "level": 1 }));
    }

    json!({ "nodes": nodes, "rootNodes": ["root"] })
}

#[tokio::test]
async fn batch_chunking_boundary_respects_max_batch_size_and_pacing() {
    // 12 nodes at level 1 (under root), MAX_BATCH_SIZE=5 -> chunks of 5, 5, 2.
    let document = flat_level_document(12);
    let config = EngineConfig { max_batch_size: 5, chunk_delay_ms: 50, max_depth: 2, ..EngineConfig::default() };
    let provider = Arc::new(ChunkCountingOracle {
        calls: AtomicUsize::new(0),
        call_times: std::sync::Mutex::new(Vec::new()),
        fail_chunk: None,
    });
    let provider_trait: Arc<dyn LlmProvider> = provider.clone();

    let result = ghte_engine::run(&document, json!({"case": "x"}), config, provider_trait).await.unwrap();

    // root is depth 0 (one call), 12 level-1 nodes chunked into 3 calls, plus 1 synthesis call.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
    assert_eq!(result.traversal_path.len(), 13);

    let times = provider.call_times.lock().unwrap();
    // Calls 1..4 (the three level-1 chunks) should be paced >= 50ms apart.
    for pair in times[1..4].windows(2) {
        assert!(pair[1].duration_since(pair[0]).as_millis() >= 45);
    }
}

#[tokio::test]
async fn chunk_failure_falls_back_without_losing_other_chunks() {
    let document = flat_level_document(12);
    let config = EngineConfig { max_batch_size: 5, chunk_delay_ms: 0, max_depth: 2, ..EngineConfig::default() };
    // Fail the second chunk call overall: call 0 is root (depth 0), calls 1/2/3 are the
    // three level-1 chunks — fail call index 2 (the middle level-1 chunk).
    let provider = Arc::new(ChunkCountingOracle {
        calls: AtomicUsize::new(0),
        call_times: std::sync::Mutex::new(Vec::new()),
        fail_chunk: Some(2),
    });
    let provider_trait: Arc<dyn LlmProvider> = provider;

    let result = ghte_engine::run(&document, json!({"case": "x"}), config, provider_trait).await.unwrap();

    assert_eq!(result.traversal_path.len(), 13, "every submitted id still gets a decision");
    let fallback_count = result
        .traversal_path
        .iter()
        .filter(|d| d.reasoning == "oracle unavailable for this node")
        .count();
    assert_eq!(fallback_count, 5, "exactly the failed chunk's 5 nodes fall back");
}

#[tokio::test]
async fn duplicate_root_ids_are_suffixed_and_preserved_through_a_run() {
    let document = json!({
        "structure_discovery": {
            "structure_analysis": {
                "document_structure": {
                    "root_sections": [
                        { "id": "part_1", "title": "Part 1 (first)" },
                        { "id": "part_1", "title": "Part 1 (second)" }
                    ]
                }
            }
        }
    });

    let tree = ghte_engine::dry_run(&document).unwrap();
    assert_eq!(tree.len(), 2);
    assert!(tree.get("part_1").is_some());
    assert!(tree.get("part_1_2").is_some());
    assert_eq!(tree.get("part_1_2").unwrap().title, "Part 1 (second)");
}

#[test]
fn id_reconciliation_under_fuzz_resolves_both_without_fallback() {
    use ghte_engine::reconciler::reconcile;

    let requested = vec![
        "28 Other rules on contract formation".to_string(),
        "29 Digital content scope".to_string(),
    ];
    let received = vec![
        ("28".to_string(), json!({"relevanceScore": 0.5})),
        ("29 digital content  scope".to_string(), json!({"relevanceScore": 0.6})),
    ];

    let matched = reconcile(&requested, received);
    assert_eq!(matched.len(), 2);
    assert_eq!(matched[0].0, requested[0]);
    assert_eq!(matched[1].0, requested[1]);
}
