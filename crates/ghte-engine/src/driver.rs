//! Level-synchronous BFS traversal driver (§4.6). Levels are processed in
//! strict order; within a level, inclusion ("relevant enough to report")
//! and descent ("worth exploring the children separately") are independent
//! axes read straight off the oracle's per-node decision — never conflated,
//! per the Design Notes.

use ghte_core::{
    EngineConfig, LegalDocumentTree, RelevantNode, TraversalContext, TraversalDecision,
};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

use crate::oracle::OracleClient;

#[derive(Clone, Copy)]
struct QueueEntry<'a> {
    node_id: &'a str,
    depth: u32,
}

/// Runs one traversal to completion. Returns the ordered `relevantNodes`
/// list, the full decision log, and a depth→relevant-count map the caller
/// folds into the statistics block alongside the log.
pub async fn traverse(
    tree: &LegalDocumentTree,
    oracle: &OracleClient,
    config: &EngineConfig,
    context: &mut TraversalContext,
) -> (Vec<RelevantNode>, HashMap<u32, usize>) {
    let mut queue: VecDeque<QueueEntry> = tree
        .root_nodes
        .iter()
        .map(|id| QueueEntry { node_id: id.as_str(), depth: 0 })
        .collect();
    for root in &tree.root_nodes {
        context.visited_nodes.insert(root.clone());
    }

    let mut relevant_nodes = Vec::new();
    let mut relevant_count_by_depth: HashMap<u32, usize> = HashMap::new();
    let mut previously_relevant_titles: Vec<String> = Vec::new();

    for depth in 0..config.max_depth {
        let current_level: Vec<&str> = queue
            .iter()
            .filter(|e| e.depth == depth)
            .map(|e| e.node_id)
            .collect();
        if current_level.is_empty() {
            break;
        }

        context.current_depth = depth;
        info!(depth, count = current_level.len(), "evaluating level");

        let nodes: Vec<&ghte_core::LegalNode> = current_level
            .iter()
            .filter_map(|id| tree.get(id))
            .collect();

        let decisions = oracle
            .evaluate_batch(&nodes, &context.case_info, &previously_relevant_titles, depth)
            .await;

        for decision in decisions {
            apply_decision(
                decision,
                tree,
                config,
                &mut queue,
                &mut relevant_nodes,
                &mut relevant_count_by_depth,
                &mut previously_relevant_titles,
                context,
            );
        }

        queue.retain(|e| e.depth != depth);
    }

    (relevant_nodes, relevant_count_by_depth)
}

#[allow(clippy::too_many_arguments)]
fn apply_decision<'a>(
    decision: TraversalDecision,
    tree: &'a LegalDocumentTree,
    config: &EngineConfig,
    queue: &mut VecDeque<QueueEntry<'a>>,
    relevant_nodes: &mut Vec<RelevantNode>,
    relevant_count_by_depth: &mut HashMap<u32, usize>,
    previously_relevant_titles: &mut Vec<String>,
    context: &mut TraversalContext,
) {
    let depth = decision.depth;
    let node = tree.get(&decision.node_id);

    if decision.relevance_score > config.relevance_threshold {
        if let Some(node) = node {
            relevant_nodes.push(RelevantNode {
                id: node.id.clone(),
                title: node.title.clone(),
                level: node.level,
                content: node.content.clone(),
                metadata: node.metadata.clone(),
                relevance_score: decision.relevance_score,
                reasoning: decision.reasoning.clone(),
            });
            previously_relevant_titles.push(node.title.clone());
            *relevant_count_by_depth.entry(depth).or_insert(0) += 1;
        }
    }

    if decision.visited && depth + 1 < config.max_depth {
        if let Some(node) = node {
            for child_id in &node.children {
                if context.visited_nodes.insert(child_id.clone()) {
                    if let Some(child) = tree.nodes.get(child_id) {
                        queue.push_back(QueueEntry { node_id: &child.id, depth: depth + 1 });
                    }
                }
            }
        }
    }

    debug!(node_id = %decision.node_id, score = decision.relevance_score, visited = decision.visited, "decision recorded");
    context.visited_nodes.insert(decision.node_id.clone());
    context.decisions.push(decision);
}
