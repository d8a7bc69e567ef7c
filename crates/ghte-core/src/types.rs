//! The GHTE data model: nodes, the document tree, decisions, per-run
//! context, and the result shapes exchanged at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One entry in the legal document tree (part, chapter, section, leaf provision).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub level: u32,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub metadata: Option<NodeMetadata>,
}

impl LegalNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Optional contextual bag carried by a node, consumed by the node-context
/// extractor when building oracle prompts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetadata {
    pub keywords: Vec<String>,
    pub main_themes: Vec<String>,
    pub key_points: Vec<String>,
    pub scope: Option<String>,
    pub practical_impact: Option<String>,
    pub legal_references: Vec<String>,
    pub section_number: Option<String>,
    pub section_type: Option<String>,
}

/// Canonical, normalised document: a flat id→node map plus ordered roots.
/// Produced by the normaliser from whatever raw shape the document arrived
/// in; immutable for the duration of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalDocumentTree {
    pub nodes: HashMap<String, LegalNode>,
    pub root_nodes: Vec<String>,
}

impl LegalDocumentTree {
    pub fn new(nodes: HashMap<String, LegalNode>, root_nodes: Vec<String>) -> Self {
        Self { nodes, root_nodes }
    }

    pub fn get(&self, id: &str) -> Option<&LegalNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One record per node evaluated by the oracle during a traversal run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalDecision {
    pub node_id: String,
    pub depth: u32,
    pub timestamp: DateTime<Utc>,
    pub relevance_score: f64,
    /// Permission to descend into this node's children — NOT "was scored".
    pub visited: bool,
    pub reasoning: String,
}

/// Per-run mutable scratch. Created at run start, discarded at run end;
/// never shared across runs.
#[derive(Debug)]
pub struct TraversalContext {
    pub case_info: serde_json::Value,
    pub visited_nodes: HashSet<String>,
    pub decisions: Vec<TraversalDecision>,
    pub current_depth: u32,
}

impl TraversalContext {
    pub fn new(case_info: serde_json::Value) -> Self {
        Self {
            case_info,
            visited_nodes: HashSet::new(),
            decisions: Vec::new(),
            current_depth: 0,
        }
    }
}

/// A node included in the output, decorated with its scoring decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantNode {
    pub id: String,
    pub title: String,
    pub level: u32,
    pub content: String,
    pub metadata: Option<NodeMetadata>,
    pub relevance_score: f64,
    pub reasoning: String,
}

/// Per-depth aggregate used in the result's statistics block.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthStats {
    pub depth: u32,
    pub total_nodes: usize,
    pub visited_nodes: usize,
    pub relevant_nodes: usize,
    pub average_score: f64,
}

/// Relevance-band histogram used in the statistics block.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDistribution {
    pub high_relevance: usize,
    pub medium_relevance: usize,
    pub low_relevance: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalStatistics {
    pub by_depth: Vec<DepthStats>,
    pub score_distribution: ScoreDistribution,
}

/// The full result object returned at the end of a traversal run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalResult {
    pub relevant_nodes: Vec<RelevantNode>,
    pub traversal_path: Vec<TraversalDecision>,
    pub final_recommendation: String,
    pub document_nodes: HashMap<String, LegalNode>,
    pub statistics: TraversalStatistics,
}
