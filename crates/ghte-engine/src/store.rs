//! Decision log statistics and the single-slot result store.
//!
//! The store is the only process-wide mutable state in the engine: each
//! successful run overwrites it with an atomic write-to-temp-then-rename,
//! so a reader never observes a half-written file. Concurrent runs are
//! last-writer-wins — there is no merge, no history, just whichever run's
//! rename landed last.

use chrono::Utc;
use ghte_core::{DepthStats, Error, Result, ScoreDistribution, TraversalDecision, TraversalResult};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

/// Builds the statistics block (§4.7) from the full decision log.
pub fn compute_statistics(
    decisions: &[TraversalDecision],
    relevant_count_by_depth: &std::collections::HashMap<u32, usize>,
) -> ghte_core::TraversalStatistics {
    let mut by_depth_map: std::collections::BTreeMap<u32, (usize, usize, f64)> =
        std::collections::BTreeMap::new();

    for d in decisions {
        let entry = by_depth_map.entry(d.depth).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if d.visited {
            entry.1 += 1;
        }
        entry.2 += d.relevance_score;
    }

    let by_depth = by_depth_map
        .into_iter()
        .map(|(depth, (total, visited, score_sum))| DepthStats {
            depth,
            total_nodes: total,
            visited_nodes: visited,
            relevant_nodes: relevant_count_by_depth.get(&depth).copied().unwrap_or(0),
            average_score: if total == 0 { 0.0 } else { score_sum / total as f64 },
        })
        .collect();

    let mut distribution = ScoreDistribution::default();
    for d in decisions {
        if d.relevance_score >= 0.8 {
            distribution.high_relevance += 1;
        } else if d.relevance_score >= 0.5 {
            distribution.medium_relevance += 1;
        } else {
            distribution.low_relevance += 1;
        }
    }

    ghte_core::TraversalStatistics { by_depth, score_distribution: distribution }
}

/// Process-wide single-slot store of the most recent completed result, kept
/// in memory and mirrored to a JSON file on disk. `fetch_latest` always
/// reads the in-memory copy; the file exists so a *different* process (a
/// follow-up export or claim-evaluation request) can pick it up too.
pub struct ResultStore {
    path: PathBuf,
    latest: RwLock<Option<TraversalResult>>,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), latest: RwLock::new(None) }
    }

    /// Overwrite the slot with `result`. A failure to persist to disk is
    /// reported but does not fail the run: the in-memory copy is always
    /// updated first, so `fetch_latest` keeps working even if the
    /// filesystem write fails (§7, `StoreUnavailable` degrades the
    /// follow-up export path, never the live return).
    pub fn commit(&self, result: &TraversalResult) -> Result<()> {
        {
            let mut guard = self.latest.write().expect("result store lock poisoned");
            *guard = Some(result.clone());
        }
        if let Err(e) = self.persist(result) {
            warn!(error = %e, "result store failed to persist to disk");
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self, result: &TraversalResult) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let tmp_path = parent.join(format!(
            ".{}.tmp.{}",
            self.path.file_name().and_then(|n| n.to_str()).unwrap_or("result"),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        let body = serde_json::to_vec_pretty(result)?;
        std::fs::write(&tmp_path, &body).map_err(|e| {
            Error::StoreUnavailable(format!("write temp file {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            Error::StoreUnavailable(format!("rename into place {}: {e}", self.path.display()))
        })?;
        Ok(())
    }

    /// Returns `None` when the slot has never been committed in this
    /// process (does not read from disk — the in-memory slot is
    /// authoritative for the running process per §3's LatestResultSlot).
    pub fn fetch_latest(&self) -> Option<TraversalResult> {
        self.latest.read().expect("result store lock poisoned").clone()
    }

    pub fn clear_latest(&self) {
        let mut guard = self.latest.write().expect("result store lock poisoned");
        *guard = None;
    }
}
