//! Human-readable run report rendered from a completed `TraversalResult`'s
//! statistics block. Not part of the egress contract (§6) — an additional
//! ambient view of the same data, for operators reading logs rather than
//! consuming JSON.

use ghte_core::TraversalResult;
use std::fmt::Write as _;

pub fn build_report(case_label: &str, result: &TraversalResult) -> String {
    let mut report = format!(
        "# GHTE Run Report: {case_label}\n\n## Relevant nodes: {}\n\n",
        result.relevant_nodes.len()
    );

    report.push_str("## Decisions by depth\n");
    for depth in &result.statistics.by_depth {
        let _ = writeln!(
            report,
            "  depth {}: {} scored, {} descended, {} relevant, avg score {:.2}",
            depth.depth, depth.total_nodes, depth.visited_nodes, depth.relevant_nodes, depth.average_score
        );
    }

    let dist = &result.statistics.score_distribution;
    let _ = write!(
        report,
        "\n## Score distribution\n  high (>=0.8): {}\n  medium [0.5,0.8): {}\n  low (<0.5): {}\n",
        dist.high_relevance, dist.medium_relevance, dist.low_relevance
    );

    report.push_str("\n## Included nodes\n");
    for node in &result.relevant_nodes {
        let icon = if node.relevance_score >= 0.8 { "*" } else { "-" };
        let _ = writeln!(
            report,
            "  {icon} [{}] {} (score {:.2})",
            node.id, node.title, node.relevance_score
        );
    }

    let _ = write!(report, "\n## Recommendation\n{}\n", result.final_recommendation);
    report
}
