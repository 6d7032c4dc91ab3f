//! Rank and tier assignment.
//!
//! Nodes are ordered by descending total score; ties fall back to display
//! name, then node type, then input position, so the order never depends on
//! how the catalog happened to list them.

use std::cmp::Ordering;

use tracing::{info, instrument};

use nodedocs_shared::{NodeRecord, ScoredNode, Tier, TierCaps};

use crate::scoring::NodeScore;

/// Tier for a 1-based rank under the given caps.
pub fn tier_for_rank(rank: usize, caps: &TierCaps) -> Tier {
    if rank <= caps.essential_max {
        Tier::Essential
    } else if rank <= caps.essential_max.saturating_add(caps.common_max) {
        Tier::Common
    } else {
        Tier::Specialized
    }
}

/// Indices of `records` in rank order.
pub fn rank_order(records: &[NodeRecord], scores: &[NodeScore]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| {
        compare_ranked(&records[a], &scores[a], &records[b], &scores[b]).then(a.cmp(&b))
    });
    order
}

fn compare_ranked(a: &NodeRecord, sa: &NodeScore, b: &NodeRecord, sb: &NodeScore) -> Ordering {
    sb.total
        .total_cmp(&sa.total)
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.node_type.cmp(&b.node_type))
}

/// Rank every node and assign its tier. Output is sorted by rank.
///
/// Idempotent: the same records, scores and caps always give the same result.
#[instrument(skip_all, fields(node_count = records.len()))]
pub fn assign_tiers(
    records: &[NodeRecord],
    scores: &[NodeScore],
    caps: &TierCaps,
) -> Vec<ScoredNode> {
    let ranked: Vec<ScoredNode> = rank_order(records, scores)
        .into_iter()
        .enumerate()
        .map(|(position, index)| {
            let rank = position + 1;
            ScoredNode {
                record: records[index].clone(),
                factors: scores[index].factors,
                score: scores[index].total,
                rank,
                tier: tier_for_rank(rank, caps),
            }
        })
        .collect();

    info!(
        essential = count_tier(&ranked, Tier::Essential),
        common = count_tier(&ranked, Tier::Common),
        specialized = count_tier(&ranked, Tier::Specialized),
        "tiers assigned"
    );

    ranked
}

/// Number of nodes in `tier`.
pub fn count_tier(nodes: &[ScoredNode], tier: Tier) -> usize {
    nodes.iter().filter(|n| n.tier == tier).count()
}
