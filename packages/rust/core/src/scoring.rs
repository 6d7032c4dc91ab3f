//! Importance scoring.
//!
//! Every node gets four factors in `[0, 1]` (usage frequency, documentation
//! quality, community popularity, versatility) and a weighted total. The
//! lookup tables are built once from the priority document and passed into
//! pure scoring functions.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, instrument};

use nodedocs_shared::{
    FactorScores, IdentityConfig, NodeRecord, PriorityConfig, ScoringWeights,
};

/// Popularity of a node on the explicit essential list.
const ESSENTIAL_POPULARITY: f64 = 1.0;
/// Popularity of a node on the explicit common list.
const COMMON_POPULARITY: f64 = 0.7;
/// Popularity of a node on the explicit boosted list.
const BOOSTED_POPULARITY: f64 = 0.8;

const DESCRIPTION_BONUS: f64 = 0.3;
const FULL_DOCS_BONUS: f64 = 0.5;
const PROPERTIES_BONUS: f64 = 0.2;

const CORE_NODE_BONUS: f64 = 0.5;
const TRIGGER_BONUS: f64 = 0.2;

/// Immutable lookup tables derived from a [`PriorityConfig`].
#[derive(Debug, Clone)]
pub struct ScoringTables {
    identity: IdentityConfig,
    weights: ScoringWeights,
    essential: HashSet<String>,
    common: HashSet<String>,
    boosted: HashSet<String>,
    core_nodes: HashSet<String>,
    category_scores: BTreeMap<String, f64>,
    default_score: f64,
}

impl ScoringTables {
    /// Normalize every configured identity list once.
    pub fn from_config(config: &PriorityConfig) -> Self {
        let identity = config.identity.clone();
        let normalize_all = |items: &[String]| -> HashSet<String> {
            items
                .iter()
                .map(|i| normalize_identity(i, &identity))
                .collect()
        };

        Self {
            essential: normalize_all(&config.popularity.essential),
            common: normalize_all(&config.popularity.common),
            boosted: normalize_all(&config.popularity.boosted),
            core_nodes: normalize_all(&config.versatility.core_nodes),
            category_scores: config.popularity.category_scores.clone(),
            default_score: config.popularity.default_score,
            weights: config.weights,
            identity,
        }
    }
}

/// The factors and weighted total for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeScore {
    pub factors: FactorScores,
    pub total: f64,
}

/// Lower-case and strip the package namespace and product prefixes, so that
/// `n8n-nodes-base.httpRequest` and `httpRequest` compare equal.
pub fn normalize_identity(identity: &str, config: &IdentityConfig) -> String {
    let lowered = identity.trim().to_lowercase();

    let mut rest = lowered.as_str();
    if let Some(prefix) = config
        .namespace_prefixes
        .iter()
        .find(|p| !p.is_empty() && rest.starts_with(p.as_str()))
    {
        rest = &rest[prefix.len()..];
    }
    if !config.product_prefix.is_empty() {
        rest = rest.strip_prefix(config.product_prefix.as_str()).unwrap_or(rest);
    }

    rest.to_string()
}

/// Score all nodes. The result is aligned with `records`.
#[instrument(skip_all, fields(node_count = records.len()))]
pub fn score_nodes(records: &[NodeRecord], tables: &ScoringTables) -> Vec<NodeScore> {
    let max_usage = records
        .iter()
        .map(|r| r.usage_count.unwrap_or(0))
        .max()
        .unwrap_or(0);

    let scores: Vec<NodeScore> = records
        .iter()
        .map(|record| {
            let normalized = normalize_identity(&record.node_type, &tables.identity);
            let factors = FactorScores {
                usage: usage_factor(record.usage_count.unwrap_or(0), max_usage),
                documentation: documentation_factor(record),
                popularity: popularity_factor(&normalized, record.category.as_deref(), tables),
                versatility: versatility_factor(&normalized, record, tables),
            };
            NodeScore {
                factors,
                total: weighted_total(&factors, &tables.weights),
            }
        })
        .collect();

    debug!(max_usage, "scored nodes");
    scores
}

/// `usage / max(max_usage, 1)`.
pub fn usage_factor(usage: u64, max_usage: u64) -> f64 {
    if max_usage == 0 {
        return 0.0;
    }
    (usage as f64 / max_usage.max(1) as f64).clamp(0.0, 1.0)
}

/// Description, full documentation and properties each add a fixed bonus.
pub fn documentation_factor(record: &NodeRecord) -> f64 {
    let mut score = 0.0;
    if record.has_description() {
        score += DESCRIPTION_BONUS;
    }
    if is_documented(record) {
        score += FULL_DOCS_BONUS;
    }
    if record.property_count() > 0 {
        score += PROPERTIES_BONUS;
    }
    f64::min(score, 1.0)
}

/// Explicit lists first (essential, common, boosted), then the category base score.
pub fn popularity_factor(normalized: &str, category: Option<&str>, tables: &ScoringTables) -> f64 {
    if tables.essential.contains(normalized) {
        ESSENTIAL_POPULARITY
    } else if tables.common.contains(normalized) {
        COMMON_POPULARITY
    } else if tables.boosted.contains(normalized) {
        BOOSTED_POPULARITY
    } else {
        category
            .and_then(|c| tables.category_scores.get(c.trim()))
            .copied()
            .unwrap_or(tables.default_score)
    }
}

/// Core-node bonus, property-count bonus and trigger/webhook bonus.
pub fn versatility_factor(normalized: &str, record: &NodeRecord, tables: &ScoringTables) -> f64 {
    let mut score = 0.0;
    if tables.core_nodes.contains(normalized) {
        score += CORE_NODE_BONUS;
    }
    score += match record.property_count() {
        n if n > 10 => 0.3,
        n if n > 5 => 0.2,
        n if n > 0 => 0.1,
        _ => 0.0,
    };
    if record.flags.is_trigger || record.flags.is_webhook {
        score += TRIGGER_BONUS;
    }
    f64::min(score, 1.0)
}

/// Weighted sum of the factors. Weights are validated at config load, so the
/// clamp only absorbs float rounding.
pub fn weighted_total(factors: &FactorScores, weights: &ScoringWeights) -> f64 {
    let total = factors.usage * weights.usage
        + factors.documentation * weights.documentation
        + factors.popularity * weights.popularity
        + factors.versatility * weights.versatility;
    total.clamp(0.0, 1.0)
}

/// Full documentation flag, or pre-extracted documentation text.
fn is_documented(record: &NodeRecord) -> bool {
    record.has_documentation
        || record
            .documentation
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodedocs_shared::NodeProperty;

    fn tables() -> ScoringTables {
        ScoringTables::from_config(&PriorityConfig::default())
    }

    fn props(n: usize) -> Vec<NodeProperty> {
        (0..n)
            .map(|i| NodeProperty {
                name: format!("p{i}"),
                ..NodeProperty::default()
            })
            .collect()
    }

    #[test]
    fn normalize_strips_namespace_and_product() {
        let cfg = IdentityConfig::default();
        assert_eq!(normalize_identity("n8n-nodes-base.httpRequest", &cfg), "httprequest");
        assert_eq!(normalize_identity("@n8n/n8n-nodes-langchain.agent", &cfg), "agent");
        assert_eq!(normalize_identity("nodes-base.Slack", &cfg), "slack");
        assert_eq!(normalize_identity("n8n-custom-thing", &cfg), "custom-thing");
        assert_eq!(normalize_identity("HttpRequest", &cfg), "httprequest");
    }

    #[test]
    fn different_namespaces_compare_equal() {
        let cfg = IdentityConfig::default();
        assert_eq!(
            normalize_identity("n8n-nodes-base.code", &cfg),
            normalize_identity("nodes-base.code", &cfg)
        );
    }

    #[test]
    fn usage_factor_normalizes_by_max() {
        assert_eq!(usage_factor(50, 100), 0.5);
        assert_eq!(usage_factor(100, 100), 1.0);
        assert_eq!(usage_factor(0, 0), 0.0);
    }

    #[test]
    fn documentation_factor_sums_bonuses() {
        let mut record = NodeRecord::new("n8n-nodes-base.slack", "Slack");
        assert_eq!(documentation_factor(&record), 0.0);

        record.description = Some("Send messages".into());
        assert!((documentation_factor(&record) - 0.3).abs() < 1e-9);

        record.has_documentation = true;
        record.properties = props(1);
        assert!((documentation_factor(&record) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn documentation_text_counts_as_full_docs() {
        let mut record = NodeRecord::new("n8n-nodes-base.slack", "Slack");
        record.documentation = Some("Long form docs".into());
        assert!((documentation_factor(&record) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn popularity_prefers_explicit_lists() {
        let t = tables();
        assert_eq!(popularity_factor("httprequest", Some("Core Nodes"), &t), 1.0);
        assert_eq!(popularity_factor("slack", Some("Communication"), &t), 0.7);
        assert_eq!(popularity_factor("agent", None, &t), 0.8);
        assert_eq!(popularity_factor("zendesk", Some("Communication"), &t), 0.5);
        assert_eq!(popularity_factor("zendesk", Some("Unknown Things"), &t), 0.2);
        assert_eq!(popularity_factor("zendesk", None, &t), 0.2);
    }

    #[test]
    fn versatility_combines_bonuses_and_caps() {
        let t = tables();
        let mut record = NodeRecord::new("n8n-nodes-base.webhook", "Webhook");
        record.flags.is_webhook = true;
        record.properties = props(11);
        // 0.5 core + 0.3 props + 0.2 webhook
        assert!((versatility_factor("webhook", &record, &t) - 1.0).abs() < 1e-9);

        let mut plain = NodeRecord::new("n8n-nodes-base.zendesk", "Zendesk");
        plain.properties = props(6);
        assert!((versatility_factor("zendesk", &plain, &t) - 0.2).abs() < 1e-9);
        plain.properties = props(2);
        assert!((versatility_factor("zendesk", &plain, &t) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn all_scores_in_unit_interval() {
        let t = tables();
        let mut records = Vec::new();
        for i in 0..20u64 {
            let mut r = NodeRecord::new(format!("n8n-nodes-base.node{i}"), format!("Node {i}"));
            r.usage_count = Some(i * 37);
            r.has_documentation = i % 2 == 0;
            r.description = Some("desc".into());
            r.properties = props((i % 13) as usize);
            r.flags.is_trigger = i % 3 == 0;
            records.push(r);
        }
        records.push(NodeRecord::new("n8n-nodes-base.httpRequest", "HTTP Request"));

        for score in score_nodes(&records, &t) {
            let f = score.factors;
            for v in [f.usage, f.documentation, f.popularity, f.versatility, score.total] {
                assert!((0.0..=1.0).contains(&v), "score {v} out of range");
            }
        }
    }

    #[test]
    fn total_uses_weights_without_renormalizing() {
        let factors = FactorScores {
            usage: 1.0,
            documentation: 1.0,
            popularity: 1.0,
            versatility: 1.0,
        };
        let half = ScoringWeights {
            usage: 0.2,
            documentation: 0.1,
            popularity: 0.1,
            versatility: 0.1,
        };
        assert!((weighted_total(&factors, &half) - 0.5).abs() < 1e-9);
        assert!((weighted_total(&factors, &ScoringWeights::default()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_usage_everywhere_gives_zero_usage_factor() {
        let records = vec![
            NodeRecord::new("a.one", "One"),
            NodeRecord::new("a.two", "Two"),
        ];
        let scores = score_nodes(&records, &tables());
        assert!(scores.iter().all(|s| s.factors.usage == 0.0));
    }
}
