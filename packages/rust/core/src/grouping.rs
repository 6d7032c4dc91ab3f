//! Functional grouping.
//!
//! Independent of scoring and categories: each node gets a keyword-derived
//! usage bucket, functional-group tags from an ordered rule table, structural
//! tags from its flags, and up to [`MAX_RELATED`] related nodes sharing a tag.
//! Explicit pairwise relationships are kept only when both endpoints exist.

use tracing::{debug, instrument};

use nodedocs_shared::{
    GroupedNode, GroupingRules, IdentityConfig, NodeRecord, NodeTag, Relationship,
    UsageFrequency,
};

use crate::scoring::normalize_identity;

/// Most related nodes recorded per node.
pub const MAX_RELATED: usize = 5;

/// Output of [`group_nodes`].
#[derive(Debug, Clone, Default)]
pub struct GroupingOutput {
    /// Aligned with the input records.
    pub nodes: Vec<GroupedNode>,
    pub relationships: Vec<Relationship>,
}

/// First matching keyword list wins: essential, then common, else specialized.
pub fn usage_frequency(identity: &str, rules: &GroupingRules) -> UsageFrequency {
    let lowered = identity.to_lowercase();
    let hit = |keywords: &[String]| keywords.iter().any(|k| lowered.contains(k.as_str()));

    if hit(&rules.essential_keywords) {
        UsageFrequency::Essential
    } else if hit(&rules.common_keywords) {
        UsageFrequency::Common
    } else {
        UsageFrequency::Specialized
    }
}

/// Every functional-group rule that matches, in rule order.
///
/// Keywords are tested against the normalized identity and the lower-cased
/// display name. A node matching nothing gets the fallback group.
pub fn functional_groups(
    record: &NodeRecord,
    normalized: &str,
    rules: &GroupingRules,
) -> Vec<String> {
    let display = record.display_name.to_lowercase();

    let mut groups: Vec<String> = Vec::new();
    for rule in &rules.functional_groups {
        let keyword_hit = rule
            .keywords
            .iter()
            .any(|k| normalized.contains(k.as_str()) || display.contains(k.as_str()));
        let flag_hit = rule.flags.iter().any(|f| f.matches(&record.flags));

        if (keyword_hit || flag_hit) && !groups.contains(&rule.tag) {
            groups.push(rule.tag.clone());
        }
    }

    if groups.is_empty() {
        groups.push(rules.fallback_group.clone());
    }
    groups
}

/// Structural tags derived from flags and operations.
pub fn structural_tags(record: &NodeRecord) -> Vec<NodeTag> {
    let flags = &record.flags;
    let mut tags = Vec::new();
    if flags.is_trigger {
        tags.push(NodeTag::Trigger);
    }
    if flags.is_webhook {
        tags.push(NodeTag::Webhook);
    }
    if flags.is_ai_tool {
        tags.push(NodeTag::Ai);
    }
    if flags.has_credentials {
        tags.push(NodeTag::RequiresAuth);
    }
    if flags.has_operations || record.operations.len() > 1 {
        tags.push(NodeTag::MultiOperation);
    }
    tags
}

/// Other nodes sharing at least one group with node `index`, in input order.
pub fn related_nodes(index: usize, records: &[NodeRecord], groups: &[Vec<String>]) -> Vec<String> {
    let own = &groups[index];
    records
        .iter()
        .zip(groups)
        .enumerate()
        .filter(|(i, (_, other))| *i != index && other.iter().any(|g| own.contains(g)))
        .map(|(_, (record, _))| record.node_type.clone())
        .take(MAX_RELATED)
        .collect()
}

/// Resolve the relationship table against the input nodes.
///
/// An endpoint is present when some normalized identity contains it. The
/// resolved identity prefers an exact match over a substring match.
pub fn resolve_relationships(
    records: &[NodeRecord],
    normalized: &[String],
    rules: &GroupingRules,
) -> Vec<Relationship> {
    let resolve = |endpoint: &str| -> Option<String> {
        let endpoint = endpoint.to_lowercase();
        let exact = normalized.iter().position(|n| *n == endpoint);
        let partial = || normalized.iter().position(|n| n.contains(endpoint.as_str()));
        exact.or_else(partial).map(|i| records[i].node_type.clone())
    };

    rules
        .relationships
        .iter()
        .filter_map(|rule| {
            let source = resolve(&rule.from)?;
            let target = resolve(&rule.to)?;
            Some(Relationship {
                source,
                target,
                kind: rule.kind,
                rationale: rule.rationale.clone(),
            })
        })
        .collect()
}

/// Group every node and resolve relationships.
#[instrument(skip_all, fields(node_count = records.len()))]
pub fn group_nodes(
    records: &[NodeRecord],
    rules: &GroupingRules,
    identity: &IdentityConfig,
) -> GroupingOutput {
    let normalized: Vec<String> = records
        .iter()
        .map(|r| normalize_identity(&r.node_type, identity))
        .collect();

    let groups: Vec<Vec<String>> = records
        .iter()
        .zip(&normalized)
        .map(|(record, norm)| functional_groups(record, norm, rules))
        .collect();

    let nodes: Vec<GroupedNode> = records
        .iter()
        .enumerate()
        .map(|(i, record)| GroupedNode {
            record: record.clone(),
            usage: usage_frequency(&record.node_type, rules),
            groups: groups[i].clone(),
            related: related_nodes(i, records, &groups),
            tags: structural_tags(record),
        })
        .collect();

    let relationships = resolve_relationships(records, &normalized, rules);

    debug!(relationships = relationships.len(), "grouping complete");

    GroupingOutput {
        nodes,
        relationships,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodedocs_shared::RelationshipKind;

    fn rules() -> GroupingRules {
        GroupingRules::default()
    }

    fn node(node_type: &str, name: &str) -> NodeRecord {
        NodeRecord::new(node_type, name)
    }

    #[test]
    fn usage_frequency_checks_essential_first() {
        let r = rules();
        assert_eq!(usage_frequency("n8n-nodes-base.httpRequest", &r), UsageFrequency::Essential);
        assert_eq!(usage_frequency("n8n-nodes-base.slack", &r), UsageFrequency::Common);
        assert_eq!(usage_frequency("n8n-nodes-base.zendesk", &r), UsageFrequency::Specialized);
        // `if` only matches the exact base node, not every type containing it.
        assert_eq!(usage_frequency("n8n-nodes-base.shopify", &r), UsageFrequency::Specialized);
        assert_eq!(usage_frequency("n8n-nodes-base.if", &r), UsageFrequency::Essential);
    }

    #[test]
    fn node_can_match_several_groups() {
        let r = rules();
        let record = node("n8n-nodes-base.gmailTrigger", "Gmail Trigger");
        let groups = functional_groups(&record, "gmailtrigger", &r);
        assert_eq!(groups, vec!["communication".to_string(), "automation".to_string()]);
    }

    #[test]
    fn flags_match_groups() {
        let r = rules();
        let mut record = node("acme.thing", "Thing");
        record.flags.is_ai_tool = true;
        assert_eq!(functional_groups(&record, "thing", &r), vec!["ai".to_string()]);
    }

    #[test]
    fn unmatched_node_forced_into_utility() {
        let r = rules();
        let record = node("acme.qwerty", "Qwerty");
        assert_eq!(functional_groups(&record, "qwerty", &r), vec!["utility".to_string()]);
    }

    #[test]
    fn structural_tags_from_flags() {
        let mut record = node("x.y", "Y");
        record.flags.is_trigger = true;
        record.flags.has_credentials = true;
        record.flags.has_operations = true;
        assert_eq!(
            structural_tags(&record),
            vec![NodeTag::Trigger, NodeTag::RequiresAuth, NodeTag::MultiOperation]
        );
    }

    #[test]
    fn related_nodes_capped_and_ordered() {
        let records: Vec<NodeRecord> = (0..8)
            .map(|i| node(&format!("x.slack{i}"), &format!("Slack {i}")))
            .collect();
        let out = group_nodes(&records, &rules(), &IdentityConfig::default());
        let related = &out.nodes[0].related;
        assert_eq!(related.len(), MAX_RELATED);
        assert_eq!(related[0], "x.slack1");
        assert!(!related.contains(&"x.slack0".to_string()));
    }

    #[test]
    fn unrelated_nodes_have_no_related() {
        let records = vec![
            node("n8n-nodes-base.slack", "Slack"),
            node("n8n-nodes-base.postgres", "Postgres"),
        ];
        let out = group_nodes(&records, &rules(), &IdentityConfig::default());
        assert!(out.nodes[0].related.is_empty());
        assert!(out.nodes[1].related.is_empty());
    }

    #[test]
    fn relationships_need_both_endpoints() {
        let records = vec![
            node("n8n-nodes-base.postgres", "Postgres"),
            node("n8n-nodes-base.mySql", "MySQL"),
            node("n8n-nodes-base.httpRequest", "HTTP Request"),
        ];
        let out = group_nodes(&records, &rules(), &IdentityConfig::default());
        assert_eq!(out.relationships.len(), 1);
        let rel = &out.relationships[0];
        assert_eq!(rel.source, "n8n-nodes-base.postgres");
        assert_eq!(rel.target, "n8n-nodes-base.mySql");
        assert_eq!(rel.kind, RelationshipKind::Alternative);
        assert!(!rel.rationale.is_empty());
    }

    #[test]
    fn relationship_prefers_exact_endpoint() {
        let records = vec![
            node("@n8n/n8n-nodes-langchain.toolCode", "Code Tool"),
            node("n8n-nodes-base.code", "Code"),
            node("n8n-nodes-base.function", "Function"),
        ];
        let out = group_nodes(&records, &rules(), &IdentityConfig::default());
        let rel = out
            .relationships
            .iter()
            .find(|r| r.kind == RelationshipKind::Successor)
            .expect("function -> code relationship");
        assert_eq!(rel.target, "n8n-nodes-base.code");
    }
}
