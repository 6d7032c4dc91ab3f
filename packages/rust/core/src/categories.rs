//! Category classification.
//!
//! Builds a type-name lookup from the category document once, then assigns
//! each node a category, optional subcategory and priority. Nodes without a
//! matching rule are collected by identity for manual triage.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use nodedocs_shared::{CategorizedNode, CategoryConfig, NodeRecord, type_segment};

/// Where a type name belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub category: String,
    pub subcategory: Option<String>,
    pub priority: u32,
}

/// Immutable type name to category table.
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    by_type: HashMap<String, CategoryMatch>,
}

impl CategoryLookup {
    /// Walk the configuration once. The first occurrence of a type name wins.
    pub fn from_config(config: &CategoryConfig) -> Self {
        let mut by_type: HashMap<String, CategoryMatch> = HashMap::new();

        for category in &config.categories {
            let flat = category.nodes.iter().map(|n| (n, None));
            let nested = category
                .subcategories
                .iter()
                .flat_map(|(sub, names)| names.iter().map(move |n| (n, Some(sub.clone()))));

            for (name, subcategory) in flat.chain(nested) {
                let key = type_segment(name).to_string();
                if let Some(existing) = by_type.get(&key) {
                    debug!(
                        type_name = %key,
                        kept = %existing.category,
                        ignored = %category.key,
                        "type listed in more than one category"
                    );
                    continue;
                }
                by_type.insert(
                    key,
                    CategoryMatch {
                        category: category.key.clone(),
                        subcategory,
                        priority: category.priority,
                    },
                );
            }
        }

        Self { by_type }
    }

    pub fn get(&self, type_name: &str) -> Option<&CategoryMatch> {
        self.by_type.get(type_name)
    }
}

/// Output of [`classify`].
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// The first `top_n` categorized nodes in priority order.
    pub top_nodes: Vec<CategorizedNode>,
    /// Every other categorized node, same order.
    pub remaining_nodes: Vec<CategorizedNode>,
    /// Raw identities that matched no rule, in input order.
    pub uncategorized: Vec<String>,
}

impl Classification {
    /// Top and remaining nodes, in priority order.
    pub fn all(&self) -> impl Iterator<Item = &CategorizedNode> {
        self.top_nodes.iter().chain(self.remaining_nodes.iter())
    }
}

/// Classify nodes, sort by (priority, display name) and split at `top_n`.
#[instrument(skip_all, fields(node_count = records.len(), top_n))]
pub fn classify(records: &[NodeRecord], lookup: &CategoryLookup, top_n: usize) -> Classification {
    let mut categorized: Vec<CategorizedNode> = Vec::new();
    let mut uncategorized: Vec<String> = Vec::new();

    for record in records {
        match lookup.get(record.type_name()) {
            Some(m) => categorized.push(CategorizedNode {
                record: record.clone(),
                category: m.category.clone(),
                subcategory: m.subcategory.clone(),
                priority: m.priority,
                is_top: false,
            }),
            None => uncategorized.push(record.node_type.clone()),
        }
    }

    categorized.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.record.display_name.cmp(&b.record.display_name))
            .then_with(|| a.record.node_type.cmp(&b.record.node_type))
    });

    let split = top_n.min(categorized.len());
    let remaining_nodes = categorized.split_off(split);
    let mut top_nodes = categorized;
    for node in &mut top_nodes {
        node.is_top = true;
    }

    info!(
        top = top_nodes.len(),
        remaining = remaining_nodes.len(),
        uncategorized = uncategorized.len(),
        "classification complete"
    );

    Classification {
        top_nodes,
        remaining_nodes,
        uncategorized,
    }
}

/// Group items by a key, keeping groups in first-seen order and items in
/// insertion order within each group.
pub fn group_by_key<'a, T, F>(items: &'a [T], key: F) -> Vec<(String, Vec<&'a T>)>
where
    F: Fn(&T) -> String,
{
    let mut groups: Vec<(String, Vec<&'a T>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for item in items {
        let k = key(item);
        match slots.get(&k) {
            Some(&slot) => groups[slot].1.push(item),
            None => {
                slots.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }

    groups
}

/// Group by `category`, or `category.subcategory` when a subcategory is set.
pub fn group_by_category(nodes: &[CategorizedNode]) -> Vec<(String, Vec<&CategorizedNode>)> {
    group_by_key(nodes, CategorizedNode::group_key)
}
