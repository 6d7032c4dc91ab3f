//! Master index (`INDEX.md`).
//!
//! Ties tiers, categories and merged-file positions together in one
//! navigation document. Every count in the statistics section is recomputed
//! from the rows actually emitted above it.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use nodedocs_markdown::{code_span, escape_cell, table, truncate};
use nodedocs_shared::{
    AuxiliaryPackage, CategoryConfig, CorpusNode, IndividualFileRef, MergedFileInfo, NodePosition,
    Relationship, Tier,
};

use crate::packager::canonical_order;

/// File name of the master index at the corpus root.
pub const INDEX_FILE: &str = "INDEX.md";

const DESCRIPTION_MAX: usize = 100;

/// Inputs for [`build_master_index`].
#[derive(Debug, Clone, Copy)]
pub struct IndexInput<'a> {
    pub high: &'a [CorpusNode],
    pub low: &'a [CorpusNode],
    pub individual: &'a [IndividualFileRef],
    pub merged: &'a [MergedFileInfo],
    pub categories: &'a CategoryConfig,
    pub relationships: &'a [Relationship],
    pub uncategorized: &'a [String],
    pub auxiliary: &'a [AuxiliaryPackage],
}

/// A high-priority row: the node and its file.
struct HighRow<'a> {
    node: &'a CorpusNode,
    path: &'a str,
}

/// A merged row: the node, its file and its window.
struct LowRow<'a> {
    node: &'a CorpusNode,
    path: String,
    position: &'a NodePosition,
    file_order: usize,
}

/// Build the master index document.
#[instrument(skip_all, fields(high = input.high.len(), low = input.low.len()))]
pub fn build_master_index(input: &IndexInput<'_>) -> String {
    let present = input.high.iter().chain(input.low).map(|n| n.category.as_str());
    let order = canonical_order(input.categories, present);

    let high_rows = collect_high_rows(input, &order);
    let low_rows = collect_low_rows(input, &order);

    let high_count: usize = high_rows.iter().map(|(_, rows)| rows.len()).sum();
    let low_count: usize = low_rows.iter().map(|(_, rows)| rows.len()).sum();

    let mut out: Vec<String> = vec!["# Node Documentation Index".to_string(), String::new()];
    out.push(format!(
        "{} nodes documented: {high_count} in individual files and {low_count} in {} merged files.",
        high_count + low_count,
        input.merged.len()
    ));
    out.push(String::new());

    out.push("## How to Read Merged Files".to_string());
    out.push(String::new());
    out.push(
        "Merged files hold many nodes each. Every merged-node row lists the file, the 1-based \
         start line and the line count of one node. Read lines `Start` through \
         `Start + Lines - 1` to get exactly that node's section without loading the rest of \
         the file. The same offsets are published in `positions.json`."
            .to_string(),
    );
    out.push(String::new());

    if high_count > 0 {
        out.push("## High-Priority Nodes".to_string());
        out.push(String::new());
        for (category, rows) in &high_rows {
            if rows.is_empty() {
                continue;
            }
            out.push(format!("### {}", input.categories.display_name(category)));
            out.push(String::new());
            let cells: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    vec![
                        escape_cell(&row.node.record.display_name),
                        code_span(&row.node.record.node_type),
                        format!("[{0}]({0})", row.path),
                        description_cell(row.node.record.description.as_deref()),
                    ]
                })
                .collect();
            out.extend(table(&["Name", "Identity", "File", "Description"], &cells));
            out.push(String::new());
        }
    }

    if low_count > 0 {
        out.push("## Merged Nodes".to_string());
        out.push(String::new());
        for (category, rows) in &low_rows {
            if rows.is_empty() {
                continue;
            }
            out.push(format!("### {}", input.categories.display_name(category)));
            out.push(String::new());
            let cells: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    vec![
                        escape_cell(&row.node.record.display_name),
                        code_span(&row.node.record.node_type),
                        format!("[{0}]({0}#{1})", row.path, row.position.anchor),
                        row.position.start_line.to_string(),
                        row.position.line_count.to_string(),
                        description_cell(row.node.record.description.as_deref()),
                    ]
                })
                .collect();
            out.extend(table(
                &["Name", "Identity", "File", "Start", "Lines", "Description"],
                &cells,
            ));
            out.push(String::new());
        }
    }

    let emitted: Vec<&CorpusNode> = high_rows
        .iter()
        .flat_map(|(_, rows)| rows.iter().map(|r| r.node))
        .chain(low_rows.iter().flat_map(|(_, rows)| rows.iter().map(|r| r.node)))
        .collect();

    push_group_section(&mut out, &emitted, input.categories);
    push_relationship_section(&mut out, input.relationships);
    push_auxiliary_section(&mut out, input.auxiliary);

    if !input.uncategorized.is_empty() {
        out.push("## Uncategorized Nodes".to_string());
        out.push(String::new());
        out.push(format!(
            "{} nodes matched no category rule and are not packaged:",
            input.uncategorized.len()
        ));
        out.push(String::new());
        for identity in input.uncategorized {
            out.push(format!("- {}", code_span(identity)));
        }
        out.push(String::new());
    }

    push_statistics(&mut out, input, &emitted, &high_rows, &low_rows);

    debug!(rows = emitted.len(), "master index built");

    let mut content = out.join("\n").trim_end().to_string();
    content.push('\n');
    content
}

fn collect_high_rows<'a>(
    input: &IndexInput<'a>,
    order: &[String],
) -> Vec<(String, Vec<HighRow<'a>>)> {
    let paths: HashMap<&str, &str> = input
        .individual
        .iter()
        .map(|f| (f.node_type.as_str(), f.path.as_str()))
        .collect();

    order
        .iter()
        .map(|category| {
            let mut rows: Vec<HighRow<'a>> = input
                .high
                .iter()
                .filter(|n| n.category == *category)
                .filter_map(|node| {
                    paths
                        .get(node.record.node_type.as_str())
                        .map(|path| HighRow { node, path: *path })
                })
                .collect();
            rows.sort_by(|a, b| {
                b.node
                    .score
                    .total_cmp(&a.node.score)
                    .then_with(|| a.node.rank.cmp(&b.node.rank))
            });
            (category.clone(), rows)
        })
        .collect()
}

fn collect_low_rows<'a>(
    input: &IndexInput<'a>,
    order: &[String],
) -> Vec<(String, Vec<LowRow<'a>>)> {
    order
        .iter()
        .map(|category| {
            let files: Vec<&MergedFileInfo> = input
                .merged
                .iter()
                .filter(|m| m.category == *category)
                .collect();

            let mut rows: Vec<LowRow<'a>> = input
                .low
                .iter()
                .filter(|n| n.category == *category)
                .filter_map(|node| {
                    files.iter().copied().enumerate().find_map(|(file_order, info)| {
                        info.positions
                            .iter()
                            .find(|p| p.node_type == node.record.node_type)
                            .map(|position| LowRow {
                                node,
                                path: info.relative_path(),
                                position,
                                file_order,
                            })
                    })
                })
                .collect();
            rows.sort_by_key(|r| (r.file_order, r.position.start_line));
            (category.clone(), rows)
        })
        .collect()
}

fn push_group_section(out: &mut Vec<String>, nodes: &[&CorpusNode], categories: &CategoryConfig) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in nodes {
        for group in &node.groups {
            *counts.entry(group.as_str()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        return;
    }

    let rules = &categories.grouping;
    let mut order: Vec<&str> = rules
        .functional_groups
        .iter()
        .map(|r| r.tag.as_str())
        .chain(std::iter::once(rules.fallback_group.as_str()))
        .collect();
    order.dedup();
    for key in counts.keys() {
        if !order.contains(key) {
            order.push(*key);
        }
    }

    out.push("## Functional Groups".to_string());
    out.push(String::new());
    let rows: Vec<Vec<String>> = order
        .iter()
        .filter_map(|tag| counts.get(tag).map(|n| vec![tag.to_string(), n.to_string()]))
        .collect();
    out.extend(table(&["Group", "Nodes"], &rows));
    out.push(String::new());
}

fn push_relationship_section(out: &mut Vec<String>, relationships: &[Relationship]) {
    if relationships.is_empty() {
        return;
    }
    out.push("## Relationships".to_string());
    out.push(String::new());
    let rows: Vec<Vec<String>> = relationships
        .iter()
        .map(|r| {
            vec![
                code_span(&r.source),
                code_span(&r.target),
                r.kind.as_str().to_string(),
                escape_cell(&r.rationale),
            ]
        })
        .collect();
    out.extend(table(&["Source", "Target", "Kind", "Rationale"], &rows));
    out.push(String::new());
}

fn push_auxiliary_section(out: &mut Vec<String>, packages: &[AuxiliaryPackage]) {
    if packages.is_empty() {
        return;
    }
    out.push("## Auxiliary Packages".to_string());
    out.push(String::new());
    for package in packages {
        let name = match &package.url {
            Some(url) => format!("[{}]({url})", package.name),
            None => package.name.clone(),
        };
        let mut line = format!("- {name}");
        if !package.description.trim().is_empty() {
            line.push_str(&format!(": {}", escape_cell(&package.description)));
        }
        if package.node_count > 0 {
            line.push_str(&format!(" ({} nodes)", package.node_count));
        }
        out.push(line);
    }
    out.push(String::new());
}

fn push_statistics(
    out: &mut Vec<String>,
    input: &IndexInput<'_>,
    emitted: &[&CorpusNode],
    high_rows: &[(String, Vec<HighRow<'_>>)],
    low_rows: &[(String, Vec<LowRow<'_>>)],
) {
    let high_count: usize = high_rows.iter().map(|(_, r)| r.len()).sum();
    let low_count: usize = low_rows.iter().map(|(_, r)| r.len()).sum();
    let merged_files: usize = {
        let mut files: Vec<&str> = low_rows
            .iter()
            .flat_map(|(_, rows)| rows.iter().map(|r| r.path.as_str()))
            .collect();
        files.sort_unstable();
        files.dedup();
        files.len()
    };
    let tier_count = |tier: Tier| emitted.iter().filter(|n| n.tier == tier).count();

    out.push("## Statistics".to_string());
    out.push(String::new());
    let mut rows = vec![
        vec!["Total nodes".to_string(), emitted.len().to_string()],
        vec!["Individual files".to_string(), high_count.to_string()],
        vec!["Merged nodes".to_string(), low_count.to_string()],
        vec!["Merged files".to_string(), merged_files.to_string()],
    ];
    for tier in Tier::ALL {
        rows.push(vec![format!("Tier: {tier}"), tier_count(tier).to_string()]);
    }
    rows.push(vec![
        "Uncategorized".to_string(),
        input.uncategorized.len().to_string(),
    ]);
    out.extend(table(&["Metric", "Count"], &rows));
    out.push(String::new());

    out.push("### By Category".to_string());
    out.push(String::new());
    let category_rows: Vec<Vec<String>> = high_rows
        .iter()
        .zip(low_rows)
        .filter(|((_, h), (_, l))| !h.is_empty() || !l.is_empty())
        .map(|((category, h), (_, l))| {
            vec![
                escape_cell(input.categories.display_name(category)),
                h.len().to_string(),
                l.len().to_string(),
                (h.len() + l.len()).to_string(),
            ]
        })
        .collect();
    out.extend(table(&["Category", "Individual", "Merged", "Total"], &category_rows));
    out.push(String::new());
}

fn description_cell(description: Option<&str>) -> String {
    description
        .map(|d| escape_cell(&truncate(d.trim(), DESCRIPTION_MAX)))
        .unwrap_or_default()
}
