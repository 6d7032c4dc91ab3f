//! Tiered packaging.
//!
//! High-priority nodes become one document each under `{category}/`. The
//! remaining nodes of a category are packed into merged files of at most
//! [`MERGED_FILE_CAP`] nodes, and every node's exact line window inside its
//! merged file is recorded as a [`NodePosition`].
//!
//! Line accounting is done on the final line vector: every node body is
//! rendered and normalized before the file is assembled, and a node's start
//! line is the length of the vector before its block plus one. The published
//! offsets therefore match the file byte-for-byte as written.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::{debug, info, instrument, warn};

use nodedocs_markdown::{
    AnchorSet, anchor_for, demote_headings, escape_cell, render_node, truncate,
};
use nodedocs_shared::{
    CategoryConfig, CorpusNode, IndividualFileRef, MergedFileInfo, NodeDocsError, NodePosition,
    Result,
};

use crate::categories::group_by_key;
use crate::output::CorpusWriter;
use crate::pipeline::ProgressReporter;

/// Most nodes placed in one merged file.
pub const MERGED_FILE_CAP: usize = 100;

/// Lines between two node blocks in a merged file.
pub const SEPARATOR_LINES: usize = 3;

const SEPARATOR: [&str; SEPARATOR_LINES] = ["", "---", ""];
const TOC_HEADING: &str = "Table of Contents";
const README_DESCRIPTION_MAX: usize = 120;

// ---------------------------------------------------------------------------
// Renderer seam
// ---------------------------------------------------------------------------

/// Turns one node into a self-contained Markdown document.
pub trait NodeRenderer {
    fn render(&self, node: &CorpusNode) -> Result<String>;
}

/// The default renderer from `nodedocs-markdown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl NodeRenderer for MarkdownRenderer {
    fn render(&self, node: &CorpusNode) -> Result<String> {
        Ok(render_node(node))
    }
}

// ---------------------------------------------------------------------------
// Config / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PackagerConfig {
    /// Most nodes per merged file. Must be at least 1.
    pub merged_file_cap: usize,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            merged_file_cap: MERGED_FILE_CAP,
        }
    }
}

/// Everything the index builder needs from packaging.
#[derive(Debug, Clone, Default)]
pub struct PackageResult {
    pub individual: Vec<IndividualFileRef>,
    pub merged: Vec<MergedFileInfo>,
    /// Node types dropped because rendering or writing failed.
    pub skipped: Vec<String>,
    pub readme_count: usize,
}

/// A merged file assembled in memory, ready to write.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub content: String,
    pub info: MergedFileInfo,
}

// ---------------------------------------------------------------------------
// Packaging
// ---------------------------------------------------------------------------

/// Package high- and low-priority nodes category by category.
///
/// Per-node render or write failures are logged and the node is skipped;
/// only an invalid config aborts.
#[instrument(skip_all, fields(high = high.len(), low = low.len()))]
pub fn package(
    high: &[CorpusNode],
    low: &[CorpusNode],
    categories: &CategoryConfig,
    renderer: &dyn NodeRenderer,
    config: &PackagerConfig,
    writer: &mut CorpusWriter,
    progress: &dyn ProgressReporter,
) -> Result<PackageResult> {
    if config.merged_file_cap == 0 {
        return Err(NodeDocsError::validation("merged_file_cap must be at least 1"));
    }

    let mut result = PackageResult::default();
    let total = high.len() + low.len();
    let mut done = 0usize;

    let present = high.iter().chain(low).map(|n| n.category.as_str());
    for category in canonical_order(categories, present) {
        let title = categories.display_name(&category).to_string();

        // Individual files
        let mut written_high: Vec<&CorpusNode> = Vec::new();
        for node in high.iter().filter(|n| n.category == category) {
            done += 1;
            match write_individual(node, renderer, writer) {
                Ok(file_ref) => {
                    progress.node_written(&file_ref.path, done, total);
                    result.individual.push(file_ref);
                    written_high.push(node);
                }
                Err(e) => {
                    warn!(node = %node.record.node_type, error = %e, "skipping node");
                    result.skipped.push(node.record.node_type.clone());
                }
            }
        }

        // Merged files: render everything first so failed nodes never reach a TOC.
        let mut pending: Vec<&CorpusNode> =
            low.iter().filter(|n| n.category == category).collect();
        pending.sort_by(|a, b| merge_order(a, b));

        let mut rendered: Vec<(&CorpusNode, String)> = Vec::with_capacity(pending.len());
        for node in pending {
            match renderer.render(node) {
                Ok(body) => rendered.push((node, body)),
                Err(e) => {
                    done += 1;
                    warn!(node = %node.record.node_type, error = %e, "skipping node");
                    result.skipped.push(node.record.node_type.clone());
                }
            }
        }

        let parts = split_into_parts(rendered, config.merged_file_cap);
        let part_total = parts.len();
        let mut category_merged: Vec<MergedFileInfo> = Vec::new();

        for (index, entries) in parts.into_iter().enumerate() {
            let part = (part_total > 1).then_some(index + 1);
            let file_name = merged_file_name(&category, part);
            let file_title = match part {
                Some(n) => format!("{title} Nodes (Part {n} of {part_total})"),
                None => format!("{title} Nodes"),
            };

            let doc = build_merged_document(&category, &file_title, &file_name, &entries);
            let path = doc.info.relative_path();
            done += entries.len();

            match writer.write(&path, &doc.content) {
                Ok(()) => {
                    debug!(path = %path, nodes = doc.info.node_count, "merged file written");
                    progress.node_written(&path, done, total);
                    category_merged.push(doc.info);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping merged file");
                    result
                        .skipped
                        .extend(entries.iter().map(|(n, _)| n.record.node_type.clone()));
                }
            }
        }

        if !written_high.is_empty() || !category_merged.is_empty() {
            let readme =
                build_category_readme(&category, categories, &written_high, &category_merged);
            let path = format!("{category}/README.md");
            match writer.write(&path, &readme) {
                Ok(()) => result.readme_count += 1,
                Err(e) => warn!(path = %path, error = %e, "failed to write category README"),
            }
        }

        result.merged.extend(category_merged);
    }

    info!(
        individual = result.individual.len(),
        merged = result.merged.len(),
        skipped = result.skipped.len(),
        "packaging complete"
    );

    Ok(result)
}

fn write_individual(
    node: &CorpusNode,
    renderer: &dyn NodeRenderer,
    writer: &mut CorpusWriter,
) -> Result<IndividualFileRef> {
    let stem = node.record.file_stem();
    if is_reserved_stem(&node.category, &stem) {
        return Err(NodeDocsError::validation(format!(
            "file name {stem}.md is reserved in category {}",
            node.category
        )));
    }

    let body = renderer.render(node)?;
    let path = individual_path(node);

    let mut content = body.replace("\r\n", "\n").trim_end().to_string();
    content.push('\n');
    writer.write(&path, &content)?;

    Ok(IndividualFileRef {
        node_type: node.record.node_type.clone(),
        display_name: node.record.heading_name(),
        path,
        category: node.category.clone(),
        description: node.record.description.clone(),
    })
}

// ---------------------------------------------------------------------------
// Naming and ordering
// ---------------------------------------------------------------------------

/// `{category}/{stem}.md` for a high-priority node.
pub fn individual_path(node: &CorpusNode) -> String {
    format!("{}/{}.md", node.category, node.record.file_stem())
}

/// True when an individual file with this stem would land on the category
/// README or on one of its merged files.
pub fn is_reserved_stem(category: &str, stem: &str) -> bool {
    let stem = stem.to_ascii_lowercase();
    let merged = format!("{}-merged", category.to_ascii_lowercase());
    if stem == "readme" || stem == merged {
        return true;
    }
    stem.strip_prefix(&merged)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// `{category}-merged.md`, or `{category}-merged-{n}.md` for numbered parts.
pub fn merged_file_name(category: &str, part: Option<usize>) -> String {
    match part {
        Some(n) => format!("{category}-merged-{n}.md"),
        None => format!("{category}-merged.md"),
    }
}

/// Split into consecutive chunks of at most `cap` items.
pub fn split_into_parts<T>(items: Vec<T>, cap: usize) -> Vec<Vec<T>> {
    let cap = cap.max(1);
    let mut parts = Vec::new();
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        parts.push(iter.by_ref().take(cap).collect());
    }
    parts
}

/// Configured categories in declaration order, then unknown keys alphabetically.
pub fn canonical_order<'a>(
    config: &CategoryConfig,
    present: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let present: BTreeSet<&str> = present.into_iter().collect();

    let mut order: Vec<String> = config
        .categories
        .iter()
        .map(|c| c.key.as_str())
        .filter(|k| present.contains(k))
        .map(String::from)
        .collect();

    for key in &present {
        if config.category(key).is_none() {
            order.push((*key).to_string());
        }
    }
    order
}

/// Alphabetical by display name, case-insensitive, with stable tie-breaks.
fn merge_order(a: &CorpusNode, b: &CorpusNode) -> Ordering {
    a.record
        .display_name
        .to_lowercase()
        .cmp(&b.record.display_name.to_lowercase())
        .then_with(|| a.record.display_name.cmp(&b.record.display_name))
        .then_with(|| a.record.node_type.cmp(&b.record.node_type))
}

// ---------------------------------------------------------------------------
// Merged file assembly
// ---------------------------------------------------------------------------

/// Normalize a rendered body into the lines of one merged-file block.
///
/// Headings are pushed down one level and the block always starts with
/// `## {display_name}`. Leading and trailing blank lines are dropped.
pub fn merged_block(display_name: &str, rendered: &str) -> Vec<String> {
    let normalized = rendered.replace("\r\n", "\n");
    let demoted = demote_headings(&normalized, 1);

    let mut lines: Vec<String> = demoted.lines().map(|l| l.trim_end().to_string()).collect();
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let heading = format!(
        "## {}",
        display_name.split_whitespace().collect::<Vec<_>>().join(" ")
    );
    let first = lines
        .first()
        .map(|l| (*l == heading, l.starts_with("## ")));
    match first {
        Some((true, _)) => {}
        Some((false, true)) => lines[0] = heading,
        Some((false, false)) => {
            lines.insert(0, String::new());
            lines.insert(0, heading);
        }
        None => lines.push(heading),
    }

    lines
}

/// Assemble one merged file from already-rendered, already-sorted entries.
pub fn build_merged_document(
    category: &str,
    title: &str,
    file_name: &str,
    entries: &[(&CorpusNode, String)],
) -> MergedDocument {
    let blocks: Vec<Vec<String>> = entries
        .iter()
        .map(|(node, body)| merged_block(&node.record.heading_name(), body))
        .collect();

    // Anchors are handed out over every heading in document order, so a node
    // heading never takes a slug that an earlier section heading already owns.
    let mut anchors = AnchorSet::new();
    anchors.reserve(&anchor_for(title));
    anchors.reserve(&anchor_for(TOC_HEADING));
    let node_anchors: Vec<String> = blocks
        .iter()
        .zip(entries)
        .map(|(block, (node, _))| {
            let anchor = anchors.unique(&node.record.heading_name());
            for heading in section_headings(&block[1..]) {
                anchors.unique(heading);
            }
            anchor
        })
        .collect();

    let mut lines: Vec<String> = vec![
        format!("# {title}"),
        String::new(),
        format!(
            "{} nodes in alphabetical order. Line ranges for each node are listed in INDEX.md.",
            entries.len()
        ),
        String::new(),
        format!("## {TOC_HEADING}"),
        String::new(),
    ];
    for ((node, _), anchor) in entries.iter().zip(&node_anchors) {
        lines.push(format!("- [{}](#{anchor})", node.record.heading_name()));
    }
    lines.extend(SEPARATOR.iter().map(|s| s.to_string()));

    let mut positions = Vec::with_capacity(entries.len());
    let placed = entries.iter().zip(blocks).zip(node_anchors);
    for (i, (((node, _), block), anchor)) in placed.enumerate() {
        if i > 0 {
            lines.extend(SEPARATOR.iter().map(|s| s.to_string()));
        }

        let start_line = lines.len() + 1;
        lines.extend(block);
        let end_line = lines.len();

        positions.push(NodePosition {
            node_type: node.record.node_type.clone(),
            display_name: node.record.heading_name(),
            file_name: file_name.to_string(),
            start_line,
            end_line,
            line_count: end_line - start_line + 1,
            anchor,
            description: node.record.description.clone().filter(|d| !d.trim().is_empty()),
            usage_percentage: Some(node.usage_percentage()),
        });
    }

    let mut content = lines.join("\n");
    content.push('\n');

    MergedDocument {
        content,
        info: MergedFileInfo {
            file_name: file_name.to_string(),
            category: category.to_string(),
            node_count: positions.len(),
            positions,
        },
    }
}

/// Text of every ATX heading outside fenced code blocks.
fn section_headings(lines: &[String]) -> Vec<&str> {
    let mut in_code_block = false;
    let mut headings = Vec::new();
    for line in lines {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            continue;
        }
        let hashes = line.bytes().take_while(|&b| b == b'#').count();
        if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
            headings.push(line[hashes..].trim());
        }
    }
    headings
}

// ---------------------------------------------------------------------------
// Category README
// ---------------------------------------------------------------------------

/// Per-category navigation page.
///
/// High-priority nodes are linked directly (grouped by subcategory). Merged
/// nodes get a single link when they fit in one file, otherwise one link per
/// part plus a flat alphabetical list naming each node's part.
pub fn build_category_readme(
    category: &str,
    categories: &CategoryConfig,
    high: &[&CorpusNode],
    merged: &[MergedFileInfo],
) -> String {
    let definition = categories.category(category);
    let title = categories.display_name(category);
    let mut out: Vec<String> = vec![format!("# {title} Nodes"), String::new()];

    if let Some(description) = definition.map(|d| d.description.trim()).filter(|d| !d.is_empty()) {
        out.push(description.to_string());
        out.push(String::new());
    }

    if !high.is_empty() {
        out.push("## Individual Nodes".to_string());
        out.push(String::new());

        let by_subcategory = group_by_key(high, |n| n.subcategory.clone().unwrap_or_default());
        for (subcategory, nodes) in by_subcategory {
            if !subcategory.is_empty() {
                out.push(format!("### {}", title_case(&subcategory)));
                out.push(String::new());
            }
            for node in nodes {
                out.push(link_line(
                    &node.record.heading_name(),
                    &format!("{}.md", node.record.file_stem()),
                    node.record.description.as_deref(),
                ));
            }
            out.push(String::new());
        }
    }

    let merged_total: usize = merged.iter().map(|m| m.node_count).sum();
    match merged {
        [] => {}
        [single] => {
            out.push("## Additional Nodes".to_string());
            out.push(String::new());
            out.push(format!(
                "{merged_total} more nodes are collected in [`{0}`]({0}).",
                single.file_name
            ));
            out.push(String::new());
        }
        parts => {
            out.push("## Additional Nodes".to_string());
            out.push(String::new());
            out.push(format!(
                "{merged_total} more nodes are split across {} files:",
                parts.len()
            ));
            out.push(String::new());
            for part in parts {
                let first = part.positions.first().map_or("", |p| p.display_name.as_str());
                let last = part.positions.last().map_or("", |p| p.display_name.as_str());
                out.push(format!(
                    "- [`{0}`]({0}): {first} to {last} ({1} nodes)",
                    part.file_name, part.node_count
                ));
            }
            out.push(String::new());

            out.push("### All Additional Nodes".to_string());
            out.push(String::new());
            let mut names: Vec<(usize, &NodePosition)> = parts
                .iter()
                .enumerate()
                .flat_map(|(i, part)| part.positions.iter().map(move |p| (i + 1, p)))
                .collect();
            names.sort_by(|(_, a), (_, b)| {
                a.display_name
                    .to_lowercase()
                    .cmp(&b.display_name.to_lowercase())
                    .then_with(|| a.node_type.cmp(&b.node_type))
            });
            for (part_number, position) in names {
                out.push(format!(
                    "- [{}]({}#{}) (part {part_number})",
                    position.display_name, position.file_name, position.anchor
                ));
            }
            out.push(String::new());
        }
    }

    let mut content = out.join("\n").trim_end().to_string();
    content.push('\n');
    content
}

fn link_line(name: &str, target: &str, description: Option<&str>) -> String {
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => format!(
            "- [{name}]({target}): {}",
            escape_cell(&truncate(d, README_DESCRIPTION_MAX))
        ),
        None => format!("- [{name}]({target})"),
    }
}

/// `vector_stores` -> `Vector Stores`.
fn title_case(key: &str) -> String {
    key.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use nodedocs_shared::{FactorScores, NodeProperty, NodeRecord, Tier, UsageFrequency};

    use crate::pipeline::SilentProgress;
    use crate::verify::check_merged_file;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("nodedocs-packager-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn corpus_node(node_type: &str, name: &str, category: &str) -> CorpusNode {
        CorpusNode {
            record: NodeRecord::new(node_type, name),
            category: category.to_string(),
            subcategory: None,
            priority: 1,
            is_top: false,
            factors: FactorScores::default(),
            score: 0.0,
            rank: 1,
            tier: Tier::Specialized,
            usage: UsageFrequency::Specialized,
            groups: vec!["utility".to_string()],
            related: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Nodes whose rendered bodies differ in length.
    fn varied_nodes(count: usize, category: &str) -> Vec<CorpusNode> {
        (0..count)
            .map(|i| {
                let mut node = corpus_node(
                    &format!("n8n-nodes-base.node{i:03}"),
                    &format!("Node {i:03}"),
                    category,
                );
                if i % 2 == 0 {
                    node.record.description = Some(format!("Description for node {i}"));
                }
                node.record.properties = (0..i % 4)
                    .map(|p| NodeProperty {
                        name: format!("prop{p}"),
                        ..NodeProperty::default()
                    })
                    .collect();
                node
            })
            .collect()
    }

    fn categories() -> CategoryConfig {
        CategoryConfig::builtin().unwrap()
    }

    struct FailOn(&'static str);

    impl NodeRenderer for FailOn {
        fn render(&self, node: &CorpusNode) -> Result<String> {
            if node.record.display_name == self.0 {
                Err(NodeDocsError::render(&node.record.node_type, "boom"))
            } else {
                Ok(render_node(node))
            }
        }
    }

    fn run(
        high: &[CorpusNode],
        low: &[CorpusNode],
        renderer: &dyn NodeRenderer,
        root: &PathBuf,
    ) -> PackageResult {
        let mut writer = CorpusWriter::create(root).unwrap();
        package(
            high,
            low,
            &categories(),
            renderer,
            &PackagerConfig::default(),
            &mut writer,
            &SilentProgress,
        )
        .unwrap()
    }

    #[test]
    fn split_250_into_100_100_50() {
        let parts = split_into_parts((0..250).collect::<Vec<_>>(), 100);
        let sizes: Vec<usize> = parts.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert!(split_into_parts(Vec::<u8>::new(), 100).is_empty());
    }

    #[test]
    fn merged_file_names() {
        assert_eq!(merged_file_name("core", None), "core-merged.md");
        assert_eq!(merged_file_name("core", Some(2)), "core-merged-2.md");
    }

    #[test]
    fn merged_block_demotes_and_keeps_heading() {
        let block = merged_block("Slack", "# Slack\n\nbody\n\n## Operations\n\n");
        assert_eq!(block, vec!["## Slack", "", "body", "", "### Operations"]);

        let bare = merged_block("Slack", "just text");
        assert_eq!(bare, vec!["## Slack", "", "just text"]);

        let empty = merged_block("Slack", "\n\n");
        assert_eq!(empty, vec!["## Slack"]);
    }

    #[test]
    fn positions_match_written_lines() {
        let nodes = varied_nodes(12, "core");
        let mut sorted: Vec<&CorpusNode> = nodes.iter().collect();
        sorted.sort_by(|a, b| merge_order(a, b));
        let entries: Vec<(&CorpusNode, String)> =
            sorted.into_iter().map(|n| (n, render_node(n))).collect();

        let doc = build_merged_document("core", "Core Nodes", "core-merged.md", &entries);
        let lines: Vec<&str> = doc.content.lines().collect();

        for pair in doc.info.positions.windows(2) {
            assert_eq!(pair[0].end_line + 1 + SEPARATOR_LINES, pair[1].start_line);
            assert!(pair[0].display_name.to_lowercase() <= pair[1].display_name.to_lowercase());
        }
        for pos in &doc.info.positions {
            assert_eq!(pos.end_line, pos.start_line + pos.line_count - 1);
            assert_eq!(lines[pos.start_line - 1], format!("## {}", pos.display_name));
            let next = lines.get(pos.end_line).copied();
            assert!(next.is_none() || next == Some(""), "window must end at the block boundary");
        }
        let last = doc.info.positions.last().unwrap();
        assert_eq!(last.end_line, lines.len());
    }

    #[test]
    fn anchors_unique_when_names_normalize_alike() {
        let nodes = vec![
            corpus_node("x.set", "Set", "core"),
            corpus_node("x.setUpper", "SET", "core"),
            corpus_node("x.setBang", "Set!", "core"),
            corpus_node("x.toc", "Table of Contents", "core"),
        ];
        let entries: Vec<(&CorpusNode, String)> =
            nodes.iter().map(|n| (n, render_node(n))).collect();
        let doc = build_merged_document("core", "Core Nodes", "core-merged.md", &entries);

        let anchors: Vec<&str> = doc.info.positions.iter().map(|p| p.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["set", "set-1", "set-2", "table-of-contents-1"]);
        assert!(doc.content.contains("- [SET](#set-1)"));
    }

    #[test]
    fn multi_line_names_keep_offsets_exact() {
        let nodes = vec![
            corpus_node("x.a", "Alpha\nBeta", "core"),
            corpus_node("x.b", "Gamma", "core"),
        ];
        let entries: Vec<(&CorpusNode, String)> =
            nodes.iter().map(|n| (n, render_node(n))).collect();
        let doc = build_merged_document("core", "Core Nodes", "core-merged.md", &entries);
        let lines: Vec<&str> = doc.content.lines().collect();

        assert_eq!(doc.info.positions[0].display_name, "Alpha Beta");
        assert!(doc.content.contains("- [Alpha Beta](#alpha-beta)"));
        for pos in &doc.info.positions {
            assert_eq!(lines[pos.start_line - 1], format!("## {}", pos.display_name));
        }
        assert_eq!(check_merged_file(&doc.info, &lines), Vec::<String>::new());
    }

    #[test]
    fn node_anchor_skips_earlier_section_slugs() {
        let mut slack = corpus_node("x.slack", "Slack", "core");
        slack.record.properties = vec![NodeProperty {
            name: "channel".into(),
            ..NodeProperty::default()
        }];
        let properties = corpus_node("x.properties", "Properties", "core");
        let nodes = vec![slack, properties];
        let entries: Vec<(&CorpusNode, String)> =
            nodes.iter().map(|n| (n, render_node(n))).collect();
        let doc = build_merged_document("core", "Core Nodes", "core-merged.md", &entries);

        let anchors: Vec<&str> = doc.info.positions.iter().map(|p| p.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["slack", "properties-1"]);
        assert!(doc.content.contains("- [Properties](#properties-1)"));
    }

    #[test]
    fn reserved_stems_cover_readme_and_merged_files() {
        assert!(is_reserved_stem("core", "README"));
        assert!(is_reserved_stem("core", "core-merged"));
        assert!(is_reserved_stem("core", "core-merged-2"));
        assert!(!is_reserved_stem("core", "core-merged-extra"));
        assert!(!is_reserved_stem("core", "n8n-nodes-base.code"));
        assert!(!is_reserved_stem("ai", "core-merged"));
    }

    #[test]
    fn individual_file_never_overwrites_category_files() {
        let tmp = temp_dir();
        let high = vec![
            corpus_node("README", "Readme Node", "core"),
            corpus_node("n8n-nodes-base.code", "Code", "core"),
        ];
        let low = vec![corpus_node("core-merged", "Clash", "core")];
        let mut clash_high = low.clone();
        clash_high[0].record.display_name = "Clash High".into();
        let all_high: Vec<CorpusNode> = high.into_iter().chain(clash_high).collect();
        let result = run(&all_high, &low, &MarkdownRenderer, &tmp);

        assert_eq!(result.skipped, vec!["README".to_string(), "core-merged".to_string()]);
        assert_eq!(result.individual.len(), 1);
        let merged = std::fs::read_to_string(tmp.join("core/core-merged.md")).unwrap();
        assert!(merged.starts_with("# Core Nodes"));
        let readme = std::fs::read_to_string(tmp.join("core/README.md")).unwrap();
        assert!(readme.starts_with("# Core Nodes"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn large_category_split_into_numbered_parts() {
        let tmp = temp_dir();
        let low = varied_nodes(250, "core");
        let result = run(&[], &low, &MarkdownRenderer, &tmp);

        let names: Vec<&str> = result.merged.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(names, vec!["core-merged-1.md", "core-merged-2.md", "core-merged-3.md"]);
        let counts: Vec<usize> = result.merged.iter().map(|m| m.node_count).collect();
        assert_eq!(counts, vec![100, 100, 50]);

        for info in &result.merged {
            let content = std::fs::read_to_string(tmp.join(info.relative_path())).unwrap();
            let lines: Vec<&str> = content.lines().collect();
            for pos in &info.positions {
                let window = &lines[pos.start_line - 1..pos.end_line];
                assert_eq!(window.len(), pos.line_count);
                assert_eq!(window[0], format!("## {}", pos.display_name));
            }
        }

        let readme = std::fs::read_to_string(tmp.join("core/README.md")).unwrap();
        assert!(readme.contains("split across 3 files"));
        assert!(readme.contains("Node 000 to Node 099 (100 nodes)"));
        assert!(readme.contains("(part 3)"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn small_category_gets_single_merged_file() {
        let tmp = temp_dir();
        let low = varied_nodes(100, "utility");
        let result = run(&[], &low, &MarkdownRenderer, &tmp);

        assert_eq!(result.merged.len(), 1);
        assert_eq!(result.merged[0].file_name, "utility-merged.md");
        let readme = std::fs::read_to_string(tmp.join("utility/README.md")).unwrap();
        assert!(readme.contains("[`utility-merged.md`](utility-merged.md)"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn high_priority_nodes_get_individual_files() {
        let tmp = temp_dir();
        let mut agent = corpus_node("@n8n/n8n-nodes-langchain.agent", "AI Agent", "ai");
        agent.subcategory = Some("agents".into());
        let high = vec![corpus_node("n8n-nodes-base.code", "Code", "core"), agent];
        let result = run(&high, &[], &MarkdownRenderer, &tmp);

        let paths: Vec<&str> = result.individual.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["core/n8n-nodes-base.code.md", "ai/n8n-n8n-nodes-langchain.agent.md"]
        );
        assert!(tmp.join("ai/n8n-n8n-nodes-langchain.agent.md").exists());
        assert!(result.merged.is_empty());

        let readme = std::fs::read_to_string(tmp.join("ai/README.md")).unwrap();
        assert!(readme.contains("### Agents"));
        assert!(readme.contains("[AI Agent](n8n-n8n-nodes-langchain.agent.md)"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn render_failure_skips_only_that_node() {
        let tmp = temp_dir();
        let low = varied_nodes(5, "core");
        let high = vec![corpus_node("n8n-nodes-base.broken", "Broken", "core")];
        let result = run(&high, &low, &FailOn("Node 002"), &tmp);
        assert_eq!(result.skipped, vec!["n8n-nodes-base.node002".to_string()]);
        assert_eq!(result.individual.len(), 1);

        let info = &result.merged[0];
        assert_eq!(info.node_count, 4);
        assert!(info.positions.iter().all(|p| p.display_name != "Node 002"));
        let content = std::fs::read_to_string(tmp.join(info.relative_path())).unwrap();
        assert!(!content.contains("Node 002"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_failure_skips_node_and_continues() {
        let tmp = temp_dir();
        // A directory where the file should go makes the rename fail.
        std::fs::create_dir_all(tmp.join("core/n8n-nodes-base.code.md/blocker")).unwrap();
        let high = vec![
            corpus_node("n8n-nodes-base.code", "Code", "core"),
            corpus_node("n8n-nodes-base.set", "Set", "core"),
        ];
        let result = run(&high, &[], &MarkdownRenderer, &tmp);

        assert_eq!(result.skipped, vec!["n8n-nodes-base.code".to_string()]);
        assert_eq!(result.individual.len(), 1);
        assert!(tmp.join("core/n8n-nodes-base.set.md").is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn zero_cap_is_rejected() {
        let tmp = temp_dir();
        let mut writer = CorpusWriter::create(&tmp).unwrap();
        let err = package(
            &[],
            &[],
            &categories(),
            &MarkdownRenderer,
            &PackagerConfig { merged_file_cap: 0 },
            &mut writer,
            &SilentProgress,
        )
        .unwrap_err();
        assert!(matches!(err, NodeDocsError::Validation { .. }));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn category_order_follows_config_then_extras() {
        let order = canonical_order(&categories(), ["zzz", "utility", "core", "ai", "core"]);
        assert_eq!(order, vec!["core", "ai", "utility", "zzz"]);
    }

    #[test]
    fn packaging_is_deterministic() {
        let first = temp_dir();
        let second = temp_dir();
        let low = varied_nodes(30, "core");
        run(&[], &low, &MarkdownRenderer, &first);
        run(&[], &low, &MarkdownRenderer, &second);
        assert_eq!(
            std::fs::read_to_string(first.join("core/core-merged.md")).unwrap(),
            std::fs::read_to_string(second.join("core/core-merged.md")).unwrap()
        );
        let _ = std::fs::remove_dir_all(&first);
        let _ = std::fs::remove_dir_all(&second);
    }
}
